use super::converter::{ConversionResult, ConvertedImage};
use super::fetch::ResourceFetcher;
use super::pending::{is_image_type, name_from_url, PendingImage};
use crate::error::{AcquireError, FetchError};
use std::thread;

/// What a drag-and-drop gesture delivered: local files and/or remote URIs.
#[derive(Debug, Clone, Default)]
pub struct DropPayload {
    pub files: Vec<PendingImage>,
    pub uris: Vec<String>,
}

/// The two in-memory lists: pending inputs and the outputs of the last run.
#[derive(Default)]
pub struct InputCollector {
    pending: Vec<PendingImage>,
    converted: Vec<ConversionResult>,
    generation: u64,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[PendingImage] {
        &self.pending
    }

    pub fn converted(&self) -> &[ConversionResult] {
        &self.converted
    }

    /// Bumped on every change to the pending list. A conversion run started
    /// at one generation only matches the list while it is still current.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn add_from_picker(&mut self, selection: Vec<PendingImage>) -> usize {
        self.append(selection)
    }

    /// Commits the output of [`resolve_drop`].
    pub fn add_from_drop(&mut self, resolved: Vec<PendingImage>) -> usize {
        self.append(resolved)
    }

    /// Commits the output of [`resolve_url_list`]. A failed batch leaves the
    /// list untouched and hands the error back.
    pub fn add_from_url_list(
        &mut self,
        batch: Result<Vec<PendingImage>, AcquireError>,
    ) -> Result<usize, AcquireError> {
        batch.map(|items| self.append(items))
    }

    fn append(&mut self, batch: Vec<PendingImage>) -> usize {
        let before = self.pending.len();
        self.pending.extend(batch.into_iter().filter(|item| {
            let keep = item.is_image();
            if !keep {
                tracing::trace!(name = %item.name, content_type = %item.content_type, "skipping non-image input");
            }
            keep
        }));

        let added = self.pending.len() - before;
        if added > 0 {
            self.generation += 1;
        }
        added
    }

    pub fn remove_item(&mut self, index: usize) -> Option<PendingImage> {
        if index >= self.pending.len() {
            return None;
        }

        if self.converted.len() == self.pending.len() {
            self.converted.remove(index);
        }
        self.generation += 1;
        Some(self.pending.remove(index))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.converted.clear();
        self.generation += 1;
    }

    pub fn set_converted(&mut self, results: Vec<ConversionResult>) {
        self.converted = results;
    }

    pub fn successful_outputs(&self) -> Vec<ConvertedImage> {
        self.converted
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .cloned()
            .collect()
    }
}

/// Resolves a drop: files first, then every URI that fetched as an image.
/// A failing URI is logged and skipped; the rest of the drop still lands.
pub fn resolve_drop(payload: DropPayload, fetcher: &dyn ResourceFetcher) -> Vec<PendingImage> {
    let mut resolved: Vec<PendingImage> = payload.files.into_iter().filter(PendingImage::is_image).collect();

    for uri in payload.uris {
        match fetcher.fetch(&uri) {
            Ok(resource) if is_image_type(resource.content_type_or_empty()) => {
                let content_type = resource.content_type_or_empty().to_string();
                resolved.push(PendingImage::new(name_from_url(&uri), content_type, resource.bytes));
            }
            Ok(resource) => {
                tracing::warn!(url = %uri, content_type = resource.content_type_or_empty(), "dropped link is not an image");
            }
            Err(e) => {
                tracing::warn!(url = %uri, error = %e, "failed to fetch dropped image");
            }
        }
    }

    resolved
}

/// Fetches every URL of a newline-separated list concurrently. Any failure
/// fails the whole batch.
pub fn resolve_url_list(text: &str, fetcher: &dyn ResourceFetcher) -> Result<Vec<PendingImage>, AcquireError> {
    let urls = split_url_list(text);
    if urls.is_empty() {
        return Ok(Vec::new());
    }

    let results: Vec<(String, Result<_, FetchError>)> = thread::scope(|scope| {
        let handles: Vec<_> = urls
            .iter()
            .map(|url| (url.clone(), scope.spawn(move || fetcher.fetch(url))))
            .collect();

        handles
            .into_iter()
            .map(|(url, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(FetchError::Transport { url: url.clone(), reason: "fetch worker panicked".to_string() })
                });
                (url, result)
            })
            .collect()
    });

    let mut batch = Vec::with_capacity(results.len());
    for (url, result) in results {
        let resource = result?;
        let content_type = resource.content_type_or_empty().to_string();
        if !is_image_type(&content_type) {
            return Err(AcquireError::NotAnImage { url, content_type });
        }
        batch.push(PendingImage::new(name_from_url(&url), content_type, resource.bytes));
    }

    tracing::info!(count = batch.len(), "fetched URL batch");
    Ok(batch)
}

pub fn split_url_list(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses a `text/uri-list` body: one URI per line, `#` starts a comment line.
pub fn parse_uri_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::converter::TargetFormat;
    use crate::modules::fetch::testing::StaticFetcher;

    fn item(name: &str, content_type: &str) -> PendingImage {
        PendingImage::new(name, content_type, name.as_bytes().to_vec())
    }

    fn names(items: &[PendingImage]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    fn output(tag: u8) -> ConversionResult {
        Ok(ConvertedImage { bytes: vec![tag], format: TargetFormat::Png })
    }

    fn three_url_fetcher() -> StaticFetcher {
        StaticFetcher::default()
            .with("https://a.test/one.png", "image/png", vec![1])
            .with("https://a.test/two.html", "text/html", b"<html>".to_vec())
            .with("https://a.test/three.jpg", "image/jpeg", vec![3])
    }

    #[test]
    fn picker_keeps_order_and_drops_non_images() {
        let mut collector = InputCollector::new();
        let added = collector.add_from_picker(vec![
            item("b.png", "image/png"),
            item("readme.txt", "text/plain"),
            item("a.jpg", "image/jpeg"),
            item("blob", "application/octet-stream"),
            item("c.webp", "image/webp"),
        ]);

        assert_eq!(added, 3);
        assert_eq!(names(collector.pending()), vec!["b.png", "a.jpg", "c.webp"]);

        collector.add_from_picker(vec![item("d.gif", "image/gif")]);
        assert_eq!(names(collector.pending()), vec!["b.png", "a.jpg", "c.webp", "d.gif"]);
    }

    #[test]
    fn url_list_is_all_or_nothing() {
        let fetcher = three_url_fetcher();
        let mut collector = InputCollector::new();
        collector.add_from_picker(vec![item("existing.png", "image/png")]);

        let text = "https://a.test/one.png\nhttps://a.test/two.html\nhttps://a.test/three.jpg";
        let err = collector.add_from_url_list(resolve_url_list(text, &fetcher)).unwrap_err();

        assert!(matches!(err, AcquireError::NotAnImage { ref url, .. } if url == "https://a.test/two.html"));
        assert_eq!(names(collector.pending()), vec!["existing.png"]);
    }

    #[test]
    fn drop_isolates_the_failing_link() {
        let fetcher = three_url_fetcher();
        let mut collector = InputCollector::new();

        let payload = DropPayload {
            files: Vec::new(),
            uris: vec![
                "https://a.test/one.png".to_string(),
                "https://a.test/two.html".to_string(),
                "https://a.test/three.jpg".to_string(),
            ],
        };
        let added = collector.add_from_drop(resolve_drop(payload, &fetcher));

        assert_eq!(added, 2);
        assert_eq!(names(collector.pending()), vec!["one.png", "three.jpg"]);
        assert_eq!(collector.pending()[1].content_type, "image/jpeg");
    }

    #[test]
    fn url_list_fails_when_a_host_is_down() {
        let fetcher = StaticFetcher::default().with("https://a.test/one.png", "image/png", vec![1]);
        let mut collector = InputCollector::new();

        let err = collector
            .add_from_url_list(resolve_url_list("https://a.test/one.png\nhttps://down.test/x.png", &fetcher))
            .unwrap_err();

        assert!(matches!(err, AcquireError::Fetch(_)));
        assert!(collector.pending().is_empty());
    }

    #[test]
    fn url_list_trims_and_skips_blank_lines() {
        let fetcher = three_url_fetcher();
        let mut collector = InputCollector::new();

        let batch = resolve_url_list("  https://a.test/three.jpg  \n\n   \nhttps://a.test/one.png\r\n", &fetcher);
        let added = collector.add_from_url_list(batch).unwrap();

        assert_eq!(added, 2);
        assert_eq!(names(collector.pending()), vec!["three.jpg", "one.png"]);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn blank_url_list_is_a_no_op() {
        let fetcher = StaticFetcher::default();
        assert!(resolve_url_list(" \n \n", &fetcher).unwrap().is_empty());
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn drop_puts_files_before_links() {
        let fetcher = three_url_fetcher();
        let mut collector = InputCollector::new();

        let payload = DropPayload {
            files: vec![item("local.png", "image/png"), item("notes.txt", "text/plain")],
            uris: vec!["https://a.test/three.jpg".to_string(), "https://down.test/gone.png".to_string()],
        };
        collector.add_from_drop(resolve_drop(payload, &fetcher));

        assert_eq!(names(collector.pending()), vec!["local.png", "three.jpg"]);
    }

    #[test]
    fn remove_trims_matching_converted_slot() {
        let mut collector = InputCollector::new();
        collector.add_from_picker(vec![item("a.png", "image/png"), item("b.png", "image/png"), item("c.png", "image/png")]);
        collector.set_converted(vec![output(1), output(2), output(3)]);

        let removed = collector.remove_item(1).unwrap();

        assert_eq!(removed.name, "b.png");
        assert_eq!(names(collector.pending()), vec!["a.png", "c.png"]);
        let kept: Vec<u8> = collector.successful_outputs().iter().map(|o| o.bytes[0]).collect();
        assert_eq!(kept, vec![1, 3]);
    }

    #[test]
    fn remove_leaves_desynced_outputs_alone() {
        let mut collector = InputCollector::new();
        collector.add_from_picker(vec![item("a.png", "image/png"), item("b.png", "image/png")]);
        collector.set_converted(vec![output(1), output(2)]);
        collector.add_from_picker(vec![item("c.png", "image/png")]);

        collector.remove_item(0);

        assert_eq!(names(collector.pending()), vec!["b.png", "c.png"]);
        assert_eq!(collector.converted().len(), 2);
    }

    #[test]
    fn remove_out_of_range_is_ignored() {
        let mut collector = InputCollector::new();
        collector.add_from_picker(vec![item("a.png", "image/png")]);

        assert!(collector.remove_item(5).is_none());
        assert_eq!(collector.pending().len(), 1);
    }

    #[test]
    fn clear_empties_both_lists() {
        let mut collector = InputCollector::new();
        collector.add_from_picker(vec![item("a.png", "image/png")]);
        collector.set_converted(vec![output(1)]);

        collector.clear();

        assert!(collector.pending().is_empty());
        assert!(collector.converted().is_empty());
    }

    #[test]
    fn generation_tracks_pending_changes_only() {
        let mut collector = InputCollector::new();
        let start = collector.generation();

        collector.add_from_picker(vec![item("notes.txt", "text/plain")]);
        assert_eq!(collector.generation(), start);

        collector.add_from_picker(vec![item("a.png", "image/png"), item("b.png", "image/png")]);
        let after_add = collector.generation();
        assert!(after_add > start);

        collector.set_converted(vec![output(1), output(2)]);
        assert_eq!(collector.generation(), after_add);

        collector.remove_item(9);
        assert_eq!(collector.generation(), after_add);

        collector.remove_item(0);
        let after_remove = collector.generation();
        assert!(after_remove > after_add);

        collector.clear();
        assert!(collector.generation() > after_remove);
    }

    #[test]
    fn uri_list_skips_comments() {
        let body = "# dragged from a browser\r\nhttps://a.test/one.png\r\n\r\nhttps://a.test/three.jpg\r\n";
        assert_eq!(parse_uri_list(body), vec!["https://a.test/one.png", "https://a.test/three.jpg"]);
    }
}
