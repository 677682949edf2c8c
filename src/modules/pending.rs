use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// An acquired image payload waiting for the next conversion run.
#[derive(Debug, Clone)]
pub struct PendingImage {
    /// Unique for the lifetime of the process; clones share it.
    pub id: u64,
    pub name: String,
    pub content_type: String,
    pub bytes: Arc<[u8]>,
}

impl PendingImage {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a local file, declaring its type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
            .to_string();

        Ok(Self::new(name, content_type_for_path(path), bytes))
    }

    pub fn is_image(&self) -> bool {
        is_image_type(&self.content_type)
    }

    pub fn size_kb(&self) -> usize {
        (self.bytes.len() + 512) / 1024
    }
}

pub fn is_image_type(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

pub fn content_type_for_path(path: &Path) -> &'static str {
    image::ImageFormat::from_path(path)
        .map(|f| f.to_mime_type())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

/// Trailing path segment of a URL, used as the file name of fetched images.
pub fn name_from_url(raw: &str) -> String {
    let segment = match url::Url::parse(raw) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => raw.rsplit('/').next().map(str::to_string),
    };

    match segment {
        Some(s) if !s.is_empty() => s,
        _ => "image".to_string(),
    }
}
