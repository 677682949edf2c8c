use eframe::egui;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Duration;

use super::archive;
use super::collector::{self, DropPayload, InputCollector};
use super::converter::{self, ConversionResult, TargetFormat};
use super::fetch::{HttpFetcher, ResourceFetcher};
use super::pending::{content_type_for_path, is_image_type, PendingImage};
use crate::error::AcquireError;
use crate::settings::AppSettings;
use crate::style::{self, ThemeColors, ThemeMode};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif", "gif", "ico"];
const THUMBNAIL_SIZE: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputTab {
    Local,
    Urls,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AcquireSource {
    Picker,
    Drop,
}

/// One dropped file, kept in the order the window received it.
#[derive(Debug)]
pub enum DroppedEntry {
    Local(PathBuf),
    Loaded(PendingImage),
}

/// Everything the user can do in the converter view.
#[derive(Debug)]
pub enum ConverterEvent {
    OpenPicker,
    FilesChosen(Vec<PathBuf>),
    Dropped { files: Vec<DroppedEntry>, uris: Vec<String> },
    SubmitUrls,
    Remove(usize),
    ClearAll,
    SelectFormat(TargetFormat),
    SelectTab(InputTab),
    ConvertAll,
    Download,
    DismissAlert,
}

enum JobResult {
    Acquired { source: AcquireSource, items: Vec<PendingImage> },
    UrlBatch(Result<Vec<PendingImage>, AcquireError>),
    Converted { generation: u64, format: TargetFormat, results: Vec<ConversionResult> },
    ArchiveSaved(Result<Option<PathBuf>, String>),
    Thumbnail { id: u64, image: Option<egui::ColorImage> },
}

enum Thumbnail {
    Loading,
    Decoded(egui::ColorImage),
    Texture(egui::TextureHandle),
    Failed,
}

pub struct ImageConverter {
    collector: InputCollector,
    target_format: TargetFormat,
    converted_format: Option<TargetFormat>,
    active_tab: InputTab,
    url_text: String,
    status: String,
    alert: Option<String>,
    converting: bool,
    drag_hover: bool,
    thumbnails: HashMap<u64, Thumbnail>,
    fetcher: Arc<dyn ResourceFetcher>,
    download_dir: PathBuf,
    decode_timeout: Duration,
    jobs_in_flight: usize,
    job_tx: Sender<JobResult>,
    job_rx: Receiver<JobResult>,
}

impl ImageConverter {
    pub fn new(settings: &AppSettings) -> Self {
        Self::with_fetcher(Arc::new(HttpFetcher::new(settings.fetch_timeout())), settings)
    }

    pub fn with_fetcher(fetcher: Arc<dyn ResourceFetcher>, settings: &AppSettings) -> Self {
        let (job_tx, job_rx) = channel();
        Self {
            collector: InputCollector::new(),
            target_format: settings.default_format,
            converted_format: None,
            active_tab: InputTab::Local,
            url_text: String::new(),
            status: String::new(),
            alert: None,
            converting: false,
            drag_hover: false,
            thumbnails: HashMap::new(),
            fetcher,
            download_dir: settings.download_dir(),
            decode_timeout: settings.decode_timeout(),
            jobs_in_flight: 0,
            job_tx,
            job_rx,
        }
    }

    pub fn can_convert(&self) -> bool {
        !self.collector.pending().is_empty() && !self.converting
    }

    pub fn can_download(&self) -> bool {
        self.collector.converted().iter().any(Result::is_ok)
    }

    pub fn handle_event(&mut self, event: ConverterEvent) {
        match event {
            ConverterEvent::OpenPicker => {
                if let Some(paths) = rfd::FileDialog::new()
                    .add_filter("Images", IMAGE_EXTENSIONS)
                    .pick_files()
                {
                    self.on_files_chosen(paths);
                }
            }
            ConverterEvent::FilesChosen(paths) => self.on_files_chosen(paths),
            ConverterEvent::Dropped { files, uris } => self.on_dropped(files, uris),
            ConverterEvent::SubmitUrls => self.on_submit_urls(),
            ConverterEvent::Remove(index) => self.on_remove(index),
            ConverterEvent::ClearAll => self.on_clear(),
            ConverterEvent::SelectFormat(format) => self.target_format = format,
            ConverterEvent::SelectTab(tab) => self.active_tab = tab,
            ConverterEvent::ConvertAll => self.on_convert_all(),
            ConverterEvent::Download => self.on_download(),
            ConverterEvent::DismissAlert => self.alert = None,
        }
    }

    fn spawn_job(&mut self, job: impl FnOnce() -> JobResult + Send + 'static) {
        let tx = self.job_tx.clone();
        self.jobs_in_flight += 1;
        thread::spawn(move || {
            let _ = tx.send(job());
        });
    }

    fn on_files_chosen(&mut self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        self.spawn_job(move || JobResult::Acquired {
            source: AcquireSource::Picker,
            items: read_paths(&paths),
        });
    }

    fn on_dropped(&mut self, files: Vec<DroppedEntry>, uris: Vec<String>) {
        if files.is_empty() && uris.is_empty() {
            return;
        }
        let fetcher = Arc::clone(&self.fetcher);
        self.spawn_job(move || {
            let files = files
                .into_iter()
                .filter_map(|entry| match entry {
                    DroppedEntry::Local(path) => read_path(&path),
                    DroppedEntry::Loaded(item) => Some(item),
                })
                .collect();
            let payload = DropPayload { files, uris };
            JobResult::Acquired {
                source: AcquireSource::Drop,
                items: collector::resolve_drop(payload, fetcher.as_ref()),
            }
        });
    }

    fn on_submit_urls(&mut self) {
        if self.url_text.trim().is_empty() {
            return;
        }
        let text = self.url_text.clone();
        let fetcher = Arc::clone(&self.fetcher);
        self.status = "Fetching images...".to_string();
        self.spawn_job(move || JobResult::UrlBatch(collector::resolve_url_list(&text, fetcher.as_ref())));
    }

    fn on_remove(&mut self, index: usize) {
        if let Some(item) = self.collector.remove_item(index) {
            self.thumbnails.remove(&item.id);
        }
    }

    fn on_clear(&mut self) {
        self.collector.clear();
        self.thumbnails.clear();
        self.converted_format = None;
        self.status.clear();
    }

    fn on_convert_all(&mut self) {
        if !self.can_convert() {
            return;
        }
        let items = self.collector.pending().to_vec();
        let format = self.target_format;
        let timeout = self.decode_timeout;
        let generation = self.collector.generation();

        self.converting = true;
        self.status = format!("Converting {} images to {}...", items.len(), format.as_str());
        tracing::info!(count = items.len(), format = format.as_str(), "starting conversion run");

        self.spawn_job(move || JobResult::Converted {
            generation,
            format,
            results: converter::convert_all(&items, format, timeout),
        });
    }

    fn on_download(&mut self) {
        let outputs = self.collector.successful_outputs();
        if outputs.is_empty() {
            return;
        }
        let format = self.converted_format.unwrap_or(self.target_format);
        let dest = self.download_dir.clone();
        self.spawn_job(move || {
            JobResult::ArchiveSaved(archive::download_archive(&outputs, format, &dest).map_err(|e| e.to_string()))
        });
    }

    fn poll_jobs(&mut self) {
        while let Ok(result) = self.job_rx.try_recv() {
            self.jobs_in_flight = self.jobs_in_flight.saturating_sub(1);
            self.apply_job(result);
        }
    }

    fn apply_job(&mut self, result: JobResult) {
        match result {
            JobResult::Acquired { source, items } => {
                let added = match source {
                    AcquireSource::Picker => self.collector.add_from_picker(items),
                    AcquireSource::Drop => self.collector.add_from_drop(items),
                };
                tracing::info!(?source, added, total = self.collector.pending().len(), "images added");
                self.on_added(added);
            }
            JobResult::UrlBatch(batch) => match self.collector.add_from_url_list(batch) {
                Ok(added) => {
                    self.url_text.clear();
                    tracing::info!(added, total = self.collector.pending().len(), "URL batch added");
                    self.on_added(added);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "URL batch rejected");
                    self.status.clear();
                    self.alert = Some(format!(
                        "Could not add the image URLs. Make sure every URL is reachable and points to an image.\n\n{}",
                        e
                    ));
                }
            },
            JobResult::Converted { generation, format, results } => {
                self.converting = false;
                if generation != self.collector.generation() {
                    tracing::warn!(
                        started_at = generation,
                        current = self.collector.generation(),
                        "list changed during conversion, discarding results"
                    );
                    self.status = "The list changed while converting. Convert again to refresh the results.".to_string();
                    return;
                }

                let failed = results.iter().filter(|r| r.is_err()).count();
                let succeeded = results.len() - failed;
                self.collector.set_converted(results);
                self.converted_format = Some(format);
                self.status = format!("Converted: {} succeeded, {} failed", succeeded, failed);
                tracing::info!(succeeded, failed, "conversion run finished");
            }
            JobResult::ArchiveSaved(Ok(Some(path))) => {
                self.status = format!("Saved {}", path.display());
            }
            JobResult::ArchiveSaved(Ok(None)) => {}
            JobResult::ArchiveSaved(Err(e)) => {
                tracing::error!(error = %e, "failed to save archive");
                self.alert = Some(format!("Could not save the archive: {}", e));
            }
            JobResult::Thumbnail { id, image } => {
                if let Some(slot) = self.thumbnails.get_mut(&id) {
                    *slot = image.map_or(Thumbnail::Failed, Thumbnail::Decoded);
                }
            }
        }
    }

    fn on_added(&mut self, added: usize) {
        self.status = format!("Added {} image(s)", added);

        let start = self.collector.pending().len() - added;
        let new_items = self.collector.pending()[start..].to_vec();
        for item in new_items {
            self.queue_thumbnail(item);
        }
    }

    fn queue_thumbnail(&mut self, item: PendingImage) {
        self.thumbnails.insert(item.id, Thumbnail::Loading);
        self.spawn_job(move || JobResult::Thumbnail {
            id: item.id,
            image: decode_thumbnail(&item.bytes),
        });
    }

    fn upload_thumbnails(&mut self, ctx: &egui::Context) {
        for (id, slot) in self.thumbnails.iter_mut() {
            if !matches!(slot, Thumbnail::Decoded(_)) {
                continue;
            }
            if let Thumbnail::Decoded(image) = std::mem::replace(slot, Thumbnail::Failed) {
                *slot = Thumbnail::Texture(ctx.load_texture(
                    format!("thumbnail_{}", id),
                    image,
                    egui::TextureOptions::LINEAR,
                ));
            }
        }
    }

    fn collect_drops(&mut self, ctx: &egui::Context, events: &mut Vec<ConverterEvent>) {
        let (hovering, dropped) = ctx.input(|i| (!i.raw.hovered_files.is_empty(), i.raw.dropped_files.clone()));
        self.drag_hover = hovering;
        if let Some(event) = dropped_event(dropped) {
            events.push(event);
        }
    }

    fn render_header(&self, ui: &mut egui::Ui, colors: &ThemeColors) {
        ui.vertical(|ui| {
            ui.add_space(12.0);
            ui.label(
                egui::RichText::new("Batch Image Converter")
                    .size(24.0)
                    .color(colors.title)
            );

            ui.add_space(4.0);
            ui.label(
                egui::RichText::new("Convert local or linked images to PNG, JPEG or WEBP and save them as one ZIP")
                    .size(13.0)
                    .color(colors.subtitle)
            );

            ui.add_space(12.0);
        });
    }

    fn render_tabs(&self, ui: &mut egui::Ui, colors: &ThemeColors, events: &mut Vec<ConverterEvent>) {
        ui.horizontal(|ui| {
            for (tab, label) in [(InputTab::Local, "Local Images"), (InputTab::Urls, "Image URLs")] {
                let (bg_color, txt_color) = colors.chip(self.active_tab == tab);
                let button = egui::Button::new(egui::RichText::new(label).size(13.0).color(txt_color))
                    .fill(bg_color)
                    .stroke(egui::Stroke::NONE)
                    .corner_radius(6.0)
                    .min_size(egui::vec2(110.0, 32.0));

                if ui.add(button).clicked() {
                    events.push(ConverterEvent::SelectTab(tab));
                }
            }
        });
    }

    fn render_drop_zone(&self, ui: &mut egui::Ui, colors: &ThemeColors, events: &mut Vec<ConverterEvent>) {
        let (drop_zone_bg, drop_zone_border) = colors.drop_zone(self.drag_hover);

        let (rect, response) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), 150.0),
            egui::Sense::click(),
        );

        ui.painter().rect_filled(rect, 6.0, drop_zone_bg);
        ui.painter().rect_stroke(
            rect,
            6.0,
            egui::Stroke::new(2.0, drop_zone_border),
            egui::StrokeKind::Outside,
        );
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Drop images or image links here, or click to browse",
            egui::FontId::proportional(14.0),
            colors.muted,
        );

        if response.clicked() {
            events.push(ConverterEvent::OpenPicker);
        }
    }

    fn render_url_input(&mut self, ui: &mut egui::Ui, colors: &ThemeColors, events: &mut Vec<ConverterEvent>) {
        ui.add(
            egui::TextEdit::multiline(&mut self.url_text)
                .hint_text("One image URL per line")
                .desired_rows(4)
                .desired_width(f32::INFINITY)
        );

        ui.horizontal(|ui| {
            if ui.add_enabled(!self.url_text.trim().is_empty(), egui::Button::new("Add")).clicked() {
                events.push(ConverterEvent::SubmitUrls);
            }
            ui.label(
                egui::RichText::new("Tip: you can also drag images straight from a web page")
                    .size(12.0)
                    .color(colors.subtitle)
            );
        });
    }

    fn panel(colors: &ThemeColors) -> egui::Frame {
        egui::Frame::new()
            .fill(colors.panel_bg)
            .stroke(egui::Stroke::new(1.0, colors.border))
            .corner_radius(8.0)
            .inner_margin(16.0)
    }

    fn render_format_selector(&self, ui: &mut egui::Ui, colors: &ThemeColors, events: &mut Vec<ConverterEvent>) {
        Self::panel(colors).show(ui, |ui| {
            ui.label(
                egui::RichText::new("Target Format")
                    .size(14.0)
                    .color(colors.text)
            );

            ui.add_space(8.0);

            ui.horizontal_wrapped(|ui| {
                for format in TargetFormat::all() {
                    let (bg_color, txt_color) = colors.chip(self.target_format == format);

                    let button = egui::Button::new(
                        egui::RichText::new(format.as_str())
                            .size(13.0)
                            .color(txt_color)
                    )
                    .fill(bg_color)
                    .stroke(egui::Stroke::NONE)
                    .corner_radius(6.0)
                    .min_size(egui::vec2(70.0, 32.0));

                    if ui.add(button).clicked() {
                        events.push(ConverterEvent::SelectFormat(format));
                    }
                }
            });
        });
    }

    fn render_image_list(&self, ui: &mut egui::Ui, colors: &ThemeColors, events: &mut Vec<ConverterEvent>) {
        let pending = self.collector.pending();
        let converted = self.collector.converted();
        let in_sync = !converted.is_empty() && converted.len() == pending.len();

        Self::panel(colors).show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(format!("Selected {} file(s)", pending.len()))
                        .size(14.0)
                        .color(colors.text)
                );

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if !pending.is_empty() && ui.button("Clear All").clicked() {
                        events.push(ConverterEvent::ClearAll);
                    }
                    if ui.button("Add Images").clicked() {
                        events.push(ConverterEvent::OpenPicker);
                    }
                });
            });

            if pending.is_empty() {
                return;
            }

            ui.add_space(8.0);
            ui.separator();
            ui.add_space(8.0);

            egui::ScrollArea::vertical()
                .max_height(300.0)
                .show(ui, |ui| {
                    for (idx, image) in pending.iter().enumerate() {
                        egui::Frame::new()
                            .fill(colors.item_bg)
                            .stroke(egui::Stroke::new(1.0, colors.border))
                            .corner_radius(6.0)
                            .inner_margin(8.0)
                            .show(ui, |ui| {
                                ui.horizontal(|ui| {
                                    self.render_thumbnail(ui, image, colors.border);

                                    ui.vertical(|ui| {
                                        ui.label(
                                            egui::RichText::new(&image.name)
                                                .color(colors.text)
                                                .size(13.0)
                                        );
                                        ui.label(
                                            egui::RichText::new(format!("{} | {} KB", image.content_type, image.size_kb()))
                                                .color(colors.muted)
                                                .size(11.0)
                                        );
                                    });

                                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                        if ui.button("✕").on_hover_text("Remove").clicked() {
                                            events.push(ConverterEvent::Remove(idx));
                                        }
                                        if in_sync {
                                            render_outcome(ui, &converted[idx], colors);
                                        }
                                    });
                                });
                            });

                        ui.add_space(6.0);
                    }
                });
        });
    }

    fn render_thumbnail(&self, ui: &mut egui::Ui, image: &PendingImage, placeholder: egui::Color32) {
        let size = egui::vec2(40.0, 40.0);
        match self.thumbnails.get(&image.id) {
            Some(Thumbnail::Texture(texture)) => {
                ui.add(egui::Image::new(egui::load::SizedTexture::new(texture.id(), size)));
            }
            _ => {
                let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
                ui.painter().rect_filled(rect, 4.0, placeholder);
            }
        }
    }

    fn render_status(&self, ui: &mut egui::Ui, colors: &ThemeColors) {
        if self.status.is_empty() && !self.converting {
            return;
        }

        ui.horizontal(|ui| {
            if self.converting || self.jobs_in_flight > 0 {
                ui.spinner();
            }
            ui.label(
                egui::RichText::new(&self.status)
                    .size(12.0)
                    .color(colors.text)
            );
        });
    }

    fn render_action_buttons(&self, ui: &mut egui::Ui, colors: &ThemeColors, events: &mut Vec<ConverterEvent>) {
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 12.0;

            let convert = ui
                .add_enabled_ui(self.can_convert(), |ui| style::primary_button(ui, "Convert All", colors))
                .inner;
            if convert.clicked() {
                events.push(ConverterEvent::ConvertAll);
            }

            let download = ui
                .add_enabled_ui(self.can_download(), |ui| style::secondary_button(ui, "Download Archive", colors))
                .inner;
            if download.clicked() {
                events.push(ConverterEvent::Download);
            }
        });
    }

    fn render_alert(&self, ctx: &egui::Context, colors: &ThemeColors, events: &mut Vec<ConverterEvent>) {
        let Some(message) = &self.alert else {
            return;
        };

        egui::Window::new("Something went wrong")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .order(egui::Order::Tooltip)
            .frame(Self::panel(colors).inner_margin(24.0))
            .show(ctx, |ui| {
                ui.set_max_width(420.0);
                ui.label(egui::RichText::new(message).size(13.0).color(colors.text));
                ui.add_space(16.0);
                ui.vertical_centered(|ui| {
                    if style::secondary_button(ui, "OK", colors).clicked() {
                        events.push(ConverterEvent::DismissAlert);
                    }
                });
            });
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        self.poll_jobs();
        self.upload_thumbnails(ctx);

        let theme = if ui.visuals().dark_mode { ThemeMode::Dark } else { ThemeMode::Light };
        let colors = ThemeColors::for_theme(theme);
        let mut events = Vec::new();
        self.collect_drops(ctx, &mut events);

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.add_space(8.0);
                self.render_header(ui, &colors);

                self.render_tabs(ui, &colors, &mut events);
                ui.add_space(8.0);
                match self.active_tab {
                    InputTab::Local => self.render_drop_zone(ui, &colors, &mut events),
                    InputTab::Urls => self.render_url_input(ui, &colors, &mut events),
                }

                ui.add_space(12.0);
                self.render_format_selector(ui, &colors, &mut events);

                ui.add_space(12.0);
                self.render_image_list(ui, &colors, &mut events);

                ui.add_space(12.0);
                self.render_status(ui, &colors);
                self.render_action_buttons(ui, &colors, &mut events);

                ui.add_space(16.0);
            });

        self.render_alert(ctx, &colors, &mut events);

        for event in events {
            self.handle_event(event);
        }

        if self.jobs_in_flight > 0 {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

fn render_outcome(ui: &mut egui::Ui, outcome: &ConversionResult, colors: &ThemeColors) {
    match outcome {
        Ok(out) => {
            ui.label(
                egui::RichText::new(format!("✓ {} {} KB", out.format.as_str(), (out.bytes.len() + 512) / 1024))
                    .color(colors.success)
                    .size(11.0)
            );
        }
        Err(e) => {
            ui.label(
                egui::RichText::new("failed")
                    .color(colors.failure)
                    .size(11.0)
            )
            .on_hover_text(e.to_string());
        }
    }
}

fn decode_thumbnail(bytes: &[u8]) -> Option<egui::ColorImage> {
    let thumb = image::load_from_memory(bytes)
        .ok()?
        .thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
        .to_rgba8();
    let size = [thumb.width() as usize, thumb.height() as usize];
    Some(egui::ColorImage::from_rgba_unmultiplied(size, thumb.as_raw()))
}

fn read_paths(paths: &[PathBuf]) -> Vec<PendingImage> {
    paths.iter().filter_map(|path| read_path(path)).collect()
}

/// Reads a picked or dropped path. Anything that is not an image by extension,
/// or cannot be read, yields nothing.
fn read_path(path: &Path) -> Option<PendingImage> {
    if !is_image_type(content_type_for_path(path)) {
        return None;
    }
    match PendingImage::from_path(path) {
        Ok(item) => Some(item),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read image file");
            None
        }
    }
}

/// Sorts what the window received into files and links. Files keep the order
/// they were dropped in, whether they arrived as paths or as bytes.
fn dropped_event(dropped: Vec<egui::DroppedFile>) -> Option<ConverterEvent> {
    let mut files = Vec::new();
    let mut uris = Vec::new();

    for file in dropped {
        if let Some(path) = file.path {
            files.push(DroppedEntry::Local(path));
        } else if let Some(bytes) = file.bytes {
            if file.mime == "text/uri-list" {
                uris.extend(collector::parse_uri_list(&String::from_utf8_lossy(&bytes)));
            } else {
                let content_type = if file.mime.is_empty() {
                    content_type_for_path(Path::new(&file.name)).to_string()
                } else {
                    file.mime
                };
                files.push(DroppedEntry::Loaded(PendingImage::new(file.name, content_type, bytes)));
            }
        } else if file.name.starts_with("http://") || file.name.starts_with("https://") {
            uris.push(file.name);
        }
    }

    if files.is_empty() && uris.is_empty() {
        return None;
    }
    Some(ConverterEvent::Dropped { files, uris })
}
