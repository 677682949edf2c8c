mod app;
mod error;
mod modules;
mod settings;
mod style;

use eframe::egui;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn main() -> eframe::Result<()> {
    init_logging();

    let settings = settings::AppSettings::load();
    tracing::info!(download_dir = %settings.download_dir().display(), "starting batch converter");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 760.0])
            .with_min_inner_size([560.0, 480.0])
            .with_drag_and_drop(true)
            .with_title("Batch Image Converter"),
        ..Default::default()
    };
    eframe::run_native(
        "Batch Image Converter",
        options,
        Box::new(|cc| Ok(Box::new(app::ConverterApp::new(cc, settings)))),
    )
}
