use eframe::egui;
use crate::modules::image_converter::{ConverterEvent, ImageConverter};
use crate::settings::{AppSettings, ThemePreference};
use crate::style::{self, ThemeColors, ThemeMode};

pub struct ConverterApp {
    converter: ImageConverter,
    theme_mode: ThemeMode,
    theme_preference: ThemePreference,
}

impl ConverterApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let system_theme = ThemeMode::from(cc.egui_ctx.theme());
        let initial_theme = match settings.theme_preference {
            ThemePreference::System => system_theme,
            ThemePreference::Light => ThemeMode::Light,
            ThemePreference::Dark => ThemeMode::Dark,
        };

        style::apply_theme(&cc.egui_ctx, initial_theme);

        Self {
            converter: ImageConverter::new(&settings),
            theme_mode: initial_theme,
            theme_preference: settings.theme_preference,
        }
    }

    fn set_theme_preference(&mut self, ctx: &egui::Context, preference: ThemePreference) {
        self.theme_preference = preference;
        self.theme_mode = match preference {
            ThemePreference::System => ThemeMode::from(ctx.theme()),
            ThemePreference::Light => ThemeMode::Light,
            ThemePreference::Dark => ThemeMode::Dark,
        };
        style::apply_theme(ctx, self.theme_mode);
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        let mut chosen_theme = None;

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Add Images...").clicked() {
                        self.converter.handle_event(ConverterEvent::OpenPicker);
                        ui.close();
                    }
                    if ui.add_enabled(self.converter.can_download(), egui::Button::new("Download Archive")).clicked() {
                        self.converter.handle_event(ConverterEvent::Download);
                        ui.close();
                    }
                    if ui.button("Clear List").clicked() {
                        self.converter.handle_event(ConverterEvent::ClearAll);
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        ui.close();
                    }
                });

                ui.menu_button("View", |ui| {
                    for (preference, label) in [
                        (ThemePreference::System, "System Theme"),
                        (ThemePreference::Light, "Light Theme"),
                        (ThemePreference::Dark, "Dark Theme"),
                    ] {
                        if ui.radio(self.theme_preference == preference, label).clicked() {
                            chosen_theme = Some(preference);
                            ui.close();
                        }
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let muted = ThemeColors::for_theme(self.theme_mode).muted;
                    ui.label(egui::RichText::new(concat!("v", env!("CARGO_PKG_VERSION"))).size(11.0).color(muted));
                });
            });
            ui.add_space(4.0);
        });

        if let Some(preference) = chosen_theme {
            self.set_theme_preference(ctx, preference);
        }
    }
}

impl eframe::App for ConverterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if matches!(self.theme_preference, ThemePreference::System) {
            let system_theme = ThemeMode::from(ctx.theme());
            if self.theme_mode != system_theme {
                self.theme_mode = system_theme;
                style::apply_theme(ctx, self.theme_mode);
            }
        }

        self.top_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            self.converter.ui(ui, ctx);
        });
    }
}
