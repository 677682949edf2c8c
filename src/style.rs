use eframe::egui::{self, Color32, Stroke};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl From<egui::Theme> for ThemeMode {
    fn from(theme: egui::Theme) -> Self {
        match theme {
            egui::Theme::Dark => ThemeMode::Dark,
            egui::Theme::Light => ThemeMode::Light,
        }
    }
}

mod palette {
    use eframe::egui::Color32;

    pub const BLUE_500: Color32 = Color32::from_rgb(59, 130, 246);
    pub const BLUE_600: Color32 = Color32::from_rgb(37, 99, 235);
    pub const GREEN_500: Color32 = Color32::from_rgb(34, 197, 94);
    pub const RED_500: Color32 = Color32::from_rgb(239, 68, 68);
    pub const SLATE_200: Color32 = Color32::from_rgb(226, 232, 240);

    pub const GRAY_50: Color32 = Color32::from_rgb(249, 250, 251);
    pub const GRAY_200: Color32 = Color32::from_rgb(229, 231, 235);
    pub const GRAY_300: Color32 = Color32::from_rgb(209, 213, 219);
    pub const GRAY_400: Color32 = Color32::from_rgb(156, 163, 175);
    pub const GRAY_500: Color32 = Color32::from_rgb(107, 114, 128);
    pub const GRAY_800: Color32 = Color32::from_rgb(31, 41, 55);

    pub const ZINC_100: Color32 = Color32::from_rgb(244, 244, 245);
    pub const ZINC_200: Color32 = Color32::from_rgb(228, 228, 231);
    pub const ZINC_300: Color32 = Color32::from_rgb(212, 212, 216);
    pub const ZINC_400: Color32 = Color32::from_rgb(161, 161, 170);
    pub const ZINC_500: Color32 = Color32::from_rgb(113, 113, 122);
    pub const ZINC_600: Color32 = Color32::from_rgb(82, 82, 91);
    pub const ZINC_700: Color32 = Color32::from_rgb(63, 63, 70);
    pub const ZINC_800: Color32 = Color32::from_rgb(39, 39, 42);
    pub const ZINC_900: Color32 = Color32::from_rgb(24, 24, 27);
    pub const ZINC_950: Color32 = Color32::from_rgb(12, 12, 15);
}

/// Every colour the converter draws with, resolved for one theme.
#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    pub window_bg: Color32,
    pub input_bg: Color32,
    pub panel_bg: Color32,
    pub border: Color32,
    pub text: Color32,
    pub title: Color32,
    pub subtitle: Color32,
    pub muted: Color32,
    pub item_bg: Color32,
    pub chip_bg: Color32,
    pub chip_text: Color32,
    pub drop_zone_bg: Color32,
    pub drop_zone_hover_bg: Color32,
    pub drop_zone_border: Color32,
    pub secondary_bg: Color32,
    pub secondary_hover_bg: Color32,
    pub secondary_border: Color32,
    pub secondary_text: Color32,
    pub accent: Color32,
    pub accent_hover: Color32,
    pub success: Color32,
    pub failure: Color32,
}

impl ThemeColors {
    pub fn for_theme(theme: ThemeMode) -> Self {
        let shared = Self {
            window_bg: palette::ZINC_900,
            input_bg: palette::ZINC_950,
            panel_bg: palette::ZINC_800,
            border: palette::ZINC_700,
            text: palette::ZINC_200,
            title: palette::ZINC_100,
            subtitle: palette::ZINC_400,
            muted: palette::ZINC_500,
            item_bg: palette::ZINC_900,
            chip_bg: palette::ZINC_700,
            chip_text: palette::ZINC_300,
            drop_zone_bg: palette::ZINC_900,
            drop_zone_hover_bg: palette::ZINC_700,
            drop_zone_border: palette::ZINC_600,
            secondary_bg: palette::ZINC_800,
            secondary_hover_bg: palette::ZINC_700,
            secondary_border: palette::ZINC_600,
            secondary_text: palette::SLATE_200,
            accent: palette::BLUE_600,
            accent_hover: palette::BLUE_500,
            success: palette::GREEN_500,
            failure: palette::RED_500,
        };

        match theme {
            ThemeMode::Dark => shared,
            ThemeMode::Light => Self {
                window_bg: palette::GRAY_50,
                input_bg: Color32::WHITE,
                panel_bg: palette::GRAY_50,
                border: palette::GRAY_300,
                text: palette::GRAY_800,
                title: palette::ZINC_900,
                subtitle: palette::ZINC_600,
                muted: palette::GRAY_500,
                item_bg: Color32::WHITE,
                chip_bg: palette::GRAY_200,
                chip_text: palette::GRAY_800,
                drop_zone_bg: Color32::WHITE,
                drop_zone_hover_bg: palette::GRAY_200,
                drop_zone_border: palette::GRAY_400,
                secondary_bg: Color32::WHITE,
                secondary_hover_bg: palette::GRAY_50,
                secondary_border: palette::GRAY_300,
                secondary_text: palette::GRAY_800,
                ..shared
            },
        }
    }

    /// Fill and text colour of a tab or format chip.
    pub fn chip(&self, selected: bool) -> (Color32, Color32) {
        if selected {
            (self.accent, Color32::WHITE)
        } else {
            (self.chip_bg, self.chip_text)
        }
    }

    pub fn drop_zone(&self, hovering: bool) -> (Color32, Color32) {
        if hovering {
            (self.drop_zone_hover_bg, self.accent_hover)
        } else {
            (self.drop_zone_bg, self.drop_zone_border)
        }
    }
}

/// Starts from egui's stock visuals and swaps in the converter's surfaces.
pub fn apply_theme(ctx: &egui::Context, theme: ThemeMode) {
    let colors = ThemeColors::for_theme(theme);
    let mut visuals = match theme {
        ThemeMode::Dark => egui::Visuals::dark(),
        ThemeMode::Light => egui::Visuals::light(),
    };

    visuals.panel_fill = colors.window_bg;
    visuals.window_fill = colors.window_bg;
    visuals.extreme_bg_color = colors.input_bg;
    visuals.hyperlink_color = colors.accent;
    visuals.selection.bg_fill = colors.accent.gamma_multiply(0.4);
    visuals.selection.stroke = Stroke::new(1.0, colors.accent);
    for widget in [
        &mut visuals.widgets.noninteractive,
        &mut visuals.widgets.inactive,
        &mut visuals.widgets.hovered,
        &mut visuals.widgets.active,
    ] {
        widget.corner_radius = egui::CornerRadius::same(4);
    }

    ctx.set_visuals(visuals);
    ctx.style_mut(|style| {
        style.spacing.item_spacing = egui::vec2(8.0, 8.0);
        style.spacing.button_padding = egui::vec2(12.0, 6.0);
    });
}

/// Filled accent button for the action that moves the batch forward.
pub fn primary_button(ui: &mut egui::Ui, text: &str, colors: &ThemeColors) -> egui::Response {
    action_button(ui, text, colors.accent, colors.accent_hover, Stroke::NONE, Color32::WHITE)
}

pub fn secondary_button(ui: &mut egui::Ui, text: &str, colors: &ThemeColors) -> egui::Response {
    action_button(
        ui,
        text,
        colors.secondary_bg,
        colors.secondary_hover_bg,
        Stroke::new(1.0, colors.secondary_border),
        colors.secondary_text,
    )
}

fn action_button(
    ui: &mut egui::Ui,
    text: &str,
    fill: Color32,
    hover_fill: Color32,
    border: Stroke,
    text_color: Color32,
) -> egui::Response {
    ui.scope(|ui| {
        let widgets = &mut ui.style_mut().visuals.widgets;
        for (state, bg) in [
            (&mut widgets.inactive, fill),
            (&mut widgets.hovered, hover_fill),
            (&mut widgets.active, fill),
        ] {
            state.bg_fill = bg;
            state.weak_bg_fill = bg;
            state.bg_stroke = border;
            state.fg_stroke = Stroke::new(1.0, text_color);
        }

        ui.add(
            egui::Button::new(egui::RichText::new(text).size(15.0))
                .corner_radius(6.0)
                .min_size(egui::vec2(160.0, 40.0)),
        )
    })
    .inner
}
