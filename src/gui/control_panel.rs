//! Control Panel Widget
//! Left side panel: data source, screen switch, year filter, export and status.

use egui::{Color32, ComboBox, RichText};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Explore,
    Forecast,
}

/// Whether the status line reports success, failure or plain progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Left side control panel with data source and view controls.
pub struct ControlPanel {
    pub data_dir: PathBuf,
    pub screen: Screen,
    pub years: Vec<i32>,
    pub selected_year: Option<i32>,
    pub status: String,
    pub status_kind: StatusKind,
    pub export_enabled: bool,
}

impl ControlPanel {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            screen: Screen::default(),
            years: Vec::new(),
            selected_year: None,
            status: "Ready".to_string(),
            status_kind: StatusKind::Info,
            export_enabled: false,
        }
    }

    /// Replace the year options, keeping the current year when it still exists.
    pub fn update_years(&mut self, years: Vec<i32>) {
        if !self.selected_year.is_some_and(|y| years.contains(&y)) {
            self.selected_year = years.first().copied();
        }
        self.years = years;
    }

    pub fn set_status(&mut self, kind: StatusKind, status: impl Into<String>) {
        self.status_kind = kind;
        self.status = status.into();
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🚓 Boston Crime Dashboard")
                    .size(20.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.label(
                    RichText::new(self.data_dir.display().to_string())
                        .size(12.0)
                        .monospace(),
                );
                ui.horizontal(|ui| {
                    if ui.button("📂 Browse").clicked() {
                        action = ControlPanelAction::BrowseFolder;
                    }
                    if ui.button("🔄 Reload").clicked() {
                        action = ControlPanelAction::Reload;
                    }
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Screen Section =====
        ui.label(RichText::new("🧭 View").size(14.0).strong());
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            let before = self.screen;
            ui.radio_value(&mut self.screen, Screen::Explore, "Explore");
            ui.radio_value(&mut self.screen, Screen::Forecast, "Forecast");
            if self.screen != before {
                action = ControlPanelAction::ScreenChanged;
            }
        });

        if self.screen == Screen::Explore {
            ui.add_space(10.0);
            ui.horizontal(|ui| {
                ui.add_sized([80.0, 20.0], egui::Label::new("Year:"));
                let selected = self
                    .selected_year
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| "-".to_string());
                ComboBox::from_id_salt("year")
                    .width(120.0)
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for &year in &self.years {
                            if ui
                                .selectable_label(self.selected_year == Some(year), year.to_string())
                                .clicked()
                                && self.selected_year != Some(year)
                            {
                                self.selected_year = Some(year);
                                action = ControlPanelAction::YearChanged;
                            }
                        }
                    });
            });
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Action Buttons =====
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.export_enabled, |ui| {
                let button = egui::Button::new(RichText::new("🖼 Export PNG").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::Export;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Status Section =====
        ui.label(RichText::new("📊 Status").size(14.0).strong());
        ui.add_space(5.0);

        let status_color = match self.status_kind {
            StatusKind::Error => Color32::from_rgb(220, 53, 69),
            StatusKind::Success => Color32::from_rgb(40, 167, 69),
            StatusKind::Info => Color32::GRAY,
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseFolder,
    Reload,
    ScreenChanged,
    YearChanged,
    Export,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_years_keeps_existing_selection() {
        let mut panel = ControlPanel::new(PathBuf::from("data"));
        panel.update_years(vec![2018, 2017]);
        assert_eq!(panel.selected_year, Some(2018));

        panel.selected_year = Some(2017);
        panel.update_years(vec![2019, 2017]);
        assert_eq!(panel.selected_year, Some(2017));

        panel.update_years(vec![]);
        assert_eq!(panel.selected_year, None);
    }
}
