//! Forecast Panel Widget
//! Location and date inputs, hourly prediction charts and the training summary.

use crate::charts::{ChartPlotter, ChartSeries, FORECAST_COLOR};
use crate::config::ForecastInputConfig;
use crate::data::Location;
use crate::forecast::{ForecastQuery, LocationForecast, TrainingHistory};
use egui::{Color32, ComboBox, DragValue, RichText, ScrollArea};

const CHART_HEIGHT: f32 = 300.0;

/// Actions triggered by the forecast panel
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastPanelAction {
    None,
    Predict,
    Retrain,
}

pub struct ForecastPanel {
    bounds: ForecastInputConfig,
    pub locations: Vec<Location>,
    pub selected_location: usize,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub history: Option<TrainingHistory>,
    pub forecast: Option<LocationForecast>,
}

impl ForecastPanel {
    pub fn new(bounds: ForecastInputConfig) -> Self {
        Self {
            year: bounds.default_year,
            bounds,
            locations: Vec::new(),
            selected_location: 0,
            month: 1,
            day: 1,
            history: None,
            forecast: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.history.is_some()
    }

    pub fn reset(&mut self) {
        self.locations.clear();
        self.selected_location = 0;
        self.history = None;
        self.forecast = None;
    }

    pub fn set_model(&mut self, locations: Vec<Location>, history: TrainingHistory) {
        self.locations = locations;
        self.selected_location = 0;
        self.history = Some(history);
        self.forecast = None;
    }

    pub fn location(&self) -> Option<Location> {
        self.locations.get(self.selected_location).copied()
    }

    /// The date currently entered, with hour 0.
    pub fn query(&self) -> ForecastQuery {
        ForecastQuery::new(self.year, self.month, self.day, 0)
    }

    pub fn show(&mut self, ui: &mut egui::Ui) -> ForecastPanelAction {
        let mut action = ForecastPanelAction::None;

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.heading("Forecast crimes per hour");
                ui.add_space(8.0);

                if !self.is_trained() {
                    ui.label(RichText::new("The model has not been trained yet.").color(Color32::GRAY));
                    if ui.button("▶ Train model").clicked() {
                        action = ForecastPanelAction::Retrain;
                    }
                    return;
                }

                self.show_inputs(ui, &mut action);
                ui.add_space(10.0);
                self.show_training_summary(ui);
                ui.add_space(15.0);

                if let Some(forecast) = &self.forecast {
                    let bars = ChartSeries::hourly_forecast(forecast);
                    let map = ChartSeries::forecast_map(forecast);
                    ChartPlotter::draw_map(ui, "forecast_map", &map, CHART_HEIGHT);
                    ui.add_space(15.0);
                    ChartPlotter::draw_bar_chart(ui, "forecast_hours", &bars, FORECAST_COLOR, CHART_HEIGHT);
                }
            });

        action
    }

    fn show_inputs(&mut self, ui: &mut egui::Ui, action: &mut ForecastPanelAction) {
        egui::Grid::new("forecast_inputs")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label("Location:");
                let selected = self
                    .location()
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "-".to_string());
                ComboBox::from_id_salt("forecast_location")
                    .width(220.0)
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for (i, location) in self.locations.iter().enumerate() {
                            ui.selectable_value(&mut self.selected_location, i, location.to_string());
                        }
                    });
                ui.end_row();

                ui.label("Year:");
                ui.add(DragValue::new(&mut self.year).range(self.bounds.min_year..=self.bounds.max_year));
                ui.end_row();

                ui.label("Month:");
                ui.add(DragValue::new(&mut self.month).range(1..=12));
                ui.end_row();

                ui.label("Day:");
                ui.add(DragValue::new(&mut self.day).range(1..=31));
                ui.end_row();
            });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let predict = egui::Button::new(RichText::new("🔮 Predict").size(15.0))
                .min_size(egui::vec2(140.0, 30.0));
            if ui.add_enabled(self.location().is_some(), predict).clicked() {
                *action = ForecastPanelAction::Predict;
            }
            if ui.button("🔁 Retrain").clicked() {
                *action = ForecastPanelAction::Retrain;
            }
        });
    }

    fn show_training_summary(&self, ui: &mut egui::Ui) {
        let Some(history) = &self.history else {
            return;
        };
        let mut summary = format!(
            "Trained on {} groups ({} held out), {} epochs",
            history.train_rows,
            history.validation_rows,
            history.epochs.len()
        );
        if let Some(last) = history.last() {
            summary.push_str(&format!(", final loss {:.4}", last.loss));
            if let Some(val) = last.val_loss {
                summary.push_str(&format!(", val_loss {:.4}", val));
            }
        }
        ui.label(RichText::new(summary).size(11.0).color(Color32::GRAY));
    }
}
