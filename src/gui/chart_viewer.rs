//! Chart Viewer Widget
//! Central scrollable panel with the exploration charts for one year.

use crate::charts::{BarSeries, ChartPlotter, MapSeries, BAR_COLOR};
use egui::{Color32, RichText, ScrollArea};

const CHART_SPACING: f32 = 15.0;
const BAR_HEIGHT: f32 = 280.0;
const MAP_HEIGHT: f32 = 420.0;

/// The three exploration charts prepared for the selected year.
#[derive(Debug, Clone)]
pub struct ExploreCharts {
    pub year: i32,
    pub rows: usize,
    pub monthly: BarSeries,
    pub map: MapSeries,
    pub density: BarSeries,
}

#[derive(Default)]
pub struct ChartViewer {
    pub charts: Option<ExploreCharts>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.charts = None;
    }

    pub fn set_charts(&mut self, charts: ExploreCharts) {
        self.charts = Some(charts);
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        let Some(charts) = &self.charts else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.heading(format!("Boston crimes in {}", charts.year));
                ui.label(
                    RichText::new(format!("{} incidents", charts.rows))
                        .size(12.0)
                        .color(Color32::GRAY),
                );
                ui.add_space(CHART_SPACING);

                Self::card(ui, |ui| {
                    ChartPlotter::draw_bar_chart(ui, "monthly", &charts.monthly, BAR_COLOR, BAR_HEIGHT)
                });
                ui.add_space(CHART_SPACING);

                Self::card(ui, |ui| ChartPlotter::draw_map(ui, "crime_map", &charts.map, MAP_HEIGHT));
                ui.add_space(CHART_SPACING);

                Self::card(ui, |ui| {
                    ChartPlotter::draw_bar_chart(ui, "density", &charts.density, BAR_COLOR, BAR_HEIGHT)
                });
            });
    }

    fn card(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(1.0, Color32::from_gray(90)))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, add_contents);
    }
}
