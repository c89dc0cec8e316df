//! Chart Plotter Module
//! Draws bar and map series with egui_plot.

use super::series::{BarSeries, MapSeries};
use crate::data::TimeOfDay;
use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, Legend, Plot, PlotPoints, Points};
use std::collections::BTreeMap;

pub const BAR_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue
pub const FORECAST_COLOR: Color32 = Color32::from_rgb(231, 76, 60); // Red
pub const NEGATIVE_COLOR: Color32 = Color32::from_rgb(149, 165, 166); // Grey

/// Marker radius tiers for sized points; egui_plot has one radius per series.
const RADIUS_TIERS: usize = 5;
const MIN_RADIUS: f32 = 2.0;
const MAX_RADIUS: f32 = 9.0;

/// Boston sits near 42.3N, so one degree of longitude is about 0.74 of a degree of latitude.
const MAP_ASPECT: f32 = 1.35;

pub struct ChartPlotter;

impl ChartPlotter {
    pub fn time_of_day_color(bucket: Option<TimeOfDay>) -> Color32 {
        match bucket {
            Some(TimeOfDay::Night) => Color32::from_rgb(44, 62, 80),
            Some(TimeOfDay::Morning) => Color32::from_rgb(243, 156, 18),
            Some(TimeOfDay::Afternoon) => Color32::from_rgb(46, 204, 113),
            Some(TimeOfDay::Evening) => Color32::from_rgb(155, 89, 182),
            None => FORECAST_COLOR,
        }
    }

    /// Tier in `0..RADIUS_TIERS` for a marker of `size` relative to `max_size`.
    pub fn radius_tier(size: f64, max_size: f64) -> usize {
        if max_size <= 0.0 || !size.is_finite() {
            return 0;
        }
        let fraction = (size / max_size).clamp(0.0, 1.0);
        ((fraction * (RADIUS_TIERS - 1) as f64).round() as usize).min(RADIUS_TIERS - 1)
    }

    fn tier_radius(tier: usize) -> f32 {
        MIN_RADIUS + (MAX_RADIUS - MIN_RADIUS) * tier as f32 / (RADIUS_TIERS - 1) as f32
    }

    fn empty_notice(ui: &mut egui::Ui, height: f32) {
        ui.allocate_ui(egui::vec2(ui.available_width(), height), |ui| {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No data for this selection").color(Color32::GRAY));
            });
        });
    }

    /// Bars at their x positions with category labels on the x axis.
    pub fn draw_bar_chart(ui: &mut egui::Ui, id: &str, series: &BarSeries, color: Color32, height: f32) {
        ui.label(RichText::new(&series.title).size(14.0).strong());
        if series.bars.is_empty() {
            Self::empty_notice(ui, height);
            return;
        }

        let labels: BTreeMap<i64, String> = series
            .bars
            .iter()
            .map(|bar| (bar.x.round() as i64, bar.label.clone()))
            .collect();

        let bars: Vec<Bar> = series
            .bars
            .iter()
            .map(|bar| {
                let fill = if bar.value < 0.0 { NEGATIVE_COLOR } else { color };
                Bar::new(bar.x, bar.value)
                    .width(0.7)
                    .name(&bar.label)
                    .fill(fill)
            })
            .collect();

        Plot::new(id)
            .height(height)
            .allow_scroll(false)
            .x_axis_label(series.x_label.clone())
            .y_axis_label(series.y_label.clone())
            .include_y(0.0)
            .x_axis_formatter(move |mark, _range| {
                if mark.value.fract().abs() > f64::EPSILON {
                    return String::new();
                }
                labels
                    .get(&(mark.value as i64))
                    .cloned()
                    .unwrap_or_default()
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name(&series.y_label));
            });
    }

    /// Scatter of longitude/latitude; colour by time of day, radius by size tier.
    pub fn draw_map(ui: &mut egui::Ui, id: &str, series: &MapSeries, height: f32) {
        ui.label(RichText::new(&series.title).size(14.0).strong());
        if series.points.is_empty() {
            Self::empty_notice(ui, height);
            return;
        }

        let max_size = series.max_size();
        let mut layers: BTreeMap<(Option<TimeOfDay>, usize), Vec<[f64; 2]>> = BTreeMap::new();
        for point in &series.points {
            let tier = Self::radius_tier(point.size, max_size);
            layers
                .entry((point.time_of_day, tier))
                .or_default()
                .push([point.long, point.lat]);
        }

        Plot::new(id)
            .height(height)
            .data_aspect(MAP_ASPECT)
            .x_axis_label("Longitude")
            .y_axis_label("Latitude")
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                for ((bucket, tier), coords) in layers {
                    let name = bucket.map(|b| b.label()).unwrap_or("Prediction");
                    plot_ui.points(
                        Points::new(PlotPoints::from(coords))
                            .radius(Self::tier_radius(tier))
                            .color(Self::time_of_day_color(bucket).gamma_multiply(0.75))
                            .name(name),
                    );
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_tiers() {
        assert_eq!(ChartPlotter::radius_tier(0.0, 10.0), 0);
        assert_eq!(ChartPlotter::radius_tier(10.0, 10.0), RADIUS_TIERS - 1);
        assert_eq!(ChartPlotter::radius_tier(5.0, 10.0), 2);
        assert_eq!(ChartPlotter::radius_tier(3.0, 0.0), 0);
        assert_eq!(ChartPlotter::radius_tier(f64::NAN, 1.0), 0);
    }

    #[test]
    fn test_each_bucket_has_its_own_color() {
        let colors: Vec<Color32> = TimeOfDay::ALL
            .iter()
            .map(|&t| ChartPlotter::time_of_day_color(Some(t)))
            .collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
