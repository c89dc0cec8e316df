//! Static Chart Renderer
//! Exports bar series as PNG files for sharing outside the dashboard.
//!
//! plotters draws into an in-memory RGB buffer; the `image` crate encodes it.

use super::series::{BarSeries, BarValue};
use image::RgbImage;
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

const BAR_FILL: RGBColor = RGBColor(91, 155, 213);
const NEGATIVE_FILL: RGBColor = RGBColor(200, 200, 200);

pub const DEFAULT_SIZE: (u32, u32) = (1200, 700);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("Image buffer does not match {width}x{height}")]
    Buffer { width: u32, height: u32 },
    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn drawing<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Drawing(err.to_string())
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Y range that always includes zero, with headroom above the tallest bar.
    pub fn value_range(bars: &[BarValue]) -> (f64, f64) {
        let min = bars.iter().map(|b| b.value).fold(0.0, f64::min);
        let max = bars.iter().map(|b| b.value).fold(0.0, f64::max);
        if (max - min).abs() < f64::EPSILON {
            return (min, min + 1.0);
        }
        let pad = (max - min) * 0.1;
        (if min < 0.0 { min - pad } else { 0.0 }, max + pad)
    }

    /// RGB pixels of the rendered chart, row-major.
    pub fn render_bar_chart_to_rgb(
        series: &BarSeries,
        (width, height): (u32, u32),
    ) -> Result<Vec<u8>, RenderError> {
        let mut buffer = vec![0u8; (width as usize) * (height as usize) * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(drawing)?;

            let labels = series.labels();
            let slots = series.bars.len().max(1);
            let (y_min, y_max) = Self::value_range(&series.bars);

            let mut chart = ChartBuilder::on(&root)
                .caption(&series.title, ("sans-serif", 28))
                .margin(20)
                .x_label_area_size(50)
                .y_label_area_size(70)
                .build_cartesian_2d((0..slots).into_segmented(), y_min..y_max)
                .map_err(drawing)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_desc(series.x_label.as_str())
                .y_desc(series.y_label.as_str())
                .x_labels(slots)
                .x_label_formatter(&|value| match value {
                    SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
                    _ => String::new(),
                })
                .draw()
                .map_err(drawing)?;

            chart
                .draw_series(series.bars.iter().enumerate().map(|(i, bar)| {
                    let (low, high, fill) = if bar.value < 0.0 {
                        (bar.value, 0.0, NEGATIVE_FILL)
                    } else {
                        (0.0, bar.value, BAR_FILL)
                    };
                    let mut rect = Rectangle::new(
                        [(SegmentValue::Exact(i), low), (SegmentValue::Exact(i + 1), high)],
                        fill.filled(),
                    );
                    rect.set_margin(0, 0, 6, 6);
                    rect
                }))
                .map_err(drawing)?;

            root.present().map_err(drawing)?;
        }
        Ok(buffer)
    }

    pub fn render_bar_chart(
        series: &BarSeries,
        path: &Path,
        size: (u32, u32),
    ) -> Result<(), RenderError> {
        let buffer = Self::render_bar_chart_to_rgb(series, size)?;
        let (width, height) = size;
        let image = RgbImage::from_raw(width, height, buffer)
            .ok_or(RenderError::Buffer { width, height })?;
        image.save(path)?;
        log::info!("Exported '{}' to {}", series.title, path.display());
        Ok(())
    }

    /// Render each `(file name, series)` pair into `dir`, creating it if needed.
    pub fn export_all(
        dir: &Path,
        charts: &[(String, &BarSeries)],
    ) -> Result<Vec<PathBuf>, RenderError> {
        std::fs::create_dir_all(dir).map_err(|source| RenderError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::with_capacity(charts.len());
        for (file_name, series) in charts {
            let path = dir.join(file_name);
            Self::render_bar_chart(series, &path, DEFAULT_SIZE)?;
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(value: f64) -> BarValue {
        BarValue {
            label: String::new(),
            x: 0.0,
            value,
        }
    }

    #[test]
    fn test_value_range_includes_zero() {
        assert_eq!(StaticChartRenderer::value_range(&[]), (0.0, 1.0));
        assert_eq!(StaticChartRenderer::value_range(&[bar(0.0), bar(0.0)]), (0.0, 1.0));

        let (low, high) = StaticChartRenderer::value_range(&[bar(10.0), bar(4.0)]);
        assert_eq!(low, 0.0);
        assert!((high - 11.0).abs() < 1e-9);

        let (low, high) = StaticChartRenderer::value_range(&[bar(-2.0), bar(8.0)]);
        assert!((low + 3.0).abs() < 1e-9);
        assert!((high - 9.0).abs() < 1e-9);
    }
}
