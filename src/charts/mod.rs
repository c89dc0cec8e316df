//! Charts module - series preparation, interactive plotting and PNG export

mod plotter;
mod renderer;
mod series;

pub use plotter::{ChartPlotter, BAR_COLOR, FORECAST_COLOR};
pub use renderer::{RenderError, StaticChartRenderer, DEFAULT_SIZE};
pub use series::{BarSeries, BarValue, ChartSeries, MapPoint, MapSeries, UNKNOWN_DISTRICT};
