//! GUI module - User interface components

mod app;
mod chart_viewer;
mod control_panel;
mod forecast_panel;

pub use app::CrimeDashboardApp;
pub use chart_viewer::{ChartViewer, ExploreCharts};
pub use control_panel::{ControlPanel, ControlPanelAction, Screen, StatusKind};
pub use forecast_panel::{ForecastPanel, ForecastPanelAction};
