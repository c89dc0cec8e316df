//! Crime Dashboard - Boston crime exploration & hourly forecasting
//!
//! Desktop entry point. Set `RUST_LOG=info` to follow loading and training.

use anyhow::{anyhow, Context};
use crime_dashboard::config::DashboardConfig;
use crime_dashboard::gui::CrimeDashboardApp;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let config = DashboardConfig::load_default().context("Failed to load dashboard config")?;
    log::info!("Reading data from {}", config.data.data_dir.display());

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1000.0, 650.0])
            .with_title("Boston Crime Dashboard"),
        ..Default::default()
    };

    eframe::run_native(
        "Boston Crime Dashboard",
        options,
        Box::new(|cc| Ok(Box::new(CrimeDashboardApp::new(cc, config)))),
    )
    .map_err(|e| anyhow!("Failed to start the dashboard: {}", e))
}
