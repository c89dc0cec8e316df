//! Crime Dashboard Main Application
//! Main window with control panel, exploration charts and the forecast screen.
//!
//! Every interaction runs to completion on the UI thread: loading the files,
//! training the forecaster and predicting block the frame that triggered them.

use crate::charts::{BarSeries, ChartSeries, StaticChartRenderer};
use crate::config::{DashboardConfig, DataSourceConfig};
use crate::data::{
    available_years, filter_by_year, location_options, prepare_exploration,
    prepare_training_groups,
};
use crate::forecast::Forecaster;
use crate::gui::{
    ChartViewer, ControlPanel, ControlPanelAction, ExploreCharts, ForecastPanel,
    ForecastPanelAction, Screen, StatusKind,
};
use anyhow::{anyhow, Context};
use egui::{Color32, RichText, SidePanel};
use polars::prelude::DataFrame;

/// Main application window.
pub struct CrimeDashboardApp {
    config: DashboardConfig,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
    forecast_panel: ForecastPanel,

    /// Enriched incidents of the current data folder.
    enriched: Option<DataFrame>,
    forecaster: Option<Forecaster>,
    load_error: Option<String>,
}

impl CrimeDashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        Self::with_config(config)
    }

    /// Build the session state and load the configured data folder.
    pub fn with_config(config: DashboardConfig) -> Self {
        let mut app = Self {
            control_panel: ControlPanel::new(config.data.data_dir.clone()),
            chart_viewer: ChartViewer::new(),
            forecast_panel: ForecastPanel::new(config.forecast.clone()),
            config,
            enriched: None,
            forecaster: None,
            load_error: None,
        };
        app.reload();
        app
    }

    fn data_source(&self) -> DataSourceConfig {
        DataSourceConfig {
            data_dir: self.control_panel.data_dir.clone(),
            ..self.config.data.clone()
        }
    }

    fn handle_browse_folder(&mut self) {
        if let Some(dir) = rfd::FileDialog::new()
            .set_directory(&self.control_panel.data_dir)
            .pick_folder()
        {
            self.control_panel.data_dir = dir;
            self.reload();
        }
    }

    /// Reload the source files and drop every derived table and model.
    fn reload(&mut self) {
        self.chart_viewer.clear();
        self.forecast_panel.reset();
        self.enriched = None;
        self.forecaster = None;
        self.load_error = None;
        self.control_panel.export_enabled = false;

        let enriched = prepare_exploration(&self.data_source());
        let enriched = match enriched {
            Ok(df) => df,
            Err(e) => {
                log::error!("Failed to prepare data: {}", e);
                let message = e.user_message();
                self.control_panel.update_years(Vec::new());
                self.control_panel.set_status(StatusKind::Error, &message);
                self.load_error = Some(message);
                return;
            }
        };

        match available_years(&enriched) {
            Ok(years) => self.control_panel.update_years(years),
            Err(e) => {
                self.control_panel
                    .set_status(StatusKind::Error, format!("Error: {}", e));
                return;
            }
        }

        self.control_panel.set_status(
            StatusKind::Success,
            format!("Loaded {} incidents", enriched.height()),
        );
        self.enriched = Some(enriched);
        self.refresh_explore();

        if self.control_panel.screen == Screen::Forecast {
            self.ensure_trained();
        }
    }

    fn build_explore_charts(&self) -> anyhow::Result<Option<ExploreCharts>> {
        let (Some(enriched), Some(year)) = (&self.enriched, self.control_panel.selected_year)
        else {
            return Ok(None);
        };

        let filtered = filter_by_year(enriched, year)?;
        Ok(Some(ExploreCharts {
            year,
            rows: filtered.height(),
            monthly: ChartSeries::monthly_histogram(&filtered)?,
            map: ChartSeries::crime_map(&filtered)?,
            density: ChartSeries::district_density(&filtered)?,
        }))
    }

    fn refresh_explore(&mut self) {
        match self.build_explore_charts() {
            Ok(Some(charts)) => {
                self.chart_viewer.set_charts(charts);
                self.control_panel.export_enabled = true;
            }
            Ok(None) => self.chart_viewer.clear(),
            Err(e) => {
                log::error!("Failed to prepare charts: {:#}", e);
                self.chart_viewer.clear();
                self.control_panel
                    .set_status(StatusKind::Error, format!("Error: {:#}", e));
            }
        }
    }

    fn ensure_trained(&mut self) {
        if self.forecaster.is_none() && self.load_error.is_none() {
            self.train();
        }
    }

    /// Aggregate, train and refresh the location list. Blocks until done.
    fn train(&mut self) {
        let source = self.data_source();
        let result = (|| -> anyhow::Result<_> {
            let aggregated =
                prepare_training_groups(&source).map_err(|e| anyhow!(e.user_message()))?;
            let forecaster = Forecaster::train_from_frame(&aggregated, &self.config.training)
                .context("training failed")?;
            let locations = location_options(&aggregated)?;
            Ok((forecaster, locations))
        })();

        match result {
            Ok((forecaster, locations)) => {
                let history = forecaster.history().clone();
                self.control_panel.set_status(
                    StatusKind::Success,
                    format!(
                        "Model trained on {} groups, {} locations",
                        history.train_rows + history.validation_rows,
                        locations.len()
                    ),
                );
                self.forecast_panel.set_model(locations, history);
                self.forecaster = Some(forecaster);
            }
            Err(e) => {
                log::error!("{:#}", e);
                self.forecaster = None;
                self.forecast_panel.reset();
                self.control_panel
                    .set_status(StatusKind::Error, format!("Error: {:#}", e));
            }
        }
    }

    fn predict(&mut self) {
        let (Some(forecaster), Some(location)) = (&self.forecaster, self.forecast_panel.location())
        else {
            return;
        };
        let query = self.forecast_panel.query();

        match forecaster.forecast_location(location, query.year, query.month, query.day) {
            Ok(forecast) => {
                self.forecast_panel.forecast = Some(forecast);
                self.control_panel.export_enabled = true;
            }
            Err(e) => {
                self.control_panel
                    .set_status(StatusKind::Error, format!("Prediction error: {}", e));
            }
        }
    }

    /// Write the current bar charts as PNG files and open the export folder.
    fn handle_export(&mut self) {
        let mut charts: Vec<(String, BarSeries)> = Vec::new();
        if let Some(explore) = &self.chart_viewer.charts {
            charts.push((
                format!("monthly_histogram_{}.png", explore.year),
                explore.monthly.clone(),
            ));
            charts.push((
                format!("district_density_{}.png", explore.year),
                explore.density.clone(),
            ));
        }
        if let Some(forecast) = &self.forecast_panel.forecast {
            charts.push((
                "hourly_forecast.png".to_string(),
                ChartSeries::hourly_forecast(forecast),
            ));
        }

        if charts.is_empty() {
            self.control_panel
                .set_status(StatusKind::Info, "No charts to export");
            return;
        }

        let dir = self.config.export_dir.clone();
        let refs: Vec<(String, &BarSeries)> =
            charts.iter().map(|(name, series)| (name.clone(), series)).collect();
        match StaticChartRenderer::export_all(&dir, &refs) {
            Ok(paths) => {
                self.control_panel.set_status(
                    StatusKind::Success,
                    format!("Exported {} charts to {}", paths.len(), dir.display()),
                );
                if let Err(e) = open::that(&dir) {
                    log::warn!("Could not open {}: {}", dir.display(), e);
                }
            }
            Err(e) => {
                log::error!("Export failed: {}", e);
                self.control_panel
                    .set_status(StatusKind::Error, format!("Export error: {}", e));
            }
        }
    }

    fn show_load_error(ui: &mut egui::Ui, message: &str) {
        ui.centered_and_justified(|ui| {
            ui.label(
                RichText::new(message)
                    .size(16.0)
                    .color(Color32::from_rgb(220, 53, 69)),
            );
        });
    }
}

impl eframe::App for CrimeDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(260.0)
            .max_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::BrowseFolder => self.handle_browse_folder(),
                        ControlPanelAction::Reload => self.reload(),
                        ControlPanelAction::ScreenChanged => {
                            if self.control_panel.screen == Screen::Forecast {
                                self.ensure_trained();
                            }
                        }
                        ControlPanelAction::YearChanged => self.refresh_explore(),
                        ControlPanelAction::Export => self.handle_export(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - current screen
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(message) = &self.load_error {
                Self::show_load_error(ui, message);
                return;
            }

            match self.control_panel.screen {
                Screen::Explore => self.chart_viewer.show(ui),
                Screen::Forecast => match self.forecast_panel.show(ui) {
                    ForecastPanelAction::Predict => self.predict(),
                    ForecastPanelAction::Retrain => self.train(),
                    ForecastPanelAction::None => {}
                },
            }
        });
    }
}
