//! Dashboard Configuration
//! Data source paths, training schedule and forecast input bounds, read from JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CRIME_DASHBOARD_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "dashboard.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Location and text encoding of the two source tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    pub data_dir: PathBuf,
    pub incidents_file: String,
    pub offense_codes_file: String,
    /// WHATWG encoding label, e.g. `windows-1254`.
    pub encoding: String,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            incidents_file: "crime.csv".to_string(),
            offense_codes_file: "offense_codes.csv".to_string(),
            encoding: "windows-1254".to_string(),
        }
    }
}

impl DataSourceConfig {
    /// Config rooted at `data_dir` with the default file names.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn incidents_path(&self) -> PathBuf {
        self.data_dir.join(&self.incidents_file)
    }

    pub fn offense_codes_path(&self) -> PathBuf {
        self.data_dir.join(&self.offense_codes_file)
    }
}

/// Fixed training schedule of the hourly forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Trailing fraction of rows held out for validation loss only.
    pub validation_split: f64,
    pub learning_rate: f64,
    pub hidden_units: usize,
    pub dropout_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            validation_split: 0.2,
            learning_rate: 0.001,
            hidden_units: 64,
            dropout_rate: 0.1,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::Invalid("training.epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "training.batch_size must be at least 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(ConfigError::Invalid(format!(
                "training.validation_split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(ConfigError::Invalid(format!(
                "training.dropout_rate must be in [0, 1), got {}",
                self.dropout_rate
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(ConfigError::Invalid(
                "training.learning_rate must be positive".into(),
            ));
        }
        if self.hidden_units == 0 {
            return Err(ConfigError::Invalid(
                "training.hidden_units must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Bounds of the forecast date inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastInputConfig {
    pub min_year: i32,
    pub max_year: i32,
    pub default_year: i32,
}

impl Default for ForecastInputConfig {
    fn default() -> Self {
        Self {
            min_year: 2015,
            max_year: 2024,
            default_year: 2022,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataSourceConfig,
    pub training: TrainingConfig,
    pub forecast: ForecastInputConfig,
    pub export_dir: PathBuf,
}

impl DashboardConfig {
    /// Resolve the config from `CRIME_DASHBOARD_CONFIG`, then `./dashboard.json`,
    /// then built-in defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }

        log::debug!("No config file found, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        log::info!("Loaded dashboard config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.incidents_file.trim().is_empty()
            || self.data.offense_codes_file.trim().is_empty()
        {
            return Err(ConfigError::Invalid("data file names must not be empty".into()));
        }
        if encoding_rs::Encoding::for_label(self.data.encoding.trim().as_bytes()).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown text encoding '{}'",
                self.data.encoding
            )));
        }

        self.training.validate()?;

        let forecast = &self.forecast;
        if forecast.min_year > forecast.max_year {
            return Err(ConfigError::Invalid(format!(
                "forecast.min_year {} is after forecast.max_year {}",
                forecast.min_year, forecast.max_year
            )));
        }
        if !(forecast.min_year..=forecast.max_year).contains(&forecast.default_year) {
            return Err(ConfigError::Invalid(format!(
                "forecast.default_year {} is outside {}..={}",
                forecast.default_year, forecast.min_year, forecast.max_year
            )));
        }
        Ok(())
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data: DataSourceConfig::default(),
            training: TrainingConfig::default(),
            forecast: ForecastInputConfig::default(),
            export_dir: PathBuf::from("exports"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", body).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = DashboardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.training.epochs, 10);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.data.incidents_path(), PathBuf::from("data/crime.csv"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(r#"{ "data": { "data_dir": "/srv/boston" }, "training": { "epochs": 3 } }"#);
        let config = DashboardConfig::from_file(file.path()).unwrap();

        assert_eq!(config.data.data_dir, PathBuf::from("/srv/boston"));
        assert_eq!(config.data.offense_codes_file, "offense_codes.csv");
        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.forecast, ForecastInputConfig::default());
    }

    #[test]
    fn test_rejects_bad_validation_split() {
        let file = write_config(r#"{ "training": { "validation_split": 1.0 } }"#);
        let err = DashboardConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_encoding() {
        let file = write_config(r#"{ "data": { "encoding": "klingon-8" } }"#);
        let err = DashboardConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("klingon-8"));
    }

    #[test]
    fn test_rejects_default_year_out_of_bounds() {
        let mut config = DashboardConfig::default();
        config.forecast.default_year = 2030;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let file = write_config("{ not json");
        let err = DashboardConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
