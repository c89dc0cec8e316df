//! CSV Data Loader Module
//! Reads the incident and offense-code tables from the data directory,
//! decoding their legacy 8-bit text before handing the bytes to Polars.

use crate::config::DataSourceConfig;
use encoding_rs::Encoding;
use polars::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Data files were not found in directory {}", dir.display())]
    DataUnavailable { dir: PathBuf },
    #[error("Unknown text encoding '{0}'")]
    UnknownEncoding(String),
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
}

/// The two raw tables, always loaded together.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub incidents: DataFrame,
    pub offense_codes: DataFrame,
}

/// Loads both source tables of a [`DataSourceConfig`].
pub struct DataLoader {
    config: DataSourceConfig,
}

impl DataLoader {
    pub fn new(config: DataSourceConfig) -> Self {
        Self { config }
    }

    /// Load both tables. Nothing is read unless both files exist.
    pub fn load(&self) -> Result<SourceTables, LoaderError> {
        let incidents_path = self.config.incidents_path();
        let offense_codes_path = self.config.offense_codes_path();

        let missing: Vec<&PathBuf> = [&incidents_path, &offense_codes_path]
            .into_iter()
            .filter(|path| !path.is_file())
            .collect();
        if !missing.is_empty() {
            for path in missing {
                log::error!("Missing data file {}", path.display());
            }
            return Err(LoaderError::DataUnavailable {
                dir: self.config.data_dir.clone(),
            });
        }

        let encoding = Self::resolve_encoding(&self.config.encoding)?;
        let incidents = Self::read_csv(&incidents_path, encoding)?;
        let offense_codes = Self::read_csv(&offense_codes_path, encoding)?;

        log::info!(
            "Loaded {} incident rows and {} offense codes from {} ({})",
            incidents.height(),
            offense_codes.height(),
            self.config.data_dir.display(),
            encoding.name()
        );

        Ok(SourceTables {
            incidents,
            offense_codes,
        })
    }

    pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, LoaderError> {
        Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| LoaderError::UnknownEncoding(label.to_string()))
    }

    pub fn read_csv(path: &Path, encoding: &'static Encoding) -> Result<DataFrame, LoaderError> {
        let bytes = fs::read(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_csv(&bytes, encoding)
    }

    /// Decode `bytes` and parse them as a CSV table with a header row.
    pub fn parse_csv(bytes: &[u8], encoding: &'static Encoding) -> Result<DataFrame, LoaderError> {
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            log::warn!(
                "Some bytes are not valid {}; they were replaced with U+FFFD",
                encoding.name()
            );
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .into_reader_with_file_handle(Cursor::new(text.into_owned().into_bytes()))
            .finish()?;

        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::columns::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_decodes_windows_1254() {
        // 0x92 is a right single quote, 0xFE a Turkish s-cedilla
        let mut bytes = b"CODE,NAME\n613,LARCENY SHOPLIFTING\n3115,INVESTIGATE PERSON\n".to_vec();
        bytes.extend_from_slice(b"2010,BURGLARY OWNER");
        bytes.push(0x92);
        bytes.extend_from_slice(b"S KE");
        bytes.push(0xFE);
        bytes.push(b'\n');

        let encoding = DataLoader::resolve_encoding("windows-1254").unwrap();
        let df = DataLoader::parse_csv(&bytes, encoding).unwrap();

        assert_eq!(df.height(), 3);
        let names = df.column("NAME").unwrap().str().unwrap();
        assert_eq!(names.get(2), Some("BURGLARY OWNER\u{2019}S KE\u{015F}"));
    }

    #[test]
    fn test_missing_file_is_data_unavailable() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("crime.csv"), "OFFENSE_CODE\n1\n").unwrap();

        let loader = DataLoader::new(DataSourceConfig::in_dir(dir.path()));
        let err = loader.load().unwrap_err();

        match err {
            LoaderError::DataUnavailable { dir: reported } => assert_eq!(reported, dir.path()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_both_files_missing_names_directory() {
        let dir = tempdir().unwrap();
        let loader = DataLoader::new(DataSourceConfig::in_dir(dir.path().join("nowhere")));
        let message = loader.load().unwrap_err().to_string();
        assert!(message.contains("nowhere"));
    }

    #[test]
    fn test_load_both_tables() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("crime.csv"),
            "INCIDENT_NUMBER,OFFENSE_CODE,DISTRICT,OCCURRED_ON_DATE,Lat,Long\n\
             I1,613,A1,2018-09-02 13:00:00,42.35,-71.06\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("offense_codes.csv"), "CODE,NAME\n613,LARCENY\n").unwrap();

        let tables = DataLoader::new(DataSourceConfig::in_dir(dir.path()))
            .load()
            .unwrap();

        assert_eq!(tables.incidents.height(), 1);
        assert_eq!(tables.offense_codes.height(), 1);
        assert!(tables.incidents.column(OFFENSE_CODE).is_ok());
        assert!(tables.offense_codes.column(CODE).is_ok());
    }

    #[test]
    fn test_unknown_encoding() {
        assert!(matches!(
            DataLoader::resolve_encoding("not-an-encoding"),
            Err(LoaderError::UnknownEncoding(_))
        ));
    }
}
