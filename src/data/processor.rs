//! Data Processor Module
//! Cleans the raw incident table and left-joins it to the offense-code lookup.

use super::columns::*;
use polars::prelude::*;
use thiserror::Error;

/// Latitude written by the source system when geocoding failed.
pub const SENTINEL_LATITUDE: f64 = -1.0;

const ROW_ORDER: &str = "__row_order";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Missing required column '{0}'")]
    MissingColumn(String),
    #[error("Malformed timestamp '{value}' at row {row}")]
    MalformedTimestamp { row: usize, value: String },
    #[error("Hour {0} is outside the 0-23 range")]
    HourOutOfRange(u32),
}

/// Which incomplete incident rows are dropped before the merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanOptions {
    /// Also drop incidents without a district.
    pub require_district: bool,
}

impl CleanOptions {
    pub fn exploration() -> Self {
        Self {
            require_district: false,
        }
    }

    pub fn forecasting() -> Self {
        Self {
            require_district: true,
        }
    }
}

/// Handles data cleaning and merging operations.
pub struct DataProcessor;

impl DataProcessor {
    pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<(), ProcessorError> {
        for &name in columns {
            if df.column(name).is_err() {
                return Err(ProcessorError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// Drop incomplete incidents, left-join them to their offense description
    /// and discard rows at the sentinel latitude.
    ///
    /// Incident order is preserved and every surviving incident appears once.
    pub fn clean_and_merge(
        incidents: &DataFrame,
        offense_codes: &DataFrame,
        options: CleanOptions,
    ) -> Result<DataFrame, ProcessorError> {
        Self::require_columns(incidents, &[OFFENSE_CODE, OCCURRED_ON_DATE, LAT, LONG, DISTRICT])?;
        Self::require_columns(offense_codes, &[CODE])?;

        let mut complete = col(OFFENSE_CODE)
            .is_not_null()
            .and(col(OCCURRED_ON_DATE).is_not_null())
            .and(col(LAT).is_not_null())
            .and(col(LONG).is_not_null());
        if options.require_district {
            complete = complete.and(col(DISTRICT).is_not_null());
        }

        let cleaned = incidents
            .clone()
            .lazy()
            .with_columns([
                col(OFFENSE_CODE).cast(DataType::Int64),
                col(OCCURRED_ON_DATE).cast(DataType::String),
                col(LAT).cast(DataType::Float64),
                col(LONG).cast(DataType::Float64),
                col(DISTRICT).cast(DataType::String),
            ])
            .filter(complete)
            .with_row_index(ROW_ORDER, None);

        let codes = Self::unique_codes(offense_codes)?;
        let code_count = codes.height();

        let merged = cleaned
            .join(
                codes.lazy(),
                [col(OFFENSE_CODE)],
                [col(CODE)],
                JoinArgs::new(JoinType::Left),
            )
            .filter(col(LAT).neq(lit(SENTINEL_LATITUDE)))
            .sort([ROW_ORDER], SortMultipleOptions::default())
            .collect()?
            .drop(ROW_ORDER)?;

        log::info!(
            "Merged {} incident rows with {} offense codes: {} rows kept",
            incidents.height(),
            code_count,
            merged.height()
        );

        Ok(merged)
    }

    /// Offense codes with a non-null CODE, first row per code.
    fn unique_codes(offense_codes: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let firsts: Vec<Expr> = offense_codes
            .get_column_names()
            .iter()
            .filter(|name| name.as_str() != CODE)
            .map(|name| col(name.as_str()).first())
            .collect();

        let codes = offense_codes
            .clone()
            .lazy()
            .with_columns([col(CODE).cast(DataType::Int64)])
            .filter(col(CODE).is_not_null())
            .group_by_stable([col(CODE)])
            .agg(firsts)
            .collect()?;

        Ok(codes)
    }
}
