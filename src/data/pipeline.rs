//! Pipeline Module
//! Session-level entry points: configuration in, immutable tables out.

use super::aggregator::Aggregator;
use super::columns::*;
use super::enricher::FeatureEnricher;
use super::loader::{DataLoader, LoaderError, SourceTables};
use super::processor::{CleanOptions, DataProcessor, ProcessorError};
use crate::config::DataSourceConfig;
use polars::prelude::*;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

impl PipelineError {
    /// The single message shown to the dashboard user.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Loader(LoaderError::DataUnavailable { dir }) => format!(
                "The data files were not found in directory {}.",
                dir.display()
            ),
            other => other.to_string(),
        }
    }

    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, PipelineError::Loader(LoaderError::DataUnavailable { .. }))
    }
}

/// A selectable forecast location (mean coordinates of a group).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub long: f64,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.long)
    }
}

/// Clean, merge and enrich tables that are already in memory.
pub fn enrich_tables(
    tables: &SourceTables,
    options: CleanOptions,
) -> Result<DataFrame, ProcessorError> {
    let merged = DataProcessor::clean_and_merge(&tables.incidents, &tables.offense_codes, options)?;
    FeatureEnricher::enrich(&merged)
}

/// Enriched incident table for the exploration screen.
pub fn prepare_exploration(config: &DataSourceConfig) -> Result<DataFrame, PipelineError> {
    let tables = DataLoader::new(config.clone()).load()?;
    Ok(enrich_tables(&tables, CleanOptions::exploration())?)
}

/// Aggregated district-hour groups for training the forecaster.
pub fn prepare_training_groups(config: &DataSourceConfig) -> Result<DataFrame, PipelineError> {
    let tables = DataLoader::new(config.clone()).load()?;
    let enriched = enrich_tables(&tables, CleanOptions::forecasting())?;
    Ok(Aggregator::aggregate(&enriched)?)
}

/// Distinct years present, newest first.
pub fn available_years(enriched: &DataFrame) -> Result<Vec<i32>, ProcessorError> {
    let years = enriched.column(YEAR)?.cast(&DataType::Int32)?;
    let mut years: Vec<i32> = years
        .i32()?
        .into_iter()
        .flatten()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    Ok(years)
}

pub fn filter_by_year(enriched: &DataFrame, year: i32) -> Result<DataFrame, ProcessorError> {
    DataProcessor::require_columns(enriched, &[YEAR])?;
    let filtered = enriched
        .clone()
        .lazy()
        .filter(col(YEAR).eq(lit(year)))
        .collect()?;
    Ok(filtered)
}

/// Distinct (lat, long) pairs of an aggregated table, first appearance order.
pub fn location_options(aggregated: &DataFrame) -> Result<Vec<Location>, ProcessorError> {
    DataProcessor::require_columns(aggregated, &[LAT, LONG])?;
    let lat = aggregated.column(LAT)?.cast(&DataType::Float64)?;
    let long = aggregated.column(LONG)?.cast(&DataType::Float64)?;

    let mut seen = HashSet::new();
    let locations = lat
        .f64()?
        .into_iter()
        .zip(long.f64()?.into_iter())
        .filter_map(|(lat, long)| Some(Location { lat: lat?, long: long? }))
        .filter(|loc| seen.insert((loc.lat.to_bits(), loc.long.to_bits())))
        .collect();
    Ok(locations)
}
