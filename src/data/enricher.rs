//! Feature Enricher Module
//! Derives calendar fields, time-of-day buckets and district crime density.

use super::columns::*;
use super::processor::{DataProcessor, ProcessorError};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use polars::prelude::*;
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fmt;

/// Hour-of-day bucket over right-open intervals [0,6), [6,12), [12,18), [18,24).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeOfDay {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Night,
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
    ];

    /// `None` for hours outside 0..24.
    pub fn from_hour(hour: u32) -> Option<Self> {
        match hour {
            0..=5 => Some(TimeOfDay::Night),
            6..=11 => Some(TimeOfDay::Morning),
            12..=17 => Some(TimeOfDay::Afternoon),
            18..=23 => Some(TimeOfDay::Evening),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Night => "Night",
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const TIMESTAMP_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse an occurrence timestamp. Offsets are dropped, keeping wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%#z") {
        return Some(ts.naive_local());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Adds the derived temporal and density columns to a merged table.
pub struct FeatureEnricher;

impl FeatureEnricher {
    /// Returns a new table; `merged` is left untouched.
    ///
    /// Fails on the first timestamp that cannot be parsed.
    pub fn enrich(merged: &DataFrame) -> Result<DataFrame, ProcessorError> {
        DataProcessor::require_columns(merged, &[OCCURRED_ON_DATE, DISTRICT])?;

        let n = merged.height();
        let mut timestamps = Vec::with_capacity(n);
        let mut years = Vec::with_capacity(n);
        let mut months = Vec::with_capacity(n);
        let mut days = Vec::with_capacity(n);
        let mut hours = Vec::with_capacity(n);
        let mut weekdays = Vec::with_capacity(n);
        let mut buckets = Vec::with_capacity(n);

        let raw_stamps = merged.column(OCCURRED_ON_DATE)?.cast(&DataType::String)?;
        for (row, raw) in raw_stamps.str()?.into_iter().enumerate() {
            let raw = raw.unwrap_or_default();
            let ts = parse_timestamp(raw).ok_or_else(|| ProcessorError::MalformedTimestamp {
                row,
                value: raw.to_string(),
            })?;
            let hour = ts.hour();
            let bucket = TimeOfDay::from_hour(hour).ok_or(ProcessorError::HourOutOfRange(hour))?;

            timestamps.push(ts);
            years.push(ts.year());
            months.push(ts.month() as i32);
            days.push(ts.day() as i32);
            hours.push(hour as i32);
            weekdays.push(weekday_name(ts.weekday()));
            buckets.push(bucket.label());
        }

        let density = Self::district_density(merged)?;

        let mut enriched = merged.clone();
        enriched.with_column(Column::new(OCCURRED_ON_DATE.into(), timestamps))?;
        enriched.with_column(Column::new(YEAR.into(), years))?;
        enriched.with_column(Column::new(MONTH.into(), months))?;
        enriched.with_column(Column::new(DAY.into(), days))?;
        enriched.with_column(Column::new(HOUR.into(), hours))?;
        enriched.with_column(Column::new(DAY_OF_WEEK.into(), weekdays))?;
        enriched.with_column(Column::new(TIME_OF_DAY.into(), buckets))?;
        enriched.with_column(Column::new(CRIME_DENSITY.into(), density))?;

        log::info!("Enriched {} rows with temporal and density features", n);
        Ok(enriched)
    }

    /// Rows per district, broadcast back to each row. Rows without a district
    /// take the mean density of the rows that have one (0 if none do).
    pub fn district_density(merged: &DataFrame) -> Result<Vec<f64>, ProcessorError> {
        let districts = merged.column(DISTRICT)?.cast(&DataType::String)?;
        let districts = districts.str()?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for district in districts.into_iter().flatten() {
            *counts.entry(district).or_default() += 1;
        }

        let mapped: Vec<Option<f64>> = districts
            .into_iter()
            .map(|district| district.and_then(|d| counts.get(d)).map(|&c| c as f64))
            .collect();

        let present: Vec<f64> = mapped.iter().flatten().copied().collect();
        let fallback = if present.is_empty() {
            if !mapped.is_empty() {
                log::warn!("No row has a district; imputing crime density 0");
            }
            0.0
        } else {
            present.iter().mean()
        };

        Ok(mapped
            .into_iter()
            .map(|density| density.unwrap_or(fallback))
            .collect())
    }
}
