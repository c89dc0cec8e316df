//! Chart Series Module
//! Turns enriched tables and forecasts into renderer-independent series.
//!
//! Every builder accepts zero-row tables and returns an empty (or all-zero)
//! series, so a year without incidents draws blank charts instead of failing.

use crate::data::columns::*;
use crate::data::{DataProcessor, ProcessorError, TimeOfDay};
use crate::forecast::LocationForecast;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Label used for incidents without a district.
pub const UNKNOWN_DISTRICT: &str = "Unknown";

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq)]
pub struct BarValue {
    pub label: String,
    pub x: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<BarValue>,
}

impl BarSeries {
    fn new(title: &str, x_label: &str, y_label: &str) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            bars: Vec::new(),
        }
    }

    /// True when there is nothing to draw.
    pub fn is_blank(&self) -> bool {
        self.bars.iter().all(|bar| bar.value == 0.0)
    }

    pub fn labels(&self) -> Vec<String> {
        self.bars.iter().map(|bar| bar.label.clone()).collect()
    }

    pub fn total(&self) -> f64 {
        self.bars.iter().map(|bar| bar.value).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    pub lat: f64,
    pub long: f64,
    /// Colour category; `None` for forecast points.
    pub time_of_day: Option<TimeOfDay>,
    /// Non-negative marker weight.
    pub size: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSeries {
    pub title: String,
    pub points: Vec<MapPoint>,
}

impl MapSeries {
    pub fn max_size(&self) -> f64 {
        self.points.iter().map(|p| p.size).fold(0.0, f64::max)
    }
}

/// Builders for every chart on the dashboard.
pub struct ChartSeries;

impl ChartSeries {
    /// Incident count per calendar month, always twelve bins.
    pub fn monthly_histogram(enriched: &DataFrame) -> Result<BarSeries, ProcessorError> {
        DataProcessor::require_columns(enriched, &[MONTH])?;
        let months = enriched.column(MONTH)?.cast(&DataType::Int32)?;

        let mut counts = [0u32; 12];
        for month in months.i32()?.into_iter().flatten() {
            if (1..=12).contains(&month) {
                counts[(month - 1) as usize] += 1;
            }
        }

        let mut series = BarSeries::new("Monthly distribution of crimes", "Month", "Incidents");
        series.bars = counts
            .iter()
            .zip(MONTH_NAMES)
            .enumerate()
            .map(|(i, (&count, name))| BarValue {
                label: name.to_string(),
                x: (i + 1) as f64,
                value: f64::from(count),
            })
            .collect();
        Ok(series)
    }

    /// One point per incident, coloured by time of day and sized by density.
    pub fn crime_map(enriched: &DataFrame) -> Result<MapSeries, ProcessorError> {
        DataProcessor::require_columns(enriched, &[LAT, LONG, TIME_OF_DAY, CRIME_DENSITY])?;
        let lat = enriched.column(LAT)?.cast(&DataType::Float64)?;
        let long = enriched.column(LONG)?.cast(&DataType::Float64)?;
        let bucket = enriched.column(TIME_OF_DAY)?.cast(&DataType::String)?;
        let density = enriched.column(CRIME_DENSITY)?.cast(&DataType::Float64)?;

        let points = lat
            .f64()?
            .into_iter()
            .zip(long.f64()?.into_iter())
            .zip(bucket.str()?.into_iter())
            .zip(density.f64()?.into_iter())
            .filter_map(|(((lat, long), bucket), density)| {
                let time_of_day = bucket.and_then(TimeOfDay::from_label);
                let size = density.unwrap_or(0.0).max(0.0);
                Some(MapPoint {
                    lat: lat?,
                    long: long?,
                    time_of_day,
                    size,
                    label: time_of_day.map(|t| t.label().to_string()).unwrap_or_default(),
                })
            })
            .collect();

        Ok(MapSeries {
            title: "Crime map".to_string(),
            points,
        })
    }

    /// One bar per district, sorted by name, with that district's density.
    pub fn district_density(enriched: &DataFrame) -> Result<BarSeries, ProcessorError> {
        DataProcessor::require_columns(enriched, &[DISTRICT, CRIME_DENSITY])?;
        let district = enriched.column(DISTRICT)?.cast(&DataType::String)?;
        let density = enriched.column(CRIME_DENSITY)?.cast(&DataType::Float64)?;

        let mut by_district: BTreeMap<String, f64> = BTreeMap::new();
        for (district, density) in district.str()?.into_iter().zip(density.f64()?.into_iter()) {
            let name = district.unwrap_or(UNKNOWN_DISTRICT).to_string();
            by_district.entry(name).or_insert(density.unwrap_or(0.0));
        }

        let mut series = BarSeries::new("Crime density by district", "District", "Crime density");
        series.bars = by_district
            .into_iter()
            .enumerate()
            .map(|(i, (label, value))| BarValue {
                label,
                x: i as f64,
                value,
            })
            .collect();
        Ok(series)
    }

    /// Predicted incidents for each hour of the forecast day. Values are not clamped.
    pub fn hourly_forecast(forecast: &LocationForecast) -> BarSeries {
        let mut series = BarSeries::new(
            &format!(
                "Predicted crimes per hour, {:04}-{:02}-{:02}",
                forecast.year, forecast.month, forecast.day
            ),
            "Hour",
            "Predicted crimes",
        );
        series.bars = forecast
            .hours
            .iter()
            .map(|h| BarValue {
                label: format!("{:02}h", h.hour),
                x: f64::from(h.hour),
                value: h.predicted_count,
            })
            .collect();
        series
    }

    /// The 24 hourly predictions at the chosen location; size is max(prediction, 0).
    pub fn forecast_map(forecast: &LocationForecast) -> MapSeries {
        let points = forecast
            .hours
            .iter()
            .map(|h| MapPoint {
                lat: forecast.location.lat,
                long: forecast.location.long,
                time_of_day: None,
                size: h.predicted_count.max(0.0),
                label: format!("{:02}h: {:.2}", h.hour, h.predicted_count),
            })
            .collect();

        MapSeries {
            title: format!("Predicted density at {}", forecast.location),
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Location;
    use crate::forecast::HourlyForecast;
    use pretty_assertions::assert_eq;

    fn enriched() -> DataFrame {
        df!(
            MONTH => [1, 1, 3, 12],
            LAT => [42.30, 42.31, 42.32, 42.33],
            LONG => [-71.00, -71.01, -71.02, -71.03],
            DISTRICT => [Some("B2"), Some("A1"), Some("B2"), None],
            TIME_OF_DAY => ["Night", "Morning", "Evening", "Afternoon"],
            CRIME_DENSITY => [2.0, 1.0, 2.0, 1.5]
        )
        .unwrap()
    }

    #[test]
    fn test_monthly_histogram_has_twelve_bins() {
        let series = ChartSeries::monthly_histogram(&enriched()).unwrap();
        let values: Vec<f64> = series.bars.iter().map(|b| b.value).collect();
        assert_eq!(
            values,
            vec![2.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]
        );
        assert_eq!(series.bars[0].label, "Jan");
        assert_eq!(series.total(), 4.0);
    }

    #[test]
    fn test_district_density_sorted_with_unknown() {
        let series = ChartSeries::district_density(&enriched()).unwrap();
        assert_eq!(series.labels(), vec!["A1", "B2", "Unknown"]);
        let values: Vec<f64> = series.bars.iter().map(|b| b.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 1.5]);
    }

    #[test]
    fn test_crime_map_points() {
        let map = ChartSeries::crime_map(&enriched()).unwrap();
        assert_eq!(map.points.len(), 4);
        assert_eq!(map.points[0].time_of_day, Some(TimeOfDay::Night));
        assert_eq!(map.max_size(), 2.0);
    }

    #[test]
    fn test_empty_table_gives_blank_series() {
        let empty = enriched().head(Some(0));

        let histogram = ChartSeries::monthly_histogram(&empty).unwrap();
        assert_eq!(histogram.bars.len(), 12);
        assert!(histogram.is_blank());

        assert!(ChartSeries::district_density(&empty).unwrap().bars.is_empty());
        assert!(ChartSeries::crime_map(&empty).unwrap().points.is_empty());
    }

    #[test]
    fn test_forecast_series_keep_raw_values() {
        let forecast = LocationForecast {
            location: Location { lat: 42.3, long: -71.0 },
            year: 2022,
            month: 1,
            day: 1,
            hours: vec![
                HourlyForecast { hour: 0, predicted_count: -0.5 },
                HourlyForecast { hour: 1, predicted_count: 1.25 },
            ],
        };

        let bars = ChartSeries::hourly_forecast(&forecast);
        assert_eq!(bars.bars[0].value, -0.5);
        assert_eq!(bars.bars[1].label, "01h");

        let map = ChartSeries::forecast_map(&forecast);
        assert_eq!(map.points[0].size, 0.0);
        assert_eq!(map.points[1].size, 1.25);
    }
}
