//! Aggregator Module
//! Groups enriched incidents by district and hour into training examples.

use super::columns::*;
use super::processor::{DataProcessor, ProcessorError};
use crate::forecast::{ForecastQuery, FEATURE_COUNT};
use polars::prelude::*;

/// One (district, year, month, day, hour) combination with its mean
/// coordinates and incident count.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedGroup {
    pub district: Option<String>,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub lat: f64,
    pub long: f64,
    pub crime_count: u32,
}

impl AggregatedGroup {
    /// The feature vector this group was observed at.
    pub fn query(&self) -> ForecastQuery {
        ForecastQuery::new(self.year, self.month, self.day, self.hour)
    }

    /// Model features in fixed order: year, month, day, hour.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        self.query().features()
    }
}

pub struct Aggregator;

impl Aggregator {
    pub const GROUP_KEYS: [&'static str; 5] = [DISTRICT, YEAR, MONTH, DAY, HOUR];

    /// One row per distinct group key, in order of first appearance.
    pub fn aggregate(enriched: &DataFrame) -> Result<DataFrame, ProcessorError> {
        DataProcessor::require_columns(enriched, &Self::GROUP_KEYS)?;
        DataProcessor::require_columns(enriched, &[LAT, LONG])?;

        let keys: Vec<Expr> = Self::GROUP_KEYS.iter().map(|&key| col(key)).collect();
        let grouped = enriched
            .clone()
            .lazy()
            .group_by_stable(keys)
            .agg([
                col(LAT).mean(),
                col(LONG).mean(),
                len().cast(DataType::UInt32).alias(CRIME_COUNT),
            ])
            .collect()?;

        log::info!(
            "Aggregated {} enriched rows into {} district-hour groups",
            enriched.height(),
            grouped.height()
        );
        Ok(grouped)
    }

    /// Typed view of an aggregated table.
    pub fn groups(aggregated: &DataFrame) -> Result<Vec<AggregatedGroup>, ProcessorError> {
        DataProcessor::require_columns(aggregated, &Self::GROUP_KEYS)?;
        DataProcessor::require_columns(aggregated, &[LAT, LONG, CRIME_COUNT])?;

        let district = aggregated.column(DISTRICT)?.cast(&DataType::String)?;
        let year = aggregated.column(YEAR)?.cast(&DataType::Int32)?;
        let month = aggregated.column(MONTH)?.cast(&DataType::UInt32)?;
        let day = aggregated.column(DAY)?.cast(&DataType::UInt32)?;
        let hour = aggregated.column(HOUR)?.cast(&DataType::UInt32)?;
        let lat = aggregated.column(LAT)?.cast(&DataType::Float64)?;
        let long = aggregated.column(LONG)?.cast(&DataType::Float64)?;
        let count = aggregated.column(CRIME_COUNT)?.cast(&DataType::UInt32)?;

        let (district, year, month, day, hour) =
            (district.str()?, year.i32()?, month.u32()?, day.u32()?, hour.u32()?);
        let (lat, long, count) = (lat.f64()?, long.f64()?, count.u32()?);

        let groups = (0..aggregated.height())
            .filter_map(|i| {
                Some(AggregatedGroup {
                    district: district.get(i).map(str::to_string),
                    year: year.get(i)?,
                    month: month.get(i)?,
                    day: day.get(i)?,
                    hour: hour.get(i)?,
                    lat: lat.get(i)?,
                    long: long.get(i)?,
                    crime_count: count.get(i)?,
                })
            })
            .collect();

        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn enriched() -> DataFrame {
        df!(
            DISTRICT => ["A1", "B2", "A1", "A1", "B2"],
            YEAR => [2018, 2018, 2018, 2018, 2018],
            MONTH => [9, 9, 9, 9, 9],
            DAY => [2, 2, 2, 3, 2],
            HOUR => [13, 13, 13, 13, 13],
            LAT => [42.30, 42.10, 42.40, 42.50, 42.20],
            LONG => [-71.00, -71.10, -71.20, -71.30, -71.40]
        )
        .unwrap()
    }

    #[test]
    fn test_aggregate_groups_in_first_appearance_order() {
        let aggregated = Aggregator::aggregate(&enriched()).unwrap();
        let groups = Aggregator::groups(&aggregated).unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].district.as_deref(), Some("A1"));
        assert_eq!(groups[0].day, 2);
        assert_eq!(groups[0].crime_count, 2);
        assert!((groups[0].lat - 42.35).abs() < 1e-12);
        assert!((groups[0].long - -71.10).abs() < 1e-12);

        assert_eq!(groups[1].district.as_deref(), Some("B2"));
        assert_eq!(groups[1].crime_count, 2);
        assert_eq!(groups[2].day, 3);
        assert_eq!(groups[2].crime_count, 1);
    }

    #[test]
    fn test_counts_sum_to_row_count() {
        let aggregated = Aggregator::aggregate(&enriched()).unwrap();
        let total: u32 = Aggregator::groups(&aggregated)
            .unwrap()
            .iter()
            .map(|g| g.crime_count)
            .sum();
        assert_eq!(total as usize, enriched().height());
    }

    #[test]
    fn test_features_order() {
        let group = AggregatedGroup {
            district: Some("A1".into()),
            year: 2018,
            month: 9,
            day: 2,
            hour: 13,
            lat: 42.3,
            long: -71.0,
            crime_count: 1,
        };
        assert_eq!(group.features(), [2018.0, 9.0, 2.0, 13.0]);
        assert_eq!(group.query(), ForecastQuery::new(2018, 9, 2, 13));
        assert_eq!(group.features(), group.query().features());
    }

    #[test]
    fn test_aggregate_requires_keys() {
        let df = enriched().drop(HOUR).unwrap();
        assert!(matches!(
            Aggregator::aggregate(&df),
            Err(ProcessorError::MissingColumn(_))
        ));
    }
}
