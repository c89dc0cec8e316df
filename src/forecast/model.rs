//! Forecaster Module
//! Trains the hourly crime-count regressor and serves predictions.
//!
//! The fitted scaler and the network live in one [`Forecaster`] value so a
//! prediction can never use features scaled with other statistics.

use super::network::{Adam, Network};
use super::scaler::StandardScaler;
use super::ForecastError;
use crate::config::TrainingConfig;
use crate::data::{AggregatedGroup, Aggregator, Location};
use ndarray::{s, Array2, Axis};
use polars::prelude::DataFrame;
use rand::seq::SliceRandom;
use rand::Rng;

/// Number of model features: year, month, day, hour.
pub const FEATURE_COUNT: usize = 4;

/// One feature vector. Values are not range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastQuery {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl ForecastQuery {
    pub fn new(year: i32, month: u32, day: u32, hour: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
        }
    }

    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.year),
            f64::from(self.month),
            f64::from(self.day),
            f64::from(self.hour),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyForecast {
    pub hour: u32,
    /// Raw regression output; may be negative or fractional.
    pub predicted_count: f64,
}

/// Predictions for every hour of one day at a chosen location.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationForecast {
    pub location: Location,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hours: Vec<HourlyForecast>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f64,
    pub val_loss: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
    pub train_rows: usize,
    pub validation_rows: usize,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// A trained forecaster: fitted scaler plus fitted network.
#[derive(Debug, Clone)]
pub struct Forecaster {
    scaler: StandardScaler,
    network: Network,
    history: TrainingHistory,
}

impl Forecaster {
    /// Train with fresh random weights.
    pub fn train(
        groups: &[AggregatedGroup],
        config: &TrainingConfig,
    ) -> Result<Self, ForecastError> {
        Self::train_with_rng(groups, config, &mut rand::thread_rng())
    }

    /// Train directly on an aggregated district-hour table.
    pub fn train_from_frame(
        aggregated: &DataFrame,
        config: &TrainingConfig,
    ) -> Result<Self, ForecastError> {
        let groups = Aggregator::groups(aggregated)?;
        Self::train(&groups, config)
    }

    pub fn train_with_rng<R: Rng>(
        groups: &[AggregatedGroup],
        config: &TrainingConfig,
        rng: &mut R,
    ) -> Result<Self, ForecastError> {
        config
            .validate()
            .map_err(|e| ForecastError::InvalidConfig(e.to_string()))?;
        if groups.is_empty() {
            return Err(ForecastError::EmptyTrainingSet);
        }

        let n = groups.len();
        let features = Array2::from_shape_vec(
            (n, FEATURE_COUNT),
            groups.iter().flat_map(|g| g.features()).collect(),
        )?;
        let labels = Array2::from_shape_vec(
            (n, 1),
            groups.iter().map(|g| f64::from(g.crime_count)).collect(),
        )?;

        let (scaler, scaled) = StandardScaler::fit_transform(&features)?;

        let mut train_rows = ((n as f64) * (1.0 - config.validation_split)).floor() as usize;
        if train_rows == 0 {
            log::warn!(
                "Only {} training groups; training on all of them without validation",
                n
            );
            train_rows = n;
        }
        let train_x = scaled.slice(s![..train_rows, ..]);
        let train_y = labels.slice(s![..train_rows, ..]);
        let validation = (train_rows < n).then(|| {
            (
                scaled.slice(s![train_rows.., ..]).to_owned(),
                labels.slice(s![train_rows.., ..]).to_owned(),
            )
        });

        let mut network = Network::regression(
            FEATURE_COUNT,
            config.hidden_units,
            config.dropout_rate,
            rng,
        );
        let mut optimizer = Adam::new(config.learning_rate);
        let mut history = TrainingHistory {
            epochs: Vec::with_capacity(config.epochs),
            train_rows,
            validation_rows: n - train_rows,
        };

        log::info!(
            "Training forecaster on {} groups ({} held out for validation), {} parameters",
            train_rows,
            n - train_rows,
            network.parameter_count()
        );

        let mut order: Vec<usize> = (0..train_rows).collect();
        for epoch in 1..=config.epochs {
            order.shuffle(rng);

            let mut loss_sum = 0.0;
            for batch in order.chunks(config.batch_size) {
                let batch_x = train_x.select(Axis(0), batch);
                let batch_y = train_y.select(Axis(0), batch);
                let loss = network.train_batch(&batch_x, &batch_y, &mut optimizer, rng);
                loss_sum += loss * batch.len() as f64;
            }
            let loss = loss_sum / train_rows as f64;
            let val_loss = validation
                .as_ref()
                .map(|(val_x, val_y)| network.evaluate(val_x, val_y));

            match val_loss {
                Some(val) => log::info!(
                    "Epoch {}/{}: loss={:.4} val_loss={:.4}",
                    epoch,
                    config.epochs,
                    loss,
                    val
                ),
                None => log::info!("Epoch {}/{}: loss={:.4}", epoch, config.epochs, loss),
            }
            history.epochs.push(EpochMetrics {
                epoch,
                loss,
                val_loss,
            });
        }

        Ok(Self {
            scaler,
            network,
            history,
        })
    }

    /// One predicted count per query, scaled with the training statistics.
    pub fn predict(&self, queries: &[ForecastQuery]) -> Result<Vec<f64>, ForecastError> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let features = Array2::from_shape_vec(
            (queries.len(), FEATURE_COUNT),
            queries.iter().flat_map(|q| q.features()).collect(),
        )?;
        let scaled = self.scaler.transform(&features)?;
        let output = self.network.predict(&scaled);

        Ok(output.column(0).to_vec())
    }

    /// Predictions for hours 0 through 23 of the given date.
    pub fn predict_day(
        &self,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<Vec<HourlyForecast>, ForecastError> {
        let queries: Vec<ForecastQuery> = (0..24)
            .map(|hour| ForecastQuery::new(year, month, day, hour))
            .collect();
        let predictions = self.predict(&queries)?;

        Ok(queries
            .iter()
            .zip(predictions)
            .map(|(query, predicted_count)| HourlyForecast {
                hour: query.hour,
                predicted_count,
            })
            .collect())
    }

    pub fn forecast_location(
        &self,
        location: Location,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<LocationForecast, ForecastError> {
        Ok(LocationForecast {
            location,
            year,
            month,
            day,
            hours: self.predict_day(year, month, day)?,
        })
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn group(day: u32, hour: u32, count: u32) -> AggregatedGroup {
        AggregatedGroup {
            district: Some("A1".into()),
            year: 2018,
            month: 9,
            day,
            hour,
            lat: 42.3,
            long: -71.0,
            crime_count: count,
        }
    }

    fn groups() -> Vec<AggregatedGroup> {
        (1..=10)
            .flat_map(|day| (0..24).map(move |hour| group(day, hour, 1 + hour % 4)))
            .collect()
    }

    #[test]
    fn test_history_follows_schedule() {
        let mut rng = StdRng::seed_from_u64(11);
        let forecaster =
            Forecaster::train_with_rng(&groups(), &TrainingConfig::default(), &mut rng).unwrap();

        let history = forecaster.history();
        assert_eq!(history.epochs.len(), 10);
        assert_eq!(history.train_rows, 192);
        assert_eq!(history.validation_rows, 48);
        assert!(history.epochs.iter().all(|e| e.val_loss.is_some()));
        assert_eq!(history.last().map(|e| e.epoch), Some(10));
    }

    #[test]
    fn test_predict_day_returns_24_hours() {
        let mut rng = StdRng::seed_from_u64(12);
        let forecaster =
            Forecaster::train_with_rng(&groups(), &TrainingConfig::default(), &mut rng).unwrap();

        let hours = forecaster.predict_day(2022, 1, 1).unwrap();
        assert_eq!(hours.len(), 24);
        assert_eq!(hours.first().map(|h| h.hour), Some(0));
        assert_eq!(hours.last().map(|h| h.hour), Some(23));
        assert!(hours.iter().all(|h| h.predicted_count.is_finite()));
    }

    #[test]
    fn test_predictions_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(13);
        let forecaster =
            Forecaster::train_with_rng(&groups(), &TrainingConfig::default(), &mut rng).unwrap();

        let queries = [ForecastQuery::new(2018, 9, 3, 4), ForecastQuery::new(2019, 2, 28, 17)];
        assert_eq!(
            forecaster.predict(&queries).unwrap(),
            forecaster.predict(&queries).unwrap()
        );
    }

    #[test]
    fn test_single_group_trains_without_validation() {
        let mut rng = StdRng::seed_from_u64(14);
        let forecaster =
            Forecaster::train_with_rng(&[group(1, 3, 2)], &TrainingConfig::default(), &mut rng)
                .unwrap();

        assert_eq!(forecaster.history().train_rows, 1);
        assert_eq!(forecaster.history().validation_rows, 0);
        assert!(forecaster.history().epochs.iter().all(|e| e.val_loss.is_none()));
        assert_eq!(forecaster.predict(&[ForecastQuery::new(2018, 9, 1, 3)]).unwrap().len(), 1);
    }

    #[test]
    fn test_zero_validation_split_trains_on_every_group() {
        let mut rng = StdRng::seed_from_u64(16);
        let config = TrainingConfig {
            validation_split: 0.0,
            ..TrainingConfig::default()
        };
        let forecaster = Forecaster::train_with_rng(&groups(), &config, &mut rng).unwrap();

        let history = forecaster.history();
        assert_eq!(history.train_rows, 240);
        assert_eq!(history.validation_rows, 0);
        assert_eq!(history.epochs.len(), 10);
        assert!(history.epochs.iter().all(|e| e.val_loss.is_none() && e.loss.is_finite()));
    }

    #[test]
    fn test_empty_training_set() {
        let err = Forecaster::train(&[], &TrainingConfig::default()).unwrap_err();
        assert!(matches!(err, ForecastError::EmptyTrainingSet));
    }

    #[test]
    fn test_invalid_config() {
        let config = TrainingConfig {
            batch_size: 0,
            ..TrainingConfig::default()
        };
        let err = Forecaster::train(&groups(), &config).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidConfig(_)));
    }

    #[test]
    fn test_forecast_location_keeps_inputs() {
        let mut rng = StdRng::seed_from_u64(15);
        let forecaster =
            Forecaster::train_with_rng(&groups(), &TrainingConfig::default(), &mut rng).unwrap();
        let location = Location { lat: 42.3, long: -71.0 };

        let forecast = forecaster.forecast_location(location, 2022, 5, 17).unwrap();
        assert_eq!(forecast.location, location);
        assert_eq!((forecast.year, forecast.month, forecast.day), (2022, 5, 17));
        assert_eq!(forecast.hours.len(), 24);
    }
}
