//! Forecaster tests on aggregated groups produced by the real pipeline.

use crime_dashboard::config::{DataSourceConfig, TrainingConfig};
use crime_dashboard::data::{
    location_options, prepare_training_groups, AggregatedGroup, Aggregator, Location,
};
use crime_dashboard::forecast::{ForecastQuery, Forecaster, StandardScaler, FEATURE_COUNT};
use ndarray::Array2;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt::Write as _;
use std::fs;
use tempfile::TempDir;

/// Three districts over two weeks, with more incidents in the evening.
fn training_groups() -> (TempDir, Vec<AggregatedGroup>, Vec<Location>) {
    let mut csv = String::from("OFFENSE_CODE,DISTRICT,OCCURRED_ON_DATE,Lat,Long\n");
    let districts = [("A1", 42.357, -71.058), ("B2", 42.322, -71.084), ("D4", 42.342, -71.075)];
    for day in 1..=14 {
        for hour in [2, 9, 14, 19, 21] {
            for (i, (district, lat, long)) in districts.iter().enumerate() {
                let repeats = (if hour >= 18 { 3 } else { 1 }) + i % 2;
                for r in 0..repeats {
                    writeln!(
                        csv,
                        "613,{},2019-06-{:02} {:02}:{:02}:00,{:.4},{:.4}",
                        district,
                        day,
                        hour,
                        r * 7,
                        lat + r as f64 * 0.001,
                        long
                    )
                    .unwrap();
                }
            }
        }
    }

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("crime.csv"), csv).unwrap();
    fs::write(dir.path().join("offense_codes.csv"), "CODE,NAME\n613,LARCENY\n").unwrap();

    let aggregated = prepare_training_groups(&DataSourceConfig::in_dir(dir.path())).unwrap();
    let groups = Aggregator::groups(&aggregated).unwrap();
    let locations = location_options(&aggregated).unwrap();
    (dir, groups, locations)
}

#[test]
fn trains_on_pipeline_output() {
    let (_dir, groups, locations) = training_groups();
    assert_eq!(groups.len(), 14 * 5 * 3);

    let mut rng = StdRng::seed_from_u64(7);
    let forecaster =
        Forecaster::train_with_rng(&groups, &TrainingConfig::default(), &mut rng).unwrap();

    let history = forecaster.history();
    assert_eq!(history.epochs.len(), 10);
    assert_eq!(history.train_rows, 168);
    assert_eq!(history.validation_rows, 42);
    assert!(history.epochs.iter().all(|e| e.loss.is_finite()));

    let forecast = forecaster
        .forecast_location(locations[0], 2022, 1, 1)
        .unwrap();
    assert_eq!(forecast.hours.len(), 24);
    let hours: Vec<u32> = forecast.hours.iter().map(|h| h.hour).collect();
    assert_eq!(hours, (0..24).collect::<Vec<u32>>());
}

#[test]
fn same_seed_same_model() {
    let (_dir, groups, _) = training_groups();
    let config = TrainingConfig::default();

    let a = Forecaster::train_with_rng(&groups, &config, &mut StdRng::seed_from_u64(3)).unwrap();
    let b = Forecaster::train_with_rng(&groups, &config, &mut StdRng::seed_from_u64(3)).unwrap();

    let queries: Vec<ForecastQuery> = (0..24).map(|h| ForecastQuery::new(2019, 6, 20, h)).collect();
    assert_eq!(a.predict(&queries).unwrap(), b.predict(&queries).unwrap());
    assert_eq!(a.predict(&[]).unwrap(), Vec::<f64>::new());
}

#[test]
fn scaler_is_fitted_on_training_features() {
    let (_dir, groups, _) = training_groups();
    let mut rng = StdRng::seed_from_u64(5);
    let forecaster =
        Forecaster::train_with_rng(&groups, &TrainingConfig::default(), &mut rng).unwrap();

    let features = Array2::from_shape_vec(
        (groups.len(), FEATURE_COUNT),
        groups.iter().flat_map(|g| g.features()).collect(),
    )
    .unwrap();
    let refit = StandardScaler::fit(&features).unwrap();
    assert_eq!(forecaster.scaler(), &refit);

    let restored = refit
        .inverse_transform(&refit.transform(&features).unwrap())
        .unwrap();
    for (a, b) in restored.iter().zip(features.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
}
