//! Per-column standardization fitted on the training features.

use super::ForecastError;
use ndarray::{Array1, Array2, Axis};
use statrs::statistics::Statistics;

/// Zero mean, unit variance per column, using the population standard
/// deviation. Constant columns keep a scale of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(data: &Array2<f64>) -> Result<Self, ForecastError> {
        if data.nrows() == 0 {
            return Err(ForecastError::EmptyTrainingSet);
        }

        let mut mean = Array1::zeros(data.ncols());
        let mut scale = Array1::ones(data.ncols());

        for (j, column) in data.axis_iter(Axis(1)).enumerate() {
            let m = column.iter().mean();
            let std = column.iter().population_std_dev();
            mean[j] = m;
            if std.is_finite() && std > 10.0 * f64::EPSILON * m.abs().max(1.0) {
                scale[j] = std;
            }
        }

        Ok(Self { mean, scale })
    }

    pub fn fit_transform(data: &Array2<f64>) -> Result<(Self, Array2<f64>), ForecastError> {
        let scaler = Self::fit(data)?;
        let transformed = scaler.transform(data)?;
        Ok((scaler, transformed))
    }

    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, ForecastError> {
        self.check_width(data)?;
        Ok((data - &self.mean) / &self.scale)
    }

    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, ForecastError> {
        self.check_width(data)?;
        Ok(data * &self.scale + &self.mean)
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    fn check_width(&self, data: &Array2<f64>) -> Result<(), ForecastError> {
        if data.ncols() != self.mean.len() {
            return Err(ForecastError::FeatureMismatch {
                expected: self.mean.len(),
                actual: data.ncols(),
            });
        }
        Ok(())
    }
}
