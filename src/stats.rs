//! Sample statistics of a return matrix.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::error::{PortfolioError, Result};
use crate::returns::ReturnMatrix;

/// Trading periods per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Mean return vector and covariance matrix of a cleaned return matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnStatistics {
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    observations: usize,
}

impl ReturnStatistics {
    /// Derive statistics after dropping rows with missing values.
    ///
    /// Fails with [`PortfolioError::EmptyData`] if no rows (or no assets) remain.
    pub fn from_returns(returns: &ReturnMatrix) -> Result<Self> {
        let clean = returns.drop_missing();
        if clean.ncols() == 0 {
            return Err(PortfolioError::EmptyData("return matrix has no assets".into()));
        }
        if clean.nrows() == 0 {
            return Err(PortfolioError::EmptyData(format!(
                "no rows left after dropping missing values ({} before)",
                returns.nrows()
            )));
        }

        let values = clean.values();
        let n = values.nrows();
        let mean = values.row_mean().transpose();

        // Sample covariance; a single observation carries no dispersion.
        let covariance = if n > 1 {
            let mut centered = values.clone();
            for (j, mut col) in centered.column_iter_mut().enumerate() {
                col.add_scalar_mut(-mean[j]);
            }
            let cov = centered.transpose() * &centered / (n - 1) as f64;
            // Symmetrize to remove rounding asymmetry.
            (&cov + cov.transpose()) * 0.5
        } else {
            DMatrix::zeros(values.ncols(), values.ncols())
        };

        Ok(ReturnStatistics {
            mean,
            covariance,
            observations: n,
        })
    }

    /// Arithmetic mean return per asset.
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Sample covariance matrix (assets x assets).
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    pub fn asset_count(&self) -> usize {
        self.mean.len()
    }

    /// Number of observations the statistics were estimated from.
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Smallest and largest mean return.
    pub fn mean_range(&self) -> (f64, f64) {
        (self.mean.min(), self.mean.max())
    }

    /// Correlation matrix implied by the covariance.
    ///
    /// Pairs involving a zero-variance asset are `NaN` off the diagonal.
    pub fn correlation(&self) -> DMatrix<f64> {
        let n = self.asset_count();
        let sd: Vec<f64> = (0..n).map(|i| self.covariance[(i, i)].max(0.0).sqrt()).collect();
        DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                1.0
            } else if sd[i] > 0.0 && sd[j] > 0.0 {
                self.covariance[(i, j)] / (sd[i] * sd[j])
            } else {
                f64::NAN
            }
        })
    }
}

/// Compound a per-period return over `periods` periods.
pub fn annualize_return(period_return: f64, periods: usize) -> f64 {
    (1.0 + period_return).powi(periods as i32) - 1.0
}

/// Scale a per-period volatility to `periods` periods.
pub fn annualize_volatility(period_volatility: f64, periods: usize) -> f64 {
    period_volatility * (periods as f64).sqrt()
}
