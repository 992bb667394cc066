//! Historical risk metrics of a weighted portfolio.
//!
//! All metrics start from the portfolio return series, the row-wise dot
//! product of the return matrix with the weights. The matrix is used as given:
//! a `NaN` cell contributes nothing to its row.

use chrono::NaiveDate;
use nalgebra::DMatrix;
use serde::Serialize;
use tracing::warn;

use crate::error::{PortfolioError, Result};
use crate::returns::ReturnMatrix;
use crate::stats::{annualize_volatility, TRADING_DAYS_PER_YEAR};

/// Tail probability used when none is given (95% VaR).
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Trailing window, in periods, for rolling volatility.
pub const DEFAULT_VOLATILITY_WINDOW: usize = 21;

/// Drawdown path of a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawdownReport {
    /// Most negative drawdown, ignoring `NaN` rows. `NaN` when every row is `NaN`.
    pub max_drawdown: f64,
    /// Row of the first occurrence of `max_drawdown`, or 0 when it is `NaN`.
    pub max_drawdown_index: usize,
    pub max_drawdown_date: NaiveDate,
    /// `(cumulative - peak) / peak` for every row; never positive. Rows after
    /// a total loss at the peak are `NaN`.
    pub drawdown_series: Vec<f64>,
}

/// Headline tail-risk figures for one allocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub alpha: f64,
    pub var: f64,
    pub cvar: f64,
    pub max_drawdown: f64,
}

/// Risk metrics over one return sample.
#[derive(Debug, Clone)]
pub struct RiskMetrics {
    returns: ReturnMatrix,
}

impl RiskMetrics {
    /// Fails with [`PortfolioError::EmptyData`] if the matrix has no rows or
    /// no assets.
    pub fn new(returns: &ReturnMatrix) -> Result<Self> {
        if returns.is_empty() {
            return Err(PortfolioError::EmptyData(format!(
                "return matrix is {}x{}",
                returns.nrows(),
                returns.ncols()
            )));
        }
        Ok(RiskMetrics {
            returns: returns.clone(),
        })
    }

    pub fn returns(&self) -> &ReturnMatrix {
        &self.returns
    }

    /// Weighted return of every row.
    pub fn portfolio_returns(&self, weights: &[f64]) -> Result<Vec<f64>> {
        if weights.len() != self.returns.ncols() {
            return Err(PortfolioError::dimension(
                format!("{} weights", self.returns.ncols()),
                format!("{} weights", weights.len()),
            ));
        }
        let values = self.returns.values();
        Ok(values
            .row_iter()
            .map(|row| {
                row.iter()
                    .zip(weights)
                    .filter(|(r, _)| !r.is_nan())
                    .map(|(r, w)| r * w)
                    .sum()
            })
            .collect())
    }

    /// Historical Value at Risk: the `alpha`-quantile of portfolio returns.
    ///
    /// Negative for a loss. Uses linear interpolation between order statistics.
    pub fn calculate_var(&self, weights: &[f64], alpha: f64) -> Result<f64> {
        check_alpha(alpha)?;
        let mut series = self.portfolio_returns(weights)?;
        series.sort_by(f64::total_cmp);
        Ok(percentile_sorted(&series, alpha))
    }

    /// Conditional VaR: mean of the returns at or below VaR.
    ///
    /// `NaN` if no observation reaches the VaR threshold.
    pub fn calculate_cvar(&self, weights: &[f64], alpha: f64) -> Result<f64> {
        check_alpha(alpha)?;
        let series = self.portfolio_returns(weights)?;
        let mut sorted = series.clone();
        sorted.sort_by(f64::total_cmp);
        let var = percentile_sorted(&sorted, alpha);

        let tail: Vec<f64> = series.into_iter().filter(|r| *r <= var).collect();
        if tail.is_empty() {
            warn!(alpha, var, "no observations at or below VaR");
            return Ok(f64::NAN);
        }
        Ok(tail.iter().sum::<f64>() / tail.len() as f64)
    }

    /// Beta against a market return series aligned row-for-row.
    ///
    /// `NaN` if the market series has fewer than two points or zero variance.
    pub fn calculate_beta(&self, weights: &[f64], market_returns: &[f64]) -> Result<f64> {
        let portfolio = self.portfolio_returns(weights)?;
        if portfolio.len() != market_returns.len() {
            return Err(PortfolioError::dimension(
                format!("{} market returns", portfolio.len()),
                format!("{} market returns", market_returns.len()),
            ));
        }

        let n = portfolio.len();
        if n < 2 {
            return Ok(f64::NAN);
        }
        let mp = mean(&portfolio);
        let mm = mean(market_returns);
        let (mut cov, mut var) = (0.0, 0.0);
        for (p, m) in portfolio.iter().zip(market_returns) {
            cov += (p - mp) * (m - mm);
            var += (m - mm) * (m - mm);
        }
        if var == 0.0 {
            return Ok(f64::NAN);
        }
        // Both sample moments share the n - 1 denominator.
        Ok(cov / var)
    }

    /// Drawdown of the compounded portfolio value from its running peak.
    pub fn calculate_drawdown(&self, weights: &[f64]) -> Result<DrawdownReport> {
        let series = self.portfolio_returns(weights)?;

        let mut cumulative = 1.0;
        let mut peak = f64::NEG_INFINITY;
        let drawdown_series: Vec<f64> = series
            .iter()
            .map(|r| {
                cumulative *= 1.0 + r;
                peak = peak.max(cumulative);
                (cumulative - peak) / peak
            })
            .collect();

        // NaN entries (a wiped-out peak) are skipped; an all-NaN series has no minimum.
        let (max_drawdown_index, max_drawdown) = drawdown_series
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, d)| !d.is_nan())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, f64::NAN));

        Ok(DrawdownReport {
            max_drawdown,
            max_drawdown_index,
            max_drawdown_date: self.returns.dates()[max_drawdown_index],
            drawdown_series,
        })
    }

    /// Annualized rolling standard deviation of portfolio returns.
    ///
    /// Entry `i` covers rows `i + 1 - window ..= i`; the first `window - 1`
    /// entries are `None`.
    pub fn calculate_rolling_volatility(
        &self,
        weights: &[f64],
        window: usize,
    ) -> Result<Vec<Option<f64>>> {
        if window < 2 {
            return Err(PortfolioError::parameter(
                "window",
                format!("must be at least 2, got {}", window),
            ));
        }
        let series = self.portfolio_returns(weights)?;

        Ok((0..series.len())
            .map(|i| {
                if i + 1 < window {
                    return None;
                }
                let slice = &series[i + 1 - window..=i];
                let m = mean(slice);
                let var =
                    slice.iter().map(|r| (r - m) * (r - m)).sum::<f64>() / (window - 1) as f64;
                Some(annualize_volatility(var.sqrt(), TRADING_DAYS_PER_YEAR))
            })
            .collect())
    }

    /// Pairwise Pearson correlation of the asset columns.
    ///
    /// Each pair uses the rows where both assets are present. The diagonal is
    /// 1; pairs without two observations or with a constant column are `NaN`.
    pub fn calculate_correlation_matrix(&self) -> DMatrix<f64> {
        let values = self.returns.values();
        let n = values.ncols();
        let mut corr = DMatrix::identity(n, n);

        for i in 0..n {
            for j in (i + 1)..n {
                let pairs: Vec<(f64, f64)> = values
                    .column(i)
                    .iter()
                    .zip(values.column(j).iter())
                    .filter(|(a, b)| !a.is_nan() && !b.is_nan())
                    .map(|(a, b)| (*a, *b))
                    .collect();
                let c = pearson(&pairs);
                corr[(i, j)] = c;
                corr[(j, i)] = c;
            }
        }
        corr
    }

    /// VaR, CVaR and maximum drawdown together.
    pub fn summary(&self, weights: &[f64], alpha: f64) -> Result<RiskSummary> {
        Ok(RiskSummary {
            alpha,
            var: self.calculate_var(weights, alpha)?,
            cvar: self.calculate_cvar(weights, alpha)?,
            max_drawdown: self.calculate_drawdown(weights)?.max_drawdown,
        })
    }
}

fn check_alpha(alpha: f64) -> Result<()> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(PortfolioError::parameter(
            "alpha",
            format!("must lie in [0, 1], got {}", alpha),
        ))
    }
}

/// Quantile `q` of ascending `sorted`, interpolating linearly between ranks.
fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * q;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = h - lo as f64;
            sorted[lo] + frac * (sorted[hi] - sorted[lo])
        }
    }
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn pearson(pairs: &[(f64, f64)]) -> f64 {
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let ma = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mb = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0);
    for (a, b) in pairs {
        sab += (a - ma) * (b - mb);
        saa += (a - ma) * (a - ma);
        sbb += (b - mb) * (b - mb);
    }
    if saa == 0.0 || sbb == 0.0 {
        return f64::NAN;
    }
    (sab / (saa.sqrt() * sbb.sqrt())).clamp(-1.0, 1.0)
}
