//! Long-only mean-variance portfolio optimization.
//!
//! Every solve is a convex quadratic program over the weight vector `w`:
//!
//! ```text
//! minimize    w' Σ w
//! subject to  sum(w) == 1
//!             w >= 0
//!             μ' w >= target      (efficient frontier only)
//! ```
//!
//! The maximum-Sharpe portfolio uses the homogenized form of the same program
//! (see [`PortfolioOptimizer::max_sharpe_ratio`]).

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{PortfolioError, Result};
use crate::returns::ReturnMatrix;
use crate::solver::{solve, QuadraticProgram, Settings, Solution, SolveStatus};
use crate::stats::ReturnStatistics;

/// Allowed distance of a weight vector's sum from 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Volatility, relative to the most volatile asset, treated as riskless.
const RISKLESS_VOLATILITY: f64 = 1e-5;

/// Expected return and volatility of one allocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioPerformance {
    /// Per-period expected return `μ' w`.
    pub expected_return: f64,
    /// Per-period standard deviation `sqrt(w' Σ w)`.
    pub volatility: f64,
    pub weights: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpe_ratio: Option<f64>,
}

impl PortfolioPerformance {
    /// Attach the Sharpe ratio for `risk_free_rate`. Left empty for a
    /// zero-volatility portfolio.
    pub fn with_sharpe(mut self, risk_free_rate: f64) -> Self {
        self.sharpe_ratio = if self.volatility > 0.0 {
            Some((self.expected_return - risk_free_rate) / self.volatility)
        } else {
            None
        };
        self
    }
}

/// Why a frontier target produced no portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SkipReason {
    /// The solver did not return a solution.
    Solver(SolveStatus),
    /// The solver's weights failed validation, or the target was unusable.
    Rejected(String),
}

/// A frontier target that produced no portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTarget {
    /// Position in the requested targets.
    pub index: usize,
    pub requested: f64,
    /// Target after clipping into the mean-return range.
    pub clipped: f64,
    pub reason: SkipReason,
}

/// Efficient frontier together with the targets that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrontierReport {
    /// Accepted portfolios in target order.
    pub portfolios: Vec<PortfolioPerformance>,
    pub skipped: Vec<SkippedTarget>,
}

/// Mean-variance optimizer over one cleaned return sample.
///
/// Statistics are computed once at construction and never change.
#[derive(Debug, Clone)]
pub struct PortfolioOptimizer {
    returns: ReturnMatrix,
    stats: ReturnStatistics,
    settings: Settings,
}

impl PortfolioOptimizer {
    /// Build an optimizer with default solver settings.
    ///
    /// Rows with missing values are dropped; fails with
    /// [`PortfolioError::EmptyData`] if none remain.
    pub fn new(returns: &ReturnMatrix) -> Result<Self> {
        Self::with_settings(returns, Settings::default())
    }

    /// Build an optimizer with custom solver settings.
    pub fn with_settings(returns: &ReturnMatrix, settings: Settings) -> Result<Self> {
        let returns = returns.drop_missing();
        let stats = ReturnStatistics::from_returns(&returns)?;
        debug!(
            assets = stats.asset_count(),
            observations = stats.observations(),
            "portfolio optimizer ready"
        );
        Ok(PortfolioOptimizer {
            returns,
            stats,
            settings,
        })
    }

    pub fn statistics(&self) -> &ReturnStatistics {
        &self.stats
    }

    /// The cleaned return matrix.
    pub fn returns(&self) -> &ReturnMatrix {
        &self.returns
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn asset_count(&self) -> usize {
        self.stats.asset_count()
    }

    /// Expected return and volatility of `weights`.
    ///
    /// Fails with [`PortfolioError::InvalidWeights`] if the vector is empty,
    /// has the wrong length, contains NaN, or does not sum to 1 within
    /// [`WEIGHT_SUM_TOLERANCE`].
    pub fn calculate_portfolio_performance(&self, weights: &[f64]) -> Result<(f64, f64)> {
        self.validate_weights(weights)?;
        Ok(self.evaluate(weights))
    }

    /// Like [`calculate_portfolio_performance`](Self::calculate_portfolio_performance),
    /// returning the full record.
    pub fn portfolio_performance(&self, weights: &[f64]) -> Result<PortfolioPerformance> {
        let (expected_return, volatility) = self.calculate_portfolio_performance(weights)?;
        Ok(PortfolioPerformance {
            expected_return,
            volatility,
            weights: weights.to_vec(),
            sharpe_ratio: None,
        })
    }

    /// Portfolio with weight `1/N` on each of the `N` assets.
    pub fn equal_weight_portfolio(&self) -> PortfolioPerformance {
        let n = self.asset_count();
        let weights = vec![1.0 / n as f64; n];
        let (expected_return, volatility) = self.evaluate(&weights);
        PortfolioPerformance {
            expected_return,
            volatility,
            weights,
            sharpe_ratio: None,
        }
    }

    /// Global minimum-variance long-only portfolio.
    pub fn min_variance(&self) -> Result<PortfolioPerformance> {
        let qp = self.long_only_program()?;
        let solution = self.run(&qp)?;
        let x = solved_primal(solution, "minimum variance")?;
        let weights = clean_weights(&x[..self.asset_count()]);
        self.portfolio_performance(&weights)
    }

    /// Long-only portfolio with the highest Sharpe ratio.
    ///
    /// Solved through the substitution `y = κ w`, `κ > 0`:
    ///
    /// ```text
    /// minimize    y' Σ y
    /// subject to  (μ - r_f)' y == 1
    ///             sum(y) == κ
    ///             y >= 0, κ >= 0
    /// ```
    ///
    /// which is convex and recovers `w = y / κ`. Fails with
    /// [`PortfolioError::OptimizationFailed`] when no asset's mean return
    /// exceeds `risk_free_rate`, when the solver finds no bounded solution, or
    /// when a long-only mix is riskless with a positive excess return (the
    /// ratio is then unbounded).
    pub fn max_sharpe_ratio(&self, risk_free_rate: f64) -> Result<PortfolioPerformance> {
        if !risk_free_rate.is_finite() {
            return Err(PortfolioError::parameter(
                "risk_free_rate",
                format!("must be finite, got {}", risk_free_rate),
            ));
        }

        let n = self.asset_count();
        let excess: Vec<f64> = self.stats.mean().iter().map(|m| m - risk_free_rate).collect();
        if excess.iter().all(|e| *e <= 0.0) {
            return Err(PortfolioError::OptimizationFailed(format!(
                "no asset has a mean return above the risk-free rate {}",
                risk_free_rate
            )));
        }

        let mut budget = vec![1.0; n + 1];
        budget[n] = -1.0;
        let qp = QuadraticProgram::new(n + 1)
            .minimize_quadratic(&self.scaled_covariance())?
            .equal(&excess, 1.0)?
            .equal(&budget, 0.0)?
            .nonnegative();

        let solution = self.run(&qp)?;
        let x = solved_primal(solution, "maximum Sharpe ratio")?;

        let kappa = x[n];
        if !(kappa > f64::EPSILON) {
            return Err(PortfolioError::OptimizationFailed(format!(
                "maximum Sharpe ratio: degenerate scaling {}",
                kappa
            )));
        }
        let scaled: Vec<f64> = x[..n].iter().map(|y| y / kappa).collect();
        let weights = clean_weights(&scaled);

        let performance = self.portfolio_performance(&weights)?;
        let largest_volatility = self.stats.covariance().diagonal().max().max(0.0).sqrt();
        let riskless = largest_volatility * RISKLESS_VOLATILITY;
        if performance.volatility <= riskless && performance.expected_return > risk_free_rate {
            return Err(PortfolioError::OptimizationFailed(format!(
                "maximum Sharpe ratio: unbounded, a riskless portfolio earns {} over {}",
                performance.expected_return,
                risk_free_rate
            )));
        }
        Ok(performance.with_sharpe(risk_free_rate))
    }

    /// Efficient frontier for `target_returns`, in input order.
    ///
    /// Targets are clipped into `[min μ, max μ]`. A target the solver cannot
    /// satisfy is skipped and logged, so the result may be shorter than the
    /// input or empty. Use [`efficient_frontier_report`](Self::efficient_frontier_report)
    /// to learn which targets were dropped.
    pub fn efficient_frontier(&self, target_returns: &[f64]) -> Vec<PortfolioPerformance> {
        self.efficient_frontier_report(target_returns).portfolios
    }

    /// Efficient frontier plus the skipped targets.
    pub fn efficient_frontier_report(&self, target_returns: &[f64]) -> FrontierReport {
        let (lo, hi) = self.stats.mean_range();
        let clipped: Vec<f64> = target_returns.iter().map(|t| t.clamp(lo, hi)).collect();

        #[cfg(feature = "parallel")]
        let outcomes: Vec<_> = clipped
            .par_iter()
            .map(|&t| self.frontier_point(t))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<_> = clipped.iter().map(|&t| self.frontier_point(t)).collect();

        let mut report = FrontierReport::default();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(portfolio) => report.portfolios.push(portfolio),
                Err(reason) => {
                    let target_return = clipped[index];
                    match &reason {
                        SkipReason::Solver(SolveStatus::Infeasible | SolveStatus::Unbounded) => {
                            debug!(index, target_return, ?reason, "skipping frontier target")
                        }
                        _ => warn!(index, target_return, ?reason, "skipping frontier target"),
                    }
                    report.skipped.push(SkippedTarget {
                        index,
                        requested: target_returns[index],
                        clipped: clipped[index],
                        reason,
                    });
                }
            }
        }

        debug!(
            requested = target_returns.len(),
            accepted = report.portfolios.len(),
            "efficient frontier built"
        );
        report
    }

    /// `points` evenly spaced targets from the smallest to the largest
    /// single-period return in the sample.
    pub fn default_targets(&self, points: usize) -> Vec<f64> {
        match (self.returns.min_value(), self.returns.max_value()) {
            (Some(lo), Some(hi)) => linspace(lo, hi, points),
            _ => Vec::new(),
        }
    }

    /// Solve one frontier sub-problem.
    fn frontier_point(&self, target: f64) -> std::result::Result<PortfolioPerformance, SkipReason> {
        if target.is_nan() {
            return Err(SkipReason::Rejected("target return is NaN".into()));
        }

        let mean: Vec<f64> = self.stats.mean().iter().copied().collect();
        let qp = self
            .long_only_program()
            .and_then(|qp| qp.greater_equal(&mean, target))
            .map_err(|e| SkipReason::Rejected(e.to_string()))?;

        let solution = self.run(&qp).map_err(|e| SkipReason::Rejected(e.to_string()))?;
        let x = match solution.x {
            Some(x) if solution.status.is_solved() => x,
            _ => return Err(SkipReason::Solver(solution.status)),
        };

        let weights = clean_weights(&x);
        self.portfolio_performance(&weights)
            .map_err(|e| SkipReason::Rejected(e.to_string()))
    }

    /// `min w' Σ w` subject to `sum(w) == 1`, `w >= 0`.
    fn long_only_program(&self) -> Result<QuadraticProgram> {
        let n = self.asset_count();
        Ok(QuadraticProgram::new(n)
            .minimize_quadratic(&self.scaled_covariance())?
            .equal(&vec![1.0; n], 1.0)?
            .nonnegative())
    }

    /// Covariance divided by its largest variance.
    ///
    /// Daily return variances are around 1e-4, small enough that the solver's
    /// absolute gap tolerance would bound the weights only loosely. Positive
    /// scaling leaves the minimizer unchanged.
    fn scaled_covariance(&self) -> DMatrix<f64> {
        let cov = self.stats.covariance();
        let scale = cov.diagonal().max();
        if scale > 0.0 {
            cov / scale
        } else {
            cov.clone()
        }
    }

    fn run(&self, qp: &QuadraticProgram) -> Result<Solution> {
        solve(&qp.stuff(), &self.settings)
    }

    fn validate_weights(&self, weights: &[f64]) -> Result<()> {
        if weights.is_empty() {
            return Err(PortfolioError::InvalidWeights("weight vector is empty".into()));
        }
        if weights.len() != self.asset_count() {
            return Err(PortfolioError::InvalidWeights(format!(
                "expected {} weights, got {}",
                self.asset_count(),
                weights.len()
            )));
        }
        if weights.iter().any(|w| w.is_nan()) {
            return Err(PortfolioError::InvalidWeights("weights contain NaN".into()));
        }
        let total: f64 = weights.iter().sum();
        if !((total - 1.0).abs() <= WEIGHT_SUM_TOLERANCE) {
            return Err(PortfolioError::InvalidWeights(format!(
                "weights must sum to 1 (got {})",
                total
            )));
        }
        Ok(())
    }

    /// `(μ' w, sqrt(w' Σ w))` without validation.
    fn evaluate(&self, weights: &[f64]) -> (f64, f64) {
        let w = DVector::from_column_slice(weights);
        let expected_return = self.stats.mean().dot(&w);
        let variance = w.dot(&(self.stats.covariance() * &w));
        // Rounding can push a PSD quadratic form slightly below zero.
        (expected_return, variance.max(0.0).sqrt())
    }
}

fn solved_primal(solution: Solution, problem: &str) -> Result<Vec<f64>> {
    match solution.x {
        Some(x) if solution.status.is_solved() => Ok(x),
        _ => Err(PortfolioError::OptimizationFailed(format!(
            "{}: solver status {:?} after {} iterations",
            problem, solution.status, solution.iterations
        ))),
    }
}

/// Clip interior-point noise below zero and rescale to sum to one.
fn clean_weights(raw: &[f64]) -> Vec<f64> {
    let clipped: Vec<f64> = raw.iter().map(|w| w.max(0.0)).collect();
    let total: f64 = clipped.iter().sum();
    if total > 0.0 {
        clipped.iter().map(|w| w / total).collect()
    } else {
        clipped
    }
}

fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (points - 1) as f64;
            (0..points)
                .map(|i| if i == points - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}
