//! # markowitz
//!
//! Long-only mean-variance portfolio optimization and historical risk metrics.
//!
//! Given a matrix of per-period asset returns, markowitz estimates mean returns
//! and covariances, solves the Markowitz quadratic program with the Clarabel
//! interior-point solver, and traces the efficient frontier.
//!
//! ## Quick Start
//!
//! ```ignore
//! use markowitz::prelude::*;
//!
//! let returns = ReturnMatrix::from_rows(dates, assets, &rows)?;
//! let optimizer = PortfolioOptimizer::new(&returns)?;
//!
//! let min_var = optimizer.min_variance()?;
//! let frontier = optimizer.efficient_frontier(&optimizer.default_targets(20));
//!
//! let risk = RiskMetrics::new(&returns)?;
//! let var = risk.calculate_var(&min_var.weights, DEFAULT_ALPHA)?;
//! ```
//!
//! ## Problems
//!
//! Every allocation solves
//!
//! ```text
//! minimize    w' Σ w
//! subject to  sum(w) == 1,  w >= 0,  [μ' w >= target]
//! ```
//!
//! - **Equal weight**: `w_i = 1/N`, no solve
//! - **Minimum variance**: no return constraint
//! - **Maximum Sharpe**: homogenized program with `(μ - r_f)' y == 1`
//! - **Efficient frontier**: one program per target; infeasible targets are
//!   skipped, never fatal
//!
//! ## Architecture
//!
//! - **Statistics** from the cleaned return matrix, computed once per optimizer
//! - **Matrix stuffing** into Clarabel's `(P, q, A, b, K)` conic form
//! - **Clarabel solver** for the quadratic programs
//! - **Risk metrics** (VaR, CVaR, beta, drawdown, rolling volatility,
//!   correlation) on the raw return matrix

pub mod error;
pub mod holdings;
pub mod optimizer;
pub mod returns;
pub mod risk;
pub mod solver;
pub mod sparse;
pub mod stats;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use markowitz::prelude::*;
/// ```
pub mod prelude {
    // Data
    pub use crate::returns::{daily_dates, ReturnMatrix};
    pub use crate::stats::{
        annualize_return, annualize_volatility, ReturnStatistics, TRADING_DAYS_PER_YEAR,
    };

    // Optimization
    pub use crate::optimizer::{
        FrontierReport, PortfolioOptimizer, PortfolioPerformance, SkipReason, SkippedTarget,
        WEIGHT_SUM_TOLERANCE,
    };

    // Risk
    pub use crate::risk::{
        DrawdownReport, RiskMetrics, RiskSummary, DEFAULT_ALPHA, DEFAULT_VOLATILITY_WINDOW,
    };
    pub use crate::holdings::{weights_from_holdings, HoldingsValuation};

    // Solver
    pub use crate::solver::{Settings, SolveStatus};

    // Errors
    pub use crate::error::{PortfolioError, Result};
}

// Re-export main types at crate root
pub use error::{PortfolioError, Result};
pub use optimizer::{PortfolioOptimizer, PortfolioPerformance};
pub use returns::ReturnMatrix;
pub use risk::RiskMetrics;
