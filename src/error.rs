//! Error types for markowitz.

use thiserror::Error;

/// Error type for portfolio operations.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// No usable observations remain after dropping rows with missing values.
    #[error("No usable return data: {0}")]
    EmptyData(String),

    /// Malformed weight vector.
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    /// A single-portfolio solve produced no feasible, bounded solution.
    #[error("Optimization failed: {0}")]
    OptimizationFailed(String),

    /// Two series or matrix dimensions that must agree do not.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    /// A scalar parameter lies outside its domain.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A holding references a ticker with no price.
    #[error("No price for ticker {0}")]
    MissingPrice(String),
}

impl PortfolioError {
    pub(crate) fn dimension(expected: impl ToString, got: impl ToString) -> Self {
        PortfolioError::DimensionMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    pub(crate) fn parameter(name: &str, reason: impl Into<String>) -> Self {
        PortfolioError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for portfolio operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;
