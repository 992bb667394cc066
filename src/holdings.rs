//! Weights implied by share holdings at current prices.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{PortfolioError, Result};

/// Market value and weights of a set of holdings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingsValuation {
    /// `shares_i * price_i / total_value`, in holdings order.
    pub weights: Vec<f64>,
    pub total_value: f64,
}

/// Value `holdings` (ticker, share count) at `prices`.
///
/// A zero total value yields all-zero weights rather than an error; a ticker
/// without a price fails with [`PortfolioError::MissingPrice`].
pub fn weights_from_holdings(
    holdings: &[(String, f64)],
    prices: &HashMap<String, f64>,
) -> Result<HoldingsValuation> {
    let values = holdings
        .iter()
        .map(|(ticker, shares)| {
            prices
                .get(ticker)
                .map(|price| shares * price)
                .ok_or_else(|| PortfolioError::MissingPrice(ticker.clone()))
        })
        .collect::<Result<Vec<f64>>>()?;

    let total_value: f64 = values.iter().sum();
    let weights = if total_value == 0.0 {
        vec![0.0; values.len()]
    } else {
        values.iter().map(|v| v / total_value).collect()
    };

    Ok(HoldingsValuation {
        weights,
        total_value,
    })
}
