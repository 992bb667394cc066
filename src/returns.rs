//! Return matrices: dates (rows) by assets (columns).
//!
//! Missing observations are stored as `NaN`; infinite values count as missing
//! too. The optimizer works on a cleaned copy (see
//! [`ReturnMatrix::drop_missing`]); risk metrics use the matrix as-is.

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};

use crate::error::{PortfolioError, Result};

/// Historical per-period returns, one row per date and one column per asset.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    values: DMatrix<f64>,
}

impl ReturnMatrix {
    /// Create a return matrix from labels and values.
    ///
    /// `values` must have `dates.len()` rows and `assets.len()` columns.
    pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, values: DMatrix<f64>) -> Result<Self> {
        if values.nrows() != dates.len() {
            return Err(PortfolioError::dimension(
                format!("{} rows", dates.len()),
                format!("{} rows", values.nrows()),
            ));
        }
        if values.ncols() != assets.len() {
            return Err(PortfolioError::dimension(
                format!("{} columns", assets.len()),
                format!("{} columns", values.ncols()),
            ));
        }
        Ok(ReturnMatrix {
            dates,
            assets,
            values,
        })
    }

    /// Create a return matrix from row-major observations.
    pub fn from_rows(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        rows: &[Vec<f64>],
    ) -> Result<Self> {
        let ncols = assets.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(PortfolioError::dimension(
                format!("{} values per row", ncols),
                format!("{} values per row", bad.len()),
            ));
        }
        let values = DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]);
        Self::new(dates, assets, values)
    }

    /// Simple returns `p_t / p_{t-1} - 1` from a price matrix.
    ///
    /// The first date has no return and is dropped, as is any row with a
    /// missing value.
    pub fn from_prices_simple(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        prices: &DMatrix<f64>,
    ) -> Result<Self> {
        Self::from_prices(dates, assets, prices, |prev, cur| cur / prev - 1.0)
    }

    /// Log returns `ln(p_t / p_{t-1})` from a price matrix.
    pub fn from_prices_log(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        prices: &DMatrix<f64>,
    ) -> Result<Self> {
        Self::from_prices(dates, assets, prices, |prev, cur| (cur / prev).ln())
    }

    fn from_prices(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        prices: &DMatrix<f64>,
        change: impl Fn(f64, f64) -> f64,
    ) -> Result<Self> {
        let prices = ReturnMatrix::new(dates, assets, prices.clone())?;
        let n = prices.nrows();
        if n < 2 {
            return Err(PortfolioError::EmptyData(format!(
                "{} price observations, need at least 2",
                n
            )));
        }

        let values = DMatrix::from_fn(n - 1, prices.ncols(), |i, j| {
            change(prices.values[(i, j)], prices.values[(i + 1, j)])
        });
        // Division by a zero price yields infinities, dropped below as missing.
        let returns = ReturnMatrix {
            dates: prices.dates[1..].to_vec(),
            assets: prices.assets,
            values,
        };
        Ok(returns.drop_missing())
    }

    /// Copy of this matrix without the rows that contain a missing value.
    pub fn drop_missing(&self) -> ReturnMatrix {
        let keep: Vec<usize> = (0..self.nrows())
            .filter(|&i| self.values.row(i).iter().all(|v| v.is_finite()))
            .collect();

        if keep.len() == self.nrows() {
            return self.clone();
        }

        let values = DMatrix::from_fn(keep.len(), self.ncols(), |i, j| self.values[(keep[i], j)]);
        ReturnMatrix {
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            assets: self.assets.clone(),
            values,
        }
    }

    /// Whether any cell is missing.
    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Number of observations.
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of assets.
    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.nrows() == 0 || self.ncols() == 0
    }

    /// Return series of asset `j`.
    pub fn column(&self, j: usize) -> DVector<f64> {
        self.values.column(j).into_owned()
    }

    /// Smallest finite single-period return.
    pub fn min_value(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .reduce(f64::min)
    }

    /// Largest finite single-period return.
    pub fn max_value(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .reduce(f64::max)
    }
}

/// Consecutive daily dates starting at `start`, for callers without a calendar.
pub fn daily_dates(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    start.iter_days().take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn assets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_checks_dimensions() {
        let values = DMatrix::zeros(2, 2);
        let err = ReturnMatrix::new(vec![day(1)], assets(&["A", "B"]), values).unwrap_err();
        assert!(matches!(err, PortfolioError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_from_rows_ragged() {
        let rows = vec![vec![0.01, 0.02], vec![0.03]];
        let err = ReturnMatrix::from_rows(vec![day(1), day(2)], assets(&["A", "B"]), &rows)
            .unwrap_err();
        assert!(matches!(err, PortfolioError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_drop_missing() {
        let rows = vec![
            vec![0.01, 0.02],
            vec![f64::NAN, 0.01],
            vec![0.03, -0.01],
        ];
        let m =
            ReturnMatrix::from_rows(daily_dates(day(1), 3), assets(&["A", "B"]), &rows).unwrap();
        assert!(m.has_missing());

        let clean = m.drop_missing();
        assert_eq!(clean.nrows(), 2);
        assert_eq!(clean.dates(), &[day(1), day(3)]);
        assert_eq!(clean.values()[(1, 0)], 0.03);
        assert!(!clean.has_missing());
    }

    #[test]
    fn test_simple_returns_from_prices() {
        let prices = DMatrix::from_row_slice(3, 2, &[100.0, 50.0, 110.0, 50.0, 99.0, 55.0]);
        let m =
            ReturnMatrix::from_prices_simple(daily_dates(day(1), 3), assets(&["A", "B"]), &prices)
                .unwrap();
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.dates()[0], day(2));
        assert!((m.values()[(0, 0)] - 0.10).abs() < 1e-12);
        assert!((m.values()[(1, 0)] + 0.10).abs() < 1e-12);
        assert!((m.values()[(1, 1)] - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_log_returns_from_prices() {
        let prices = DMatrix::from_row_slice(2, 1, &[100.0, 110.0]);
        let m = ReturnMatrix::from_prices_log(daily_dates(day(1), 2), assets(&["A"]), &prices)
            .unwrap();
        assert!((m.values()[(0, 0)] - 1.1_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_prices_need_two_rows() {
        let prices = DMatrix::from_row_slice(1, 1, &[100.0]);
        let err = ReturnMatrix::from_prices_simple(vec![day(1)], assets(&["A"]), &prices)
            .unwrap_err();
        assert!(matches!(err, PortfolioError::EmptyData(_)));
    }

    #[test]
    fn test_min_max_skip_missing() {
        let rows = vec![vec![0.01, f64::NAN], vec![-0.02, 0.05]];
        let m =
            ReturnMatrix::from_rows(daily_dates(day(1), 2), assets(&["A", "B"]), &rows).unwrap();
        assert_eq!(m.min_value(), Some(-0.02));
        assert_eq!(m.max_value(), Some(0.05));
    }
}
