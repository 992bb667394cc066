//! Risk metric properties over generated return paths.

use std::collections::HashMap;

use approx::assert_relative_eq;
use chrono::NaiveDate;
use markowitz::prelude::*;

/// Deterministic pseudo-returns: a few interleaved cycles per asset.
fn synthetic_returns(periods: usize, assets: usize) -> ReturnMatrix {
    let rows: Vec<Vec<f64>> = (0..periods)
        .map(|t| {
            (0..assets)
                .map(|j| {
                    let phase = (t * (j + 2)) as f64 * 0.7 + j as f64;
                    0.0004 * (j as f64 + 1.0) + 0.012 * phase.sin() + 0.004 * (phase * 0.37).cos()
                })
                .collect()
        })
        .collect();
    let names = (0..assets).map(|j| format!("S{}", j)).collect();
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    ReturnMatrix::from_rows(daily_dates(start, periods), names, &rows).unwrap()
}

fn weight_sets(n: usize) -> Vec<Vec<f64>> {
    let mut sets = vec![vec![1.0 / n as f64; n]];
    for i in 0..n {
        let mut w = vec![0.0; n];
        w[i] = 1.0;
        sets.push(w);
    }
    sets
}

#[test]
fn test_cvar_never_above_var() {
    let returns = synthetic_returns(250, 4);
    let risk = RiskMetrics::new(&returns).unwrap();
    for weights in weight_sets(4) {
        for alpha in [0.01, 0.05, 0.10, 0.25] {
            let var = risk.calculate_var(&weights, alpha).unwrap();
            let cvar = risk.calculate_cvar(&weights, alpha).unwrap();
            assert!(cvar <= var, "CVaR {} above VaR {} at alpha {}", cvar, var, alpha);
        }
    }
}

#[test]
fn test_var_is_quantile_of_portfolio_returns() {
    let returns = synthetic_returns(101, 3);
    let risk = RiskMetrics::new(&returns).unwrap();
    let weights = [0.2, 0.3, 0.5];

    let mut series = risk.portfolio_returns(&weights).unwrap();
    series.sort_by(f64::total_cmp);
    // 101 points: the 5% quantile sits exactly on the sixth order statistic
    let var = risk.calculate_var(&weights, DEFAULT_ALPHA).unwrap();
    assert_relative_eq!(var, series[5], max_relative = 1e-12);

    let below = series.iter().filter(|r| **r <= var).count();
    assert_eq!(below, 6);
}

#[test]
fn test_drawdown_properties() {
    let returns = synthetic_returns(300, 3);
    let risk = RiskMetrics::new(&returns).unwrap();
    for weights in weight_sets(3) {
        let dd = risk.calculate_drawdown(&weights).unwrap();
        assert_eq!(dd.drawdown_series.len(), 300);
        assert!(dd.drawdown_series.iter().all(|d| *d <= 0.0));

        let min = dd.drawdown_series.iter().copied().fold(f64::INFINITY, f64::min);
        assert_eq!(dd.max_drawdown, min);
        assert_eq!(dd.drawdown_series[dd.max_drawdown_index], min);
        assert_eq!(dd.max_drawdown_date, returns.dates()[dd.max_drawdown_index]);
    }
}

#[test]
fn test_correlation_matrix_properties() {
    let returns = synthetic_returns(120, 5);
    let corr = RiskMetrics::new(&returns).unwrap().calculate_correlation_matrix();
    assert_eq!(corr.nrows(), 5);
    for i in 0..5 {
        assert_eq!(corr[(i, i)], 1.0);
        for j in 0..5 {
            assert_eq!(corr[(i, j)], corr[(j, i)]);
            assert!(corr[(i, j)].abs() <= 1.0);
        }
    }

    // Agrees with the correlation implied by the sample covariance.
    let stats = ReturnStatistics::from_returns(&returns).unwrap().correlation();
    for i in 0..5 {
        for j in 0..5 {
            assert_relative_eq!(corr[(i, j)], stats[(i, j)], epsilon = 1e-10);
        }
    }
}

#[test]
fn test_rolling_volatility_window() {
    let returns = synthetic_returns(60, 2);
    let risk = RiskMetrics::new(&returns).unwrap();
    let vol = risk
        .calculate_rolling_volatility(&[0.5, 0.5], DEFAULT_VOLATILITY_WINDOW)
        .unwrap();
    assert_eq!(vol.len(), 60);
    assert!(vol[..DEFAULT_VOLATILITY_WINDOW - 1].iter().all(Option::is_none));
    assert!(vol[DEFAULT_VOLATILITY_WINDOW - 1..]
        .iter()
        .all(|v| matches!(v, Some(x) if *x >= 0.0)));

    // The last full window equals an annualized sample std of its rows.
    let series = risk.portfolio_returns(&[0.5, 0.5]).unwrap();
    let window = &series[60 - DEFAULT_VOLATILITY_WINDOW..];
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let var = window.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (window.len() - 1) as f64;
    let expected = annualize_volatility(var.sqrt(), TRADING_DAYS_PER_YEAR);
    assert_relative_eq!(vol[59].unwrap(), expected, max_relative = 1e-12);
}

#[test]
fn test_beta_of_asset_against_itself() {
    let returns = synthetic_returns(80, 3);
    let risk = RiskMetrics::new(&returns).unwrap();
    let market: Vec<f64> = returns.column(1).iter().copied().collect();
    let beta = risk.calculate_beta(&[0.0, 1.0, 0.0], &market).unwrap();
    assert_relative_eq!(beta, 1.0, epsilon = 1e-12);

    let err = risk.calculate_beta(&[0.0, 1.0, 0.0], &market[1..]).unwrap_err();
    assert!(matches!(err, PortfolioError::DimensionMismatch { .. }));
}

#[test]
fn test_risk_of_optimized_portfolio() {
    let returns = synthetic_returns(200, 4);
    let optimizer = PortfolioOptimizer::new(&returns).unwrap();
    let risk = RiskMetrics::new(&returns).unwrap();

    let min_var = optimizer.min_variance().unwrap();
    let summary = risk.summary(&min_var.weights, DEFAULT_ALPHA).unwrap();
    assert!(summary.cvar <= summary.var);
    assert!(summary.max_drawdown <= 0.0);
    assert_eq!(summary.alpha, DEFAULT_ALPHA);
}

#[test]
fn test_holdings_weights_feed_risk_metrics() {
    let returns = synthetic_returns(50, 2);
    let risk = RiskMetrics::new(&returns).unwrap();

    let holdings = vec![("S0".to_string(), 10.0), ("S1".to_string(), 30.0)];
    let prices: HashMap<String, f64> = [("S0".to_string(), 30.0), ("S1".to_string(), 10.0)]
        .into_iter()
        .collect();
    let valuation = weights_from_holdings(&holdings, &prices).unwrap();
    assert_eq!(valuation.weights, vec![0.5, 0.5]);

    let from_holdings = risk.calculate_var(&valuation.weights, DEFAULT_ALPHA).unwrap();
    let equal = risk.calculate_var(&[0.5, 0.5], DEFAULT_ALPHA).unwrap();
    assert_eq!(from_holdings, equal);
}
