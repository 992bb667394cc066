//! Risk Report Example
//!
//! Values a set of holdings, then reports VaR, CVaR, drawdown, rolling
//! volatility and correlations for the resulting weights.

use std::collections::HashMap;

use chrono::NaiveDate;
use markowitz::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Risk Report ===\n");

    let assets: Vec<String> = ["AAA", "BBB", "CCC"].iter().map(|s| s.to_string()).collect();
    let rows: Vec<Vec<f64>> = (0..60)
        .map(|t| {
            let x = t as f64;
            vec![
                0.001 + 0.012 * (x * 0.9).sin(),
                0.0005 + 0.008 * (x * 1.3 + 1.0).sin(),
                0.0002 + 0.004 * (x * 0.4 + 2.0).cos(),
            ]
        })
        .collect();
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
    let returns = ReturnMatrix::from_rows(daily_dates(start, rows.len()), assets.clone(), &rows)?;

    let holdings: Vec<(String, f64)> = vec![
        ("AAA".into(), 120.0),
        ("BBB".into(), 300.0),
        ("CCC".into(), 50.0),
    ];
    let prices: HashMap<String, f64> = [("AAA", 52.0), ("BBB", 18.5), ("CCC", 140.0)]
        .iter()
        .map(|(t, p)| (t.to_string(), *p))
        .collect();
    let valuation = weights_from_holdings(&holdings, &prices)?;
    println!("Total portfolio value: {:.2}", valuation.total_value);

    let risk = RiskMetrics::new(&returns)?;
    let summary = risk.summary(&valuation.weights, DEFAULT_ALPHA)?;
    println!("VaR (95%):     {:.3}%", summary.var * 100.0);
    println!("CVaR (95%):    {:.3}%", summary.cvar * 100.0);
    println!("Max drawdown:  {:.3}%", summary.max_drawdown * 100.0);

    let drawdown = risk.calculate_drawdown(&valuation.weights)?;
    println!("Deepest point: {}", drawdown.max_drawdown_date);

    let rolling = risk.calculate_rolling_volatility(&valuation.weights, DEFAULT_VOLATILITY_WINDOW)?;
    if let Some(Some(latest)) = rolling.last() {
        println!(
            "Latest {}-day volatility (annualized): {:.2}%",
            DEFAULT_VOLATILITY_WINDOW,
            latest * 100.0
        );
    }

    println!("\nCorrelation matrix:");
    let corr = risk.calculate_correlation_matrix();
    for (i, asset) in assets.iter().enumerate() {
        let row: Vec<String> = (0..assets.len())
            .map(|j| format!("{:>6.2}", corr[(i, j)]))
            .collect();
        println!("  {:<4} {}", asset, row.join(" "));
    }

    Ok(())
}
