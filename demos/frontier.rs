//! Efficient Frontier Example
//!
//! Builds daily returns from a small price history and prints the three
//! single-portfolio strategies followed by the efficient frontier:
//!
//! minimize    w' Σ w                (minimize risk)
//! subject to  μ' w >= target        (minimum return)
//!             sum(w) = 1            (fully invested)
//!             w >= 0                (long-only)

use chrono::NaiveDate;
use markowitz::prelude::*;
use nalgebra::DMatrix;

fn print_portfolio(label: &str, assets: &[String], p: &PortfolioPerformance) {
    println!("{}:", label);
    for (asset, w) in assets.iter().zip(&p.weights) {
        println!("  {:<5} {:>6.2}%", asset, w * 100.0);
    }
    println!(
        "  Annual return: {:.2}%   Annual volatility: {:.2}%",
        annualize_return(p.expected_return, TRADING_DAYS_PER_YEAR) * 100.0,
        annualize_volatility(p.volatility, TRADING_DAYS_PER_YEAR) * 100.0
    );
    if let Some(s) = p.sharpe_ratio {
        println!("  Sharpe ratio (per period): {:.4}", s);
    }
    println!();
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Efficient Frontier ===\n");

    let assets: Vec<String> = ["AAA", "BBB", "CCC", "DDD"].iter().map(|s| s.to_string()).collect();

    #[rustfmt::skip]
    let prices = DMatrix::from_row_slice(10, 4, &[
        100.0, 50.0, 20.0, 80.0,
        101.5, 49.6, 20.1, 80.2,
        100.9, 50.4, 20.3, 80.1,
        102.8, 50.1, 20.2, 80.6,
        103.1, 51.0, 20.5, 80.4,
        102.2, 51.6, 20.4, 80.9,
        104.0, 51.2, 20.7, 81.0,
        105.2, 52.0, 20.6, 81.3,
        104.6, 52.7, 20.9, 81.2,
        106.1, 52.3, 21.1, 81.7,
    ]);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
    let returns =
        ReturnMatrix::from_prices_simple(daily_dates(start, 10), assets.clone(), &prices)?;

    let optimizer = PortfolioOptimizer::new(&returns)?;
    let risk_free_rate = 0.02 / TRADING_DAYS_PER_YEAR as f64;

    print_portfolio("Equal weight", &assets, &optimizer.equal_weight_portfolio());
    print_portfolio("Minimum variance", &assets, &optimizer.min_variance()?);
    match optimizer.max_sharpe_ratio(risk_free_rate) {
        Ok(p) => print_portfolio("Maximum Sharpe ratio", &assets, &p),
        Err(e) => println!("Maximum Sharpe ratio unavailable: {}\n", e),
    }

    println!("--- Efficient Frontier ---\n");

    let report = optimizer.efficient_frontier_report(&optimizer.default_targets(20));
    for p in &report.portfolios {
        println!(
            "  Return: {:.3}%  →  Risk: {:.3}%",
            p.expected_return * 100.0,
            p.volatility * 100.0
        );
    }
    if !report.skipped.is_empty() {
        println!("\n  {} target(s) skipped", report.skipped.len());
    }

    println!("\nHigher returns require accepting higher risk!");
    Ok(())
}
