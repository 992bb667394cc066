//! Clarabel solver integration.
//!
//! This module provides the interface to the Clarabel conic solver.

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stuffing::{ConeDims, StuffedProblem};
use crate::error::{PortfolioError, Result};

/// Solution status from the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Solution found to reduced accuracy.
    AlmostOptimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Maximum iterations or time reached.
    MaxIterations,
    /// Numerical difficulties.
    NumericalError,
    /// Unknown status.
    Unknown,
}

impl SolveStatus {
    /// Whether the solver returned a usable primal point.
    pub fn is_solved(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::AlmostOptimal)
    }
}

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => SolveStatus::Optimal,
            SolverStatus::AlmostSolved => SolveStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                SolveStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                SolveStatus::Unbounded
            }
            SolverStatus::MaxIterations | SolverStatus::MaxTime => SolveStatus::MaxIterations,
            SolverStatus::NumericalError | SolverStatus::InsufficientProgress => {
                SolveStatus::NumericalError
            }
            _ => SolveStatus::Unknown,
        }
    }
}

/// Solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Print solver output.
    pub verbose: bool,
    /// Maximum iterations.
    pub max_iter: u32,
    /// Time limit in seconds.
    pub time_limit: f64,
    /// Absolute tolerance.
    pub tol_gap_abs: f64,
    /// Relative tolerance.
    pub tol_gap_rel: f64,
    /// Feasibility tolerance.
    pub tol_feas: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            verbose: false,
            max_iter: 200,
            time_limit: f64::INFINITY,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
            tol_feas: 1e-8,
        }
    }
}

/// Solution from the solver.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status.
    pub status: SolveStatus,
    /// Objective value `x' Q x` (if solved).
    pub value: Option<f64>,
    /// Primal variable values (if solved).
    pub x: Option<Vec<f64>>,
    /// Solve time in seconds.
    pub solve_time: f64,
    /// Number of iterations.
    pub iterations: u32,
}

/// Solve the stuffed problem using Clarabel.
pub fn solve(problem: &StuffedProblem, settings: &Settings) -> Result<Solution> {
    let p = to_clarabel_csc(&problem.p);
    let a = to_clarabel_csc(&problem.a);
    let cones = to_clarabel_cones(&problem.cone_dims);

    let clarabel_settings = DefaultSettingsBuilder::default()
        .verbose(settings.verbose)
        .max_iter(settings.max_iter)
        .time_limit(settings.time_limit)
        .tol_gap_abs(settings.tol_gap_abs)
        .tol_gap_rel(settings.tol_gap_rel)
        .tol_feas(settings.tol_feas)
        .build()
        .map_err(|e| {
            PortfolioError::OptimizationFailed(format!("invalid solver settings: {}", e))
        })?;

    let mut solver = DefaultSolver::new(&p, &problem.q, &a, &problem.b, &cones, clarabel_settings);
    solver.solve();

    let status: SolveStatus = solver.solution.status.into();
    let solve_time = solver.solution.solve_time;
    let iterations = solver.info.iterations;
    debug!(?status, iterations, solve_time, "clarabel finished");

    let solution = if status.is_solved() {
        let x = solver.solution.x.clone();
        let value = compute_objective(&x, &problem.p, &problem.q);
        Solution {
            status,
            value: Some(value),
            x: Some(x),
            solve_time,
            iterations,
        }
    } else {
        Solution {
            status,
            value: None,
            x: None,
            solve_time,
            iterations,
        }
    };
    Ok(solution)
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &nalgebra_sparse::CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

/// Convert cone dimensions to Clarabel cones.
fn to_clarabel_cones(dims: &ConeDims) -> Vec<SupportedConeT<f64>> {
    let mut cones = Vec::new();

    if dims.zero > 0 {
        cones.push(SupportedConeT::ZeroConeT(dims.zero));
    }

    if dims.nonneg > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(dims.nonneg));
    }

    cones
}

/// Compute objective value: (1/2) x' P x + q' x.
fn compute_objective(x: &[f64], p: &nalgebra_sparse::CscMatrix<f64>, q: &[f64]) -> f64 {
    let linear: f64 = q.iter().zip(x.iter()).map(|(qi, xi)| qi * xi).sum();

    let mut quadratic = 0.0;
    for (row, col, val) in p.triplet_iter() {
        if row == col {
            quadratic += 0.5 * *val * x[row] * x[col];
        } else {
            // Off-diagonal (stored as upper triangle, so count once)
            quadratic += *val * x[row] * x[col];
        }
    }

    linear + quadratic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::QuadraticProgram;
    use nalgebra::DMatrix;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.verbose);
        assert_eq!(settings.max_iter, 200);
    }

    #[test]
    fn test_to_clarabel_cones() {
        let dims = ConeDims { zero: 2, nonneg: 3 };
        assert_eq!(to_clarabel_cones(&dims).len(), 2);
        assert_eq!(to_clarabel_cones(&ConeDims { zero: 1, nonneg: 0 }).len(), 1);
    }

    #[test]
    fn test_solve_simplex_qp() {
        // minimize x'x s.t. sum(x) = 1, x >= 0  ->  x = [0.5, 0.5], value 0.5
        let stuffed = QuadraticProgram::new(2)
            .minimize_quadratic(&DMatrix::identity(2, 2))
            .unwrap()
            .equal(&[1.0, 1.0], 1.0)
            .unwrap()
            .nonnegative()
            .stuff();
        let solution = solve(&stuffed, &Settings::default()).unwrap();

        assert_eq!(solution.status, SolveStatus::Optimal);
        let x = solution.x.expect("no primal");
        assert!((x[0] - 0.5).abs() < 1e-6, "got {:?}", x);
        assert!((x[1] - 0.5).abs() < 1e-6, "got {:?}", x);
        let value = solution.value.expect("no value");
        assert!((value - 0.5).abs() < 1e-6, "Expected ~0.5, got {}", value);
    }

    #[test]
    fn test_solve_infeasible() {
        // x >= 0 and sum(x) = -1 cannot both hold
        let stuffed = QuadraticProgram::new(2)
            .minimize_quadratic(&DMatrix::identity(2, 2))
            .unwrap()
            .equal(&[1.0, 1.0], -1.0)
            .unwrap()
            .nonnegative()
            .stuff();
        let solution = solve(&stuffed, &Settings::default()).unwrap();

        assert_eq!(solution.status, SolveStatus::Infeasible);
        assert!(solution.x.is_none());
        assert!(solution.value.is_none());
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"max_iter": 50}"#).unwrap();
        assert_eq!(settings.max_iter, 50);
        assert_eq!(settings.tol_feas, 1e-8);
    }
}
