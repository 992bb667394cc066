//! Solver interface for markowitz.
//!
//! This module provides:
//! - Matrix stuffing of long-only quadratic programs into solver format
//! - Clarabel solver integration

pub mod clarabel;
pub mod stuffing;

pub use self::clarabel::{solve, Settings, Solution, SolveStatus};
pub use stuffing::{ConeDims, QuadraticProgram, StuffedProblem};
