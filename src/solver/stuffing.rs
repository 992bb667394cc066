//! Matrix stuffing: assembles a quadratic program in solver format.
//!
//! A [`QuadraticProgram`] collects a quadratic cost and linear equality and
//! inequality rows, then builds the matrices (P, q, A, b) and cone
//! specification Clarabel expects:
//!
//! ```text
//! minimize    (1/2) x' P x + q' x
//! subject to  A x + s = b,  s in K
//! ```
//!
//! with `K = ZeroCone(equalities) x NonnegativeCone(inequalities)`.

use nalgebra::DMatrix;
use nalgebra_sparse::CscMatrix;

use crate::error::{PortfolioError, Result};
use crate::sparse::{csc_from_triplets, upper_triangle_csc};

/// Cone dimensions for Clarabel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConeDims {
    /// Number of zero cone (equality) rows.
    pub zero: usize,
    /// Number of nonnegative cone (inequality) rows.
    pub nonneg: usize,
}

impl ConeDims {
    /// Total number of constraint rows.
    pub fn total(&self) -> usize {
        self.zero + self.nonneg
    }
}

/// A sparse linear row `coeffs . x` compared against `rhs`.
#[derive(Debug, Clone)]
struct LinearRow {
    coeffs: Vec<(usize, f64)>,
    rhs: f64,
}

/// Quadratic program with linear constraints.
///
/// The objective is `x' Q x` where `Q` covers the leading block of variables.
#[derive(Debug, Clone)]
pub struct QuadraticProgram {
    num_vars: usize,
    quadratic: Option<DMatrix<f64>>,
    equalities: Vec<LinearRow>,
    inequalities: Vec<LinearRow>,
}

impl QuadraticProgram {
    /// Create an empty program over `num_vars` variables.
    pub fn new(num_vars: usize) -> Self {
        QuadraticProgram {
            num_vars,
            quadratic: None,
            equalities: Vec::new(),
            inequalities: Vec::new(),
        }
    }

    /// Set the quadratic cost `x' Q x` over the first `Q.nrows()` variables.
    pub fn minimize_quadratic(mut self, q: &DMatrix<f64>) -> Result<Self> {
        if q.nrows() != q.ncols() || q.nrows() > self.num_vars {
            return Err(PortfolioError::dimension(
                format!("square matrix of order <= {}", self.num_vars),
                format!("{}x{}", q.nrows(), q.ncols()),
            ));
        }
        self.quadratic = Some(q.clone());
        Ok(self)
    }

    /// Add `a . x == rhs` with `a` dense over the leading variables.
    pub fn equal(mut self, a: &[f64], rhs: f64) -> Result<Self> {
        let row = self.dense_row(a, rhs, 1.0)?;
        self.equalities.push(row);
        Ok(self)
    }

    /// Add `a . x >= rhs`.
    pub fn greater_equal(mut self, a: &[f64], rhs: f64) -> Result<Self> {
        // -a . x <= -rhs
        let row = self.dense_row(a, rhs, -1.0)?;
        self.inequalities.push(row);
        Ok(self)
    }

    /// Add `x_i >= 0` for every variable.
    pub fn nonnegative(mut self) -> Self {
        for i in 0..self.num_vars {
            self.inequalities.push(LinearRow {
                coeffs: vec![(i, -1.0)],
                rhs: 0.0,
            });
        }
        self
    }

    fn dense_row(&self, a: &[f64], rhs: f64, sign: f64) -> Result<LinearRow> {
        if a.len() > self.num_vars {
            return Err(PortfolioError::dimension(
                format!("at most {} coefficients", self.num_vars),
                format!("{} coefficients", a.len()),
            ));
        }
        let coeffs = a
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| (i, v * sign))
            .collect();
        Ok(LinearRow {
            coeffs,
            rhs: rhs * sign,
        })
    }

    /// Build the solver matrices.
    pub fn stuff(&self) -> StuffedProblem {
        let n = self.num_vars;

        // Clarabel uses (1/2) x' P x, so P = 2Q gives the objective x' Q x.
        let p = match &self.quadratic {
            Some(q) => upper_triangle_csc(q, n, 2.0),
            None => CscMatrix::zeros(n, n),
        };

        let cone_dims = ConeDims {
            zero: self.equalities.len(),
            nonneg: self.inequalities.len(),
        };

        // Zero cone rows first, then nonnegative rows, matching the cone order.
        let mut triplets = Vec::new();
        let mut b = Vec::with_capacity(cone_dims.total());
        for (row_idx, row) in self.equalities.iter().chain(&self.inequalities).enumerate() {
            for &(col, val) in &row.coeffs {
                triplets.push((row_idx, col, val));
            }
            b.push(row.rhs);
        }
        let a = csc_from_triplets(cone_dims.total(), n, &triplets);

        StuffedProblem {
            p,
            q: vec![0.0; n],
            a,
            b,
            cone_dims,
        }
    }
}

/// Stuffed problem ready for Clarabel.
#[derive(Debug)]
pub struct StuffedProblem {
    /// Quadratic cost matrix P (n x n, upper triangle).
    pub p: CscMatrix<f64>,
    /// Linear cost vector q (n).
    pub q: Vec<f64>,
    /// Constraint matrix A (m x n).
    pub a: CscMatrix<f64>,
    /// Constraint vector b (m).
    pub b: Vec<f64>,
    /// Cone dimensions.
    pub cone_dims: ConeDims,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::csc_to_dense;

    #[test]
    fn test_cone_dims() {
        let dims = ConeDims { zero: 2, nonneg: 3 };
        assert_eq!(dims.total(), 5);
    }

    #[test]
    fn test_stuff_rows_in_cone_order() {
        let qp = QuadraticProgram::new(2)
            .nonnegative()
            .greater_equal(&[0.1, 0.2], 0.15)
            .unwrap()
            .equal(&[1.0, 1.0], 1.0)
            .unwrap();
        let stuffed = qp.stuff();

        assert_eq!(stuffed.cone_dims, ConeDims { zero: 1, nonneg: 3 });
        assert_eq!(stuffed.b, vec![1.0, 0.0, 0.0, -0.15]);

        let a = csc_to_dense(&stuffed.a);
        assert_eq!(a.nrows(), 4);
        assert_eq!((a[(0, 0)], a[(0, 1)]), (1.0, 1.0));
        assert_eq!((a[(1, 0)], a[(1, 1)]), (-1.0, 0.0));
        assert_eq!((a[(3, 0)], a[(3, 1)]), (-0.1, -0.2));
    }

    #[test]
    fn test_quadratic_scaled_by_two() {
        let q = DMatrix::from_row_slice(2, 2, &[1.0, 0.25, 0.25, 1.0]);
        let stuffed = QuadraticProgram::new(3).minimize_quadratic(&q).unwrap().stuff();
        let p = csc_to_dense(&stuffed.p);
        assert_eq!(p.nrows(), 3);
        assert_eq!(p[(0, 0)], 2.0);
        assert_eq!(p[(0, 1)], 0.5);
        assert_eq!(p[(1, 0)], 0.0);
        assert_eq!(stuffed.q, vec![0.0; 3]);
    }

    #[test]
    fn test_oversized_rows_rejected() {
        let err = QuadraticProgram::new(2).equal(&[1.0, 1.0, 1.0], 1.0).unwrap_err();
        assert!(matches!(err, PortfolioError::DimensionMismatch { .. }));

        let q = DMatrix::identity(3, 3);
        assert!(QuadraticProgram::new(2).minimize_quadratic(&q).is_err());
    }
}
