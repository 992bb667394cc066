//! Sparse matrix utilities.
//!
//! Helper functions for assembling nalgebra-sparse matrices for the solver.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Entries with smaller magnitude are not stored.
const DROP_TOL: f64 = 1e-15;

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together; out-of-range entries are ignored.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    triplets: &[(usize, usize, f64)],
) -> CscMatrix<f64> {
    if triplets.is_empty() {
        return CscMatrix::zeros(nrows, ncols);
    }

    let mut coo = CooMatrix::new(nrows, ncols);
    for &(row, col, val) in triplets {
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }

    CscMatrix::from(&coo)
}

/// Upper triangle of a dense symmetric matrix, scaled, embedded in the
/// top-left corner of an `n x n` sparse matrix.
///
/// Clarabel reads only the upper triangle of its quadratic cost.
pub fn upper_triangle_csc(dense: &DMatrix<f64>, n: usize, scale: f64) -> CscMatrix<f64> {
    let mut triplets = Vec::new();
    for j in 0..dense.ncols() {
        for i in 0..=j.min(dense.nrows().saturating_sub(1)) {
            let v = dense[(i, j)];
            if v.abs() > DROP_TOL {
                triplets.push((i, j, v * scale));
            }
        }
    }
    csc_from_triplets(n, n, &triplets)
}

/// Convert CSC to dense matrix.
pub fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] = *val;
    }
    dense
}
