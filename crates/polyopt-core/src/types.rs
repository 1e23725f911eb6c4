//! Type definitions and aliases shared by every PolyOpt crate.
//!
//! Parameters, gradients and constraint values travel between backends and
//! user callbacks as nalgebra containers. Backends hand raw buffers to the
//! adapter layer, which wraps them in the view aliases defined here so that no
//! copy is made on the way to (or back from) a user callback.

use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};

/// Scalar type used by every backend.
pub type Real = f64;

/// Owned dense column vector.
pub type Vector = DVector<Real>;

/// Owned dense matrix (column-major storage).
pub type Matrix = DMatrix<Real>;

/// Read-only vector view over a borrowed buffer.
pub type VectorView<'a> = DVectorView<'a, Real>;

/// Mutable vector view over a borrowed buffer.
pub type VectorViewMut<'a> = DVectorViewMut<'a, Real>;

/// Mutable matrix view over a borrowed buffer.
pub type MatrixViewMut<'a> = DMatrixViewMut<'a, Real>;

/// Numerical constants used across the backends.
pub mod constants {
    use super::Real;

    /// Machine epsilon.
    pub const EPSILON: Real = Real::EPSILON;

    /// Default convergence tolerance.
    pub const DEFAULT_TOLERANCE: Real = 1e-4;

    /// Default iteration budget.
    pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

    /// Default number of correction pairs kept by limited-memory methods.
    pub const DEFAULT_LIMITED_MEMORY_HISTORY: usize = 50;

    /// Smallest step a line search may try before giving up.
    pub const MIN_STEP_SIZE: Real = 1e-16;

    /// Values above this magnitude are treated as infinite bounds.
    pub const INFINITE_BOUND: Real = 1e19;
}

/// Returns the infinity norm of a slice.
pub fn norm_inf(values: &[Real]) -> Real {
    values.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

/// Returns the Euclidean norm of a slice.
pub fn norm2(values: &[Real]) -> Real {
    dot(values, values).sqrt()
}

/// Inner product of two equally sized slices.
pub fn dot(a: &[Real], b: &[Real]) -> Real {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
