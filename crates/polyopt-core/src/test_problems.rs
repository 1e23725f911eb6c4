//! Small problems with known solutions, for tests and benchmarks.
//!
//! Every function here has the signature of the matching user callback and
//! can be registered directly.

use crate::callbacks::CALLBACK_SUCCESS;
use crate::system::OptimizerSystem;
use crate::types::{Matrix, MatrixViewMut, Real, VectorView, VectorViewMut};

/// Σ (xᵢ − (i+1))², minimized at xᵢ = i + 1 with value 0.
pub fn shifted_quadratic(_: &OptimizerSystem, x: VectorView<'_>, _: bool, f: &mut Real) -> i32 {
    *f = x
        .iter()
        .enumerate()
        .map(|(i, xi)| (xi - (i + 1) as Real).powi(2))
        .sum();
    CALLBACK_SUCCESS
}

/// Gradient of [`shifted_quadratic`].
pub fn shifted_quadratic_gradient(
    _: &OptimizerSystem,
    x: VectorView<'_>,
    _: bool,
    mut g: VectorViewMut<'_>,
) -> i32 {
    for (i, xi) in x.iter().enumerate() {
        g[i] = 2.0 * (xi - (i + 1) as Real);
    }
    CALLBACK_SUCCESS
}

/// Hessian of [`shifted_quadratic`]: 2·I.
pub fn shifted_quadratic_hessian(
    _: &OptimizerSystem,
    _: VectorView<'_>,
    _: bool,
    mut h: MatrixViewMut<'_>,
) -> i32 {
    h.fill(0.0);
    h.fill_diagonal(2.0);
    CALLBACK_SUCCESS
}

/// Two-dimensional Rosenbrock function, minimized at (1, 1).
pub fn rosenbrock(_: &OptimizerSystem, x: VectorView<'_>, _: bool, f: &mut Real) -> i32 {
    *f = (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
    CALLBACK_SUCCESS
}

/// Gradient of [`rosenbrock`].
pub fn rosenbrock_gradient(
    _: &OptimizerSystem,
    x: VectorView<'_>,
    _: bool,
    mut g: VectorViewMut<'_>,
) -> i32 {
    let t = x[1] - x[0] * x[0];
    g[0] = -2.0 * (1.0 - x[0]) - 400.0 * x[0] * t;
    g[1] = 200.0 * t;
    CALLBACK_SUCCESS
}

/// Single linear constraint x₀ + x₁ − 1, for use as an equality (= 0).
pub fn unit_sum_constraint(
    _: &OptimizerSystem,
    x: VectorView<'_>,
    _: bool,
    mut g: VectorViewMut<'_>,
) -> i32 {
    g[0] = x[0] + x[1] - 1.0;
    CALLBACK_SUCCESS
}

/// Jacobian of [`unit_sum_constraint`].
pub fn unit_sum_jacobian(_: &OptimizerSystem, _: VectorView<'_>, _: bool, jac: &mut Matrix) -> i32 {
    jac[(0, 0)] = 1.0;
    jac[(0, 1)] = 1.0;
    CALLBACK_SUCCESS
}
