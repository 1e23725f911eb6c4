//! Native calling convention spoken by backend solve loops.
//!
//! Backend engines are written against raw buffers and integer status codes,
//! the way compiled solver libraries expose their callbacks: a nonzero status
//! means success, zero means failure, and no error ever unwinds through the
//! engine. Derivative callbacks follow a two-phase protocol in which a call
//! without a values buffer asks for the sparsity structure instead.
//!
//! The adapter layer ([`crate::adapter`]) is the only implementor of
//! [`NativeProblem`] in this workspace; engines never see user callbacks.

use crate::types::Real;

/// Status returned across the native boundary.
pub type NativeStatus = i32;

/// Index type of sparsity structures.
pub type Index = i32;

/// Native success sentinel.
pub const NATIVE_SUCCESS: NativeStatus = 1;

/// Native failure sentinel.
pub const NATIVE_FAILURE: NativeStatus = 0;

/// Whether a native status reports success.
#[inline]
pub fn succeeded(status: NativeStatus) -> bool {
    status != NATIVE_FAILURE
}

/// Callback surface a backend engine evaluates the problem through.
pub trait NativeProblem {
    /// Number of parameters n.
    fn num_parameters(&self) -> usize;

    /// Number of constraints m.
    fn num_constraints(&self) -> usize;

    /// Number of entries in the constraint Jacobian structure.
    fn jacobian_nonzeros(&self) -> usize {
        self.num_constraints() * self.num_parameters()
    }

    /// Number of entries in the Hessian structure.
    fn hessian_nonzeros(&self) -> usize {
        self.num_parameters() * self.num_parameters()
    }

    /// Objective value at `x`.
    fn eval_f(&self, x: &[Real], new_x: bool, f: &mut Real) -> NativeStatus;

    /// Objective gradient at `x` (length n).
    fn eval_grad_f(&self, x: &[Real], new_x: bool, grad_f: &mut [Real]) -> NativeStatus;

    /// Constraint values at `x` (length m).
    fn eval_g(&self, x: &[Real], new_x: bool, g: &mut [Real]) -> NativeStatus;

    /// Constraint Jacobian.
    ///
    /// With `values == None` the structure (`i_row`, `j_col`, `nele_jac`
    /// entries each) is requested; otherwise the values, in the order the
    /// structure was reported.
    fn eval_jac_g(
        &self,
        x: &[Real],
        new_x: bool,
        nele_jac: usize,
        i_row: Option<&mut [Index]>,
        j_col: Option<&mut [Index]>,
        values: Option<&mut [Real]>,
    ) -> NativeStatus;

    /// Hessian of the Lagrangian, same two-phase protocol as [`Self::eval_jac_g`].
    #[allow(clippy::too_many_arguments)]
    fn eval_h(
        &self,
        x: &[Real],
        new_x: bool,
        obj_factor: Real,
        lambda: &[Real],
        new_lambda: bool,
        nele_hess: usize,
        i_row: Option<&mut [Index]>,
        j_col: Option<&mut [Index]>,
        values: Option<&mut [Real]>,
    ) -> NativeStatus;
}

/// Objective evaluation returning `None` on failure.
pub fn objective_value<P: NativeProblem + ?Sized>(problem: &P, x: &[Real], new_x: bool) -> Option<Real> {
    let mut f = 0.0;
    succeeded(problem.eval_f(x, new_x, &mut f)).then_some(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_polarity() {
        assert!(succeeded(NATIVE_SUCCESS));
        assert!(succeeded(7));
        assert!(!succeeded(NATIVE_FAILURE));
    }
}
