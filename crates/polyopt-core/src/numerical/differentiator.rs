//! Finite-difference gradient and Jacobian estimation.
//!
//! A [`Differentiator`] estimates first derivatives of a scalar function
//! (gradient) or of a vector function (Jacobian) around a point, reusing the
//! function value already known at that point when the forward scheme is
//! selected. The function is supplied per call as a closure, so the same
//! differentiator can serve any callback the adapter layer routes to it.
//!
//! Step sizes scale with the magnitude of each coordinate:
//!
//! ```text
//! forward:  h_j = sqrt(eps) * max(|x_j|, 1)
//! central:  h_j = cbrt(eps) * max(|x_j|, 1)
//! ```

use crate::error::{OptimizerError, OptimizerResult};
use crate::types::{constants, Matrix, Real};
use std::cell::Cell;

/// Finite-difference scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DifferentiationMethod {
    /// One extra evaluation per coordinate, O(h) error.
    #[default]
    Forward,
    /// Two extra evaluations per coordinate, O(h²) error.
    Central,
}

impl DifferentiationMethod {
    fn step(self, x: Real) -> Real {
        let scale = x.abs().max(1.0);
        match self {
            Self::Forward => constants::EPSILON.sqrt() * scale,
            Self::Central => constants::EPSILON.cbrt() * scale,
        }
    }
}

/// Finite-difference estimator with call accounting.
#[derive(Debug, Default)]
pub struct Differentiator {
    method: DifferentiationMethod,
    num_differentiations: Cell<usize>,
    num_calls: Cell<usize>,
}

impl Differentiator {
    /// Creates a differentiator using `method`.
    pub fn new(method: DifferentiationMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Current scheme.
    pub fn method(&self) -> DifferentiationMethod {
        self.method
    }

    /// Switches the scheme used by subsequent estimates.
    pub fn set_method(&mut self, method: DifferentiationMethod) {
        self.method = method;
    }

    /// Number of gradients or Jacobians estimated so far.
    pub fn num_differentiations(&self) -> usize {
        self.num_differentiations.get()
    }

    /// Number of function evaluations spent on estimates so far.
    pub fn num_calls_to_user_function(&self) -> usize {
        self.num_calls.get()
    }

    /// Clears the counters.
    pub fn reset_statistics(&self) {
        self.num_differentiations.set(0);
        self.num_calls.set(0);
    }

    /// Estimates the gradient of `f` at `x`, given `f0 = f(x)`.
    ///
    /// `f` returns `None` when it cannot be evaluated at the perturbed point.
    pub fn calc_gradient<F>(
        &self,
        x: &[Real],
        f0: Real,
        mut f: F,
        gradient: &mut [Real],
    ) -> OptimizerResult<()>
    where
        F: FnMut(&[Real]) -> Option<Real>,
    {
        if gradient.len() != x.len() {
            return Err(OptimizerError::dimension_mismatch(x.len(), gradient.len()));
        }
        self.num_differentiations.set(self.num_differentiations.get() + 1);

        let mut work = x.to_vec();
        for j in 0..x.len() {
            let h = self.method.step(x[j]);
            gradient[j] = match self.method {
                DifferentiationMethod::Forward => {
                    work[j] = x[j] + h;
                    let fp = self.eval_scalar(&mut f, &work, j)?;
                    (fp - f0) / h
                }
                DifferentiationMethod::Central => {
                    work[j] = x[j] + h;
                    let fp = self.eval_scalar(&mut f, &work, j)?;
                    work[j] = x[j] - h;
                    let fm = self.eval_scalar(&mut f, &work, j)?;
                    (fp - fm) / (2.0 * h)
                }
            };
            work[j] = x[j];
        }
        Ok(())
    }

    /// Estimates the m×n Jacobian of `f` at `x`, given `fy0 = f(x)`.
    ///
    /// Row `i` of `jacobian` holds the derivatives of output `i`. `f` writes
    /// its outputs into the provided buffer and returns `false` on failure.
    pub fn calc_jacobian<F>(
        &self,
        x: &[Real],
        fy0: &[Real],
        mut f: F,
        jacobian: &mut Matrix,
    ) -> OptimizerResult<()>
    where
        F: FnMut(&[Real], &mut [Real]) -> bool,
    {
        let (m, n) = (fy0.len(), x.len());
        if jacobian.shape() != (m, n) {
            return Err(OptimizerError::dimension_mismatch(
                format!("{m}x{n}"),
                format!("{}x{}", jacobian.nrows(), jacobian.ncols()),
            ));
        }
        self.num_differentiations.set(self.num_differentiations.get() + 1);

        let mut work = x.to_vec();
        let mut fp = vec![0.0; m];
        let mut fm = vec![0.0; m];
        for j in 0..n {
            let h = self.method.step(x[j]);
            work[j] = x[j] + h;
            self.eval_vector(&mut f, &work, &mut fp, j)?;
            match self.method {
                DifferentiationMethod::Forward => {
                    for i in 0..m {
                        jacobian[(i, j)] = (fp[i] - fy0[i]) / h;
                    }
                }
                DifferentiationMethod::Central => {
                    work[j] = x[j] - h;
                    self.eval_vector(&mut f, &work, &mut fm, j)?;
                    for i in 0..m {
                        jacobian[(i, j)] = (fp[i] - fm[i]) / (2.0 * h);
                    }
                }
            }
            work[j] = x[j];
        }
        Ok(())
    }

    fn eval_scalar<F>(&self, f: &mut F, x: &[Real], coordinate: usize) -> OptimizerResult<Real>
    where
        F: FnMut(&[Real]) -> Option<Real>,
    {
        self.num_calls.set(self.num_calls.get() + 1);
        f(x).ok_or_else(|| {
            OptimizerError::differentiation_failed(format!(
                "function evaluation failed while perturbing coordinate {coordinate}"
            ))
        })
    }

    fn eval_vector<F>(
        &self,
        f: &mut F,
        x: &[Real],
        out: &mut [Real],
        coordinate: usize,
    ) -> OptimizerResult<()>
    where
        F: FnMut(&[Real], &mut [Real]) -> bool,
    {
        self.num_calls.set(self.num_calls.get() + 1);
        if f(x, out) {
            Ok(())
        } else {
            Err(OptimizerError::differentiation_failed(format!(
                "function evaluation failed while perturbing coordinate {coordinate}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quadratic(x: &[Real]) -> Option<Real> {
        Some(x[0] * x[0] + 4.0 * x[1] * x[1])
    }

    #[test]
    fn test_forward_gradient() {
        let diff = Differentiator::new(DifferentiationMethod::Forward);
        let x = [1.0, 1.0];
        let mut grad = [0.0; 2];
        diff.calc_gradient(&x, quadratic(&x).unwrap(), quadratic, &mut grad)
            .unwrap();

        assert_relative_eq!(grad[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(grad[1], 8.0, epsilon = 1e-6);
        assert_eq!(diff.num_differentiations(), 1);
        assert_eq!(diff.num_calls_to_user_function(), 2);
    }

    #[test]
    fn test_central_gradient_is_tighter() {
        let diff = Differentiator::new(DifferentiationMethod::Central);
        let cubic = |x: &[Real]| Some(x[0].powi(3));
        let x = [2.0];
        let mut grad = [0.0];
        diff.calc_gradient(&x, 8.0, cubic, &mut grad).unwrap();

        assert_relative_eq!(grad[0], 12.0, epsilon = 1e-8);
        assert_eq!(diff.num_calls_to_user_function(), 2);

        diff.reset_statistics();
        assert_eq!(diff.num_calls_to_user_function(), 0);
    }

    #[test]
    fn test_jacobian_rows_are_outputs() {
        let diff = Differentiator::new(DifferentiationMethod::Forward);
        // f(x) = [x0 + 2 x1 + 3 x2, x0 * x1]
        let f = |x: &[Real], out: &mut [Real]| {
            out[0] = x[0] + 2.0 * x[1] + 3.0 * x[2];
            out[1] = x[0] * x[1];
            true
        };
        let x = [1.0, 2.0, 3.0];
        let mut fy0 = [0.0; 2];
        f(&x, &mut fy0);
        let mut jac = Matrix::zeros(2, 3);
        diff.calc_jacobian(&x, &fy0, f, &mut jac).unwrap();

        let expected = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 2.0, 1.0, 0.0]);
        for (a, b) in jac.iter().zip(expected.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_failed_evaluation_is_reported() {
        let diff = Differentiator::default();
        let mut grad = [0.0; 2];
        let err = diff
            .calc_gradient(&[0.0, 0.0], 0.0, |_| None, &mut grad)
            .unwrap_err();
        assert!(matches!(err, OptimizerError::DifferentiationFailed { .. }));

        let mut jac = Matrix::zeros(1, 2);
        let err = diff
            .calc_jacobian(&[0.0, 0.0], &[0.0], |_, _| false, &mut jac)
            .unwrap_err();
        assert!(matches!(err, OptimizerError::DifferentiationFailed { .. }));
    }

    #[test]
    fn test_shape_mismatch() {
        let diff = Differentiator::default();
        let mut jac = Matrix::zeros(3, 3);
        let err = diff
            .calc_jacobian(&[0.0, 0.0], &[0.0], |_, _| true, &mut jac)
            .unwrap_err();
        assert!(matches!(err, OptimizerError::DimensionMismatch { .. }));
    }
}
