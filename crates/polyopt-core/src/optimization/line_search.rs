//! Backtracking line search.
//!
//! Given a trial map α ↦ x(α) (a plain step `x + α d`, or its projection onto
//! a box), the search looks for the largest `α = α₀ ρᵏ` satisfying the
//! sufficient decrease condition
//!
//! ```text
//! f(x(α)) ≤ f(x) + c₁ ⟨∇f(x), x(α) − x⟩
//! ```
//!
//! For an unprojected step the inner product is `α ⟨∇f(x), d⟩` and this is the
//! usual Armijo condition. A trial the function cannot be evaluated at (the
//! callback failed, or returned a non-finite value) is treated like a rejected
//! step: the search shrinks α and tries again.
//!
//! [`weak_wolfe`] additionally enforces the curvature condition
//! `φ'(α) ≥ c₂ φ'(0)` by bisection on a bracket, doubling α while no upper
//! end is known.

use crate::error::{OptimizerError, OptimizerResult};
use crate::types::{constants, Real};

/// Parameters of the backtracking search.
#[derive(Debug, Clone)]
pub struct LineSearchParams {
    /// Initial step size α₀
    pub initial_step_size: Real,
    /// Minimum step size threshold before declaring failure
    pub min_step_size: Real,
    /// Maximum number of trials
    pub max_iterations: usize,
    /// Armijo parameter c₁ ∈ (0,1)
    pub c1: Real,
    /// Curvature parameter c₂ ∈ (c₁,1), used by [`weak_wolfe`] only
    pub c2: Real,
    /// Backtracking reduction factor ρ ∈ (0,1)
    pub rho: Real,
}

impl Default for LineSearchParams {
    fn default() -> Self {
        Self {
            initial_step_size: 1.0,
            min_step_size: constants::MIN_STEP_SIZE,
            max_iterations: 40,
            c1: 1e-4,
            c2: 0.9,
            rho: 0.5,
        }
    }
}

impl LineSearchParams {
    /// Validates the parameters.
    pub fn validate(&self) -> OptimizerResult<()> {
        if self.initial_step_size <= 0.0 {
            return Err(OptimizerError::invalid_configuration(
                "Initial step size must be positive",
                "initial_step",
                self.initial_step_size.to_string(),
            ));
        }
        if self.c1 <= 0.0 || self.c1 >= 1.0 {
            return Err(OptimizerError::invalid_configuration(
                "Armijo constant c1 must be in (0, 1)",
                "line_search_c1",
                self.c1.to_string(),
            ));
        }
        if self.c2 <= self.c1 || self.c2 >= 1.0 {
            return Err(OptimizerError::invalid_configuration(
                "Curvature constant c2 must be in (c1, 1)",
                "line_search_c2",
                self.c2.to_string(),
            ));
        }
        if self.rho <= 0.0 || self.rho >= 1.0 {
            return Err(OptimizerError::invalid_configuration(
                "Backtracking factor rho must be in (0, 1)",
                "rho",
                self.rho.to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(OptimizerError::invalid_configuration(
                "Maximum line search iterations must be at least 1",
                "max_line_search_iterations",
                "0",
            ));
        }
        Ok(())
    }
}

/// Outcome of a line search.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSearchResult {
    /// Last step size tried (the accepted one on success)
    pub step_size: Real,
    /// Objective value at the accepted point
    pub new_value: Real,
    /// Number of trials evaluated
    pub function_evals: usize,
    /// True if a step satisfying sufficient decrease was found
    pub success: bool,
}

/// Backtracking search from value `f0`.
///
/// `trial(α)` moves to x(α) and returns `(f(x(α)), ⟨∇f(x), x(α) − x⟩)`, or
/// `None` if the function cannot be evaluated there.
pub fn backtracking<F>(mut trial: F, f0: Real, params: &LineSearchParams) -> LineSearchResult
where
    F: FnMut(Real) -> Option<(Real, Real)>,
{
    let mut alpha = params.initial_step_size;
    let mut evals = 0;

    while evals < params.max_iterations && alpha >= params.min_step_size {
        evals += 1;
        if let Some((value, slope)) = trial(alpha) {
            if value.is_finite() && value <= f0 + params.c1 * slope {
                return LineSearchResult {
                    step_size: alpha,
                    new_value: value,
                    function_evals: evals,
                    success: true,
                };
            }
        }
        alpha *= params.rho;
    }

    LineSearchResult {
        step_size: alpha,
        new_value: f0,
        function_evals: evals,
        success: false,
    }
}

/// Weak Wolfe search along a ray, from value `f0` and slope `slope0 = φ'(0) < 0`.
///
/// `trial(α)` returns `(φ(α), φ'(α))`, or `None` if the function cannot be
/// evaluated there (treated as too long a step).
pub fn weak_wolfe<F>(mut trial: F, f0: Real, slope0: Real, params: &LineSearchParams) -> LineSearchResult
where
    F: FnMut(Real) -> Option<(Real, Real)>,
{
    let mut lo = 0.0;
    let mut hi = Real::INFINITY;
    let mut alpha = params.initial_step_size;
    let mut evals = 0;

    while evals < params.max_iterations && alpha >= params.min_step_size {
        evals += 1;
        match trial(alpha) {
            Some((value, _)) if !value.is_finite() || value > f0 + params.c1 * alpha * slope0 => {
                hi = alpha;
            }
            None => hi = alpha,
            Some((_, slope)) if slope < params.c2 * slope0 => lo = alpha,
            Some((value, _)) => {
                return LineSearchResult {
                    step_size: alpha,
                    new_value: value,
                    function_evals: evals,
                    success: true,
                };
            }
        }
        alpha = if hi.is_finite() {
            0.5 * (lo + hi)
        } else {
            2.0 * lo
        };
    }

    LineSearchResult {
        step_size: alpha,
        new_value: f0,
        function_evals: evals,
        success: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_full_step_accepted_on_quadratic() {
        // f(x) = x², x = 1, d = -1: the unit step lands on the minimum.
        let result = backtracking(
            |alpha| {
                let x = 1.0 - alpha;
                Some((x * x, alpha * 2.0 * -1.0))
            },
            1.0,
            &LineSearchParams::default(),
        );
        assert!(result.success);
        assert_relative_eq!(result.step_size, 1.0);
        assert_relative_eq!(result.new_value, 0.0);
        assert_eq!(result.function_evals, 1);
    }

    #[test]
    fn test_backtracks_on_overshoot() {
        // d = -10 overshoots badly; the search must shrink.
        let result = backtracking(
            |alpha| {
                let x = 1.0 - 10.0 * alpha;
                Some((x * x, alpha * 2.0 * -10.0))
            },
            1.0,
            &LineSearchParams::default(),
        );
        assert!(result.success);
        assert!(result.step_size < 1.0);
        assert!(result.new_value < 1.0);
    }

    #[test]
    fn test_failed_evaluations_are_retried() {
        let result = backtracking(
            |alpha| (alpha < 0.3).then(|| (1.0 - alpha, -alpha)),
            1.0,
            &LineSearchParams::default(),
        );
        assert!(result.success);
        assert_relative_eq!(result.step_size, 0.25);
        assert_eq!(result.function_evals, 3);
    }

    #[test]
    fn test_gives_up_on_ascent() {
        let params = LineSearchParams {
            max_iterations: 5,
            ..LineSearchParams::default()
        };
        let result = backtracking(|alpha| Some((1.0 + alpha, alpha)), 1.0, &params);
        assert!(!result.success);
        assert_eq!(result.function_evals, 5);
    }

    #[test]
    fn test_weak_wolfe_extends_short_steps() {
        // f(x) = (x - 100)², x = 0, d = 1: a unit step is far too short.
        let params = LineSearchParams::default();
        let result = weak_wolfe(
            |alpha| {
                let x: Real = alpha;
                Some(((x - 100.0).powi(2), 2.0 * (x - 100.0)))
            },
            10_000.0,
            -200.0,
            &params,
        );
        assert!(result.success);
        assert_relative_eq!(result.step_size, 16.0);
        assert_eq!(result.function_evals, 5);
    }

    #[test]
    fn test_weak_wolfe_bisects_overshoot() {
        // f(x) = x², x = 1, d = -10: bracket then bisect.
        let result = weak_wolfe(
            |alpha| {
                let x = 1.0 - 10.0 * alpha;
                Some((x * x, -10.0 * 2.0 * x))
            },
            1.0,
            -20.0,
            &LineSearchParams::default(),
        );
        assert!(result.success);
        assert!(result.step_size < 1.0);
        assert!(result.new_value < 1.0);
    }

    #[test]
    fn test_validate() {
        assert!(LineSearchParams::default().validate().is_ok());
        let bad = LineSearchParams {
            c1: 1.5,
            ..LineSearchParams::default()
        };
        assert!(bad.validate().is_err());
        let bad = LineSearchParams {
            c2: 1e-5,
            ..LineSearchParams::default()
        };
        assert!(bad.validate().is_err());
        let bad = LineSearchParams {
            rho: 0.0,
            ..LineSearchParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
