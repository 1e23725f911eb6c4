//! Sequential quadratic programming backend (`Algorithm::CFSQP`).
//!
//! Optional: the engine is compiled only with the `sqp` feature. Without it
//! [`CfsqpOptimizer::new`] reports `BackendUnavailable`, which lets
//! automatic selection fall back to another backend.
//!
//! Each iteration linearizes the constraints at `x` and solves
//!
//! ```text
//! min  ½ dᵀ B d + ∇f(x)ᵀ d
//! s.t. c_E(x) + J_E(x) d  = 0
//!      c_I(x) + J_I(x) d ≥ 0
//!      l − x ≤ d ≤ u − x
//! ```
//!
//! with the Goldfarb–Idnani dual active-set method, then backtracks along `d`
//! on the ℓ1 merit function `f(x) + σ (Σ |c_E| + Σ max(0, −c_I))`. `B` is a
//! damped BFGS approximation of the Lagrangian Hessian, or the Hessian
//! reported by the Hessian callback (shifted until positive definite) when
//! `hessian_approximation` is `"exact"`.
//!
//! # Advanced options
//!
//! | key | kind | default |
//! |---|---|---|
//! | `merit_penalty` | real | 1.0 |
//! | `max_qp_iterations` | int | 1000 |
//! | `hessian_approximation` | str | `"bfgs"` |

#[cfg(feature = "sqp")]
mod engine;

#[cfg(feature = "sqp")]
pub use engine::{solve, solve_qp, HessianMode, QpFailure, SqpSettings};

use polyopt_core::algorithm::Algorithm;
use polyopt_core::backend::{OptimizerRep, RepCore};
use polyopt_core::config::{OptionKind, OptionSpec};
use polyopt_core::error::{OptimizerError, OptimizerResult};
use polyopt_core::system::OptimizerSystem;
use polyopt_core::types::{Real, Vector};

/// Whether the SQP backend is linked into this build.
pub const AVAILABLE: bool = cfg!(feature = "sqp");

static OPTIONS: [OptionSpec; 3] = [
    OptionSpec::new("merit_penalty", OptionKind::Real),
    OptionSpec::new("max_qp_iterations", OptionKind::Int),
    OptionSpec::new("hessian_approximation", OptionKind::Str),
];

/// SQP backend, registered as [`Algorithm::CFSQP`].
#[derive(Debug)]
pub struct CfsqpOptimizer<'a> {
    core: RepCore<'a>,
}

impl<'a> CfsqpOptimizer<'a> {
    /// Binds the backend to `system`. Any problem shape is accepted.
    #[cfg(feature = "sqp")]
    pub fn new(system: &'a OptimizerSystem) -> OptimizerResult<Self> {
        Ok(Self {
            core: RepCore::new(system, &OPTIONS),
        })
    }

    /// Always fails: this build carries no SQP engine.
    ///
    /// # Errors
    ///
    /// `BackendUnavailable`, so that selection falls back to another backend.
    #[cfg(not(feature = "sqp"))]
    pub fn new(_system: &'a OptimizerSystem) -> OptimizerResult<Self> {
        Err(unavailable())
    }

    /// Advanced options recognized by this backend.
    pub fn recognized_options() -> &'static [OptionSpec] {
        &OPTIONS
    }

    #[cfg(feature = "sqp")]
    fn settings(&self) -> OptimizerResult<SqpSettings> {
        use crate::usize_option;
        use polyopt_core::optimization::LineSearchParams;

        let config = self.core.config();
        config.validate()?;
        let advanced = self.core.advanced();

        let hessian = match advanced.str_or("hessian_approximation", "bfgs") {
            "bfgs" => HessianMode::Bfgs,
            "exact" => HessianMode::Exact,
            other => {
                return Err(OptimizerError::invalid_configuration(
                    "Hessian approximation must be \"bfgs\" or \"exact\"",
                    "hessian_approximation",
                    other,
                ))
            }
        };
        if hessian == HessianMode::Exact && self.core.callbacks().hessian.is_none() {
            return Err(OptimizerError::invalid_configuration(
                "Exact Hessian requested but no Hessian function is registered",
                "hessian_approximation",
                "exact",
            ));
        }

        let merit_penalty = advanced.real_or("merit_penalty", 1.0);
        if !(merit_penalty > 0.0) {
            return Err(OptimizerError::invalid_configuration(
                "Merit penalty must be positive",
                "merit_penalty",
                merit_penalty.to_string(),
            ));
        }

        Ok(SqpSettings {
            tolerance: config.convergence_tolerance,
            max_iterations: config.max_iterations,
            merit_penalty,
            max_qp_iterations: usize_option(advanced, "max_qp_iterations", 1000)?,
            hessian,
            line_search: LineSearchParams::default(),
            diagnostics_level: config.diagnostics_level,
        })
    }
}

#[cfg(not(feature = "sqp"))]
fn unavailable() -> OptimizerError {
    OptimizerError::backend_unavailable(Algorithm::CFSQP, "built without the `sqp` feature")
}

impl<'a> OptimizerRep<'a> for CfsqpOptimizer<'a> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::CFSQP
    }

    fn core(&self) -> &RepCore<'a> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RepCore<'a> {
        &mut self.core
    }

    #[cfg(feature = "sqp")]
    fn optimize(&mut self, results: &mut Vector) -> OptimizerResult<Real> {
        use polyopt_core::adapter::AdapterBridge;

        self.core.check_results(results)?;
        let settings = self.settings()?;
        let system = self.core.system();
        let (lower, upper) = system.bounds_or_infinite();

        let bridge = AdapterBridge::new(&self.core);
        let report = solve(
            &bridge,
            system.num_equality_constraints(),
            results.as_mut_slice(),
            &lower,
            &upper,
            &settings,
        );

        crate::log_summary(&self.core, "CFSQP", &report);
        report.into_result(settings.tolerance, settings.max_iterations)
    }

    #[cfg(not(feature = "sqp"))]
    fn optimize(&mut self, _results: &mut Vector) -> OptimizerResult<Real> {
        Err(unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "sqp"))]
    #[test]
    fn test_unavailable_without_feature() {
        let sys = OptimizerSystem::new(1);
        assert!(matches!(
            CfsqpOptimizer::new(&sys),
            Err(OptimizerError::BackendUnavailable { .. })
        ));
    }

    #[cfg(feature = "sqp")]
    mod linked {
        use super::*;
        use approx::assert_relative_eq;
        use polyopt_core::test_problems::{
            rosenbrock, rosenbrock_gradient, shifted_quadratic, shifted_quadratic_gradient,
            shifted_quadratic_hessian, unit_sum_constraint, unit_sum_jacobian,
        };
        use polyopt_core::CALLBACK_SUCCESS;

        #[test]
        fn test_equality_constrained_quadratic() {
            // Closest point to (1, 2) on x₀ + x₁ = 1 is (0, 1).
            let sys = OptimizerSystem::new(2).with_constraints(1, 1).unwrap();
            let mut rep = CfsqpOptimizer::new(&sys).unwrap();
            rep.core_mut().callbacks_mut().set_objective(shifted_quadratic);
            rep.core_mut().callbacks_mut().set_gradient(shifted_quadratic_gradient);
            rep.core_mut().callbacks_mut().set_constraint(unit_sum_constraint);
            rep.core_mut().callbacks_mut().set_constraint_jacobian(unit_sum_jacobian);
            rep.set_convergence_tolerance(1e-6);

            let mut x = Vector::from_vec(vec![3.0, -1.0]);
            let f = rep.optimize(&mut x).unwrap();
            assert_relative_eq!(x[0], 0.0, epsilon = 1e-5);
            assert_relative_eq!(x[1], 1.0, epsilon = 1e-5);
            assert_relative_eq!(f, 2.0, epsilon = 1e-5);
        }

        #[test]
        fn test_inequality_and_bounds() {
            // Rosenbrock restricted to x₀ ≤ 0.5 and x₀ + x₁ − 1 ≥ 0.
            let sys = OptimizerSystem::new(2)
                .with_constraints(1, 0)
                .unwrap()
                .with_limits(
                    Vector::from_vec(vec![-2.0, -2.0]),
                    Vector::from_vec(vec![0.5, 2.0]),
                )
                .unwrap();
            let mut rep = CfsqpOptimizer::new(&sys).unwrap();
            rep.core_mut().callbacks_mut().set_objective(rosenbrock);
            rep.core_mut().callbacks_mut().set_gradient(rosenbrock_gradient);
            rep.core_mut().callbacks_mut().set_constraint(unit_sum_constraint);
            rep.set_convergence_tolerance(1e-6);

            let mut x = Vector::from_vec(vec![0.0, 1.5]);
            let f = rep.optimize(&mut x).unwrap();
            assert!(x[0] <= 0.5 + 1e-12);
            assert!(x[0] + x[1] - 1.0 >= -1e-6);
            // Both the limit on x₀ and the inequality are active at (0.5, 0.5).
            assert_relative_eq!(x[0], 0.5, epsilon = 1e-5);
            assert_relative_eq!(x[1], 0.5, epsilon = 1e-4);
            assert_relative_eq!(f, 6.5, epsilon = 1e-3);
        }

        #[test]
        fn test_feasible_start_on_degenerate_vertex() {
            // Starting at the solution, where the limit on x₀ and the
            // inequality are both active with nonzero multipliers.
            let sys = OptimizerSystem::new(2)
                .with_constraints(1, 0)
                .unwrap()
                .with_limits(
                    Vector::from_vec(vec![-2.0, -2.0]),
                    Vector::from_vec(vec![0.5, 2.0]),
                )
                .unwrap();
            let mut rep = CfsqpOptimizer::new(&sys).unwrap();
            rep.core_mut().callbacks_mut().set_objective(rosenbrock);
            rep.core_mut().callbacks_mut().set_gradient(rosenbrock_gradient);
            rep.core_mut().callbacks_mut().set_constraint(unit_sum_constraint);
            rep.set_convergence_tolerance(1e-6);

            let mut x = Vector::from_vec(vec![0.5, 0.5]);
            let f = rep.optimize(&mut x).unwrap();
            assert_relative_eq!(x, Vector::from_vec(vec![0.5, 0.5]), epsilon = 1e-6);
            assert_relative_eq!(f, 6.5, epsilon = 1e-6);
        }

        #[test]
        fn test_exact_hessian_mode() {
            let sys = OptimizerSystem::new(3);
            let mut rep = CfsqpOptimizer::new(&sys).unwrap();
            rep.core_mut().callbacks_mut().set_objective(shifted_quadratic);
            rep.core_mut().callbacks_mut().set_gradient(shifted_quadratic_gradient);
            assert!(rep.set_advanced_str_option("hessian_approximation", "exact"));
            assert!(matches!(
                rep.optimize(&mut Vector::zeros(3)),
                Err(OptimizerError::InvalidConfiguration { .. })
            ));

            rep.core_mut().callbacks_mut().set_hessian(shifted_quadratic_hessian);
            let mut x = Vector::zeros(3);
            let f = rep.optimize(&mut x).unwrap();
            assert_relative_eq!(f, 0.0, epsilon = 1e-12);
            assert_relative_eq!(x, Vector::from_vec(vec![1.0, 2.0, 3.0]), epsilon = 1e-10);
        }

        #[test]
        fn test_unknown_hessian_approximation() {
            let sys = OptimizerSystem::new(1);
            let mut rep = CfsqpOptimizer::new(&sys).unwrap();
            rep.core_mut().callbacks_mut().set_objective(|_, x, _, f| {
                *f = x[0] * x[0];
                CALLBACK_SUCCESS
            });
            assert!(rep.set_advanced_str_option("hessian_approximation", "sr1"));
            assert!(rep.optimize(&mut Vector::zeros(1)).is_err());
        }
    }
}
