//! The optimizer façade.
//!
//! [`Optimizer`] owns exactly one backend and forwards everything to it.
//! Rebinding to another problem or algorithm builds a new backend and drops
//! the old one; callbacks and settings do not carry over.

use crate::selection::select_backend;
use polyopt_core::algorithm::Algorithm;
use polyopt_core::backend::OptimizerRep;
use polyopt_core::config::{OptimizerConfig, OptionSpec};
use polyopt_core::error::OptimizerResult;
use polyopt_core::numerical::DifferentiationMethod;
use polyopt_core::system::OptimizerSystem;
use polyopt_core::types::{Matrix, MatrixViewMut, Real, Vector, VectorView, VectorViewMut};
use std::fmt;

/// One optimizer API over every backend.
///
/// The problem descriptor is borrowed for the optimizer's lifetime, as are
/// any non-`'static` captures of the registered callbacks.
///
/// # Example
///
/// ```rust
/// use polyopt::prelude::*;
///
/// let system = OptimizerSystem::new(2);
/// let mut optimizer = Optimizer::new(&system).unwrap();
/// assert_eq!(optimizer.algorithm(), Algorithm::LBFGS);
///
/// optimizer.register_objective(|_, x, _, f| {
///     *f = (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2);
///     CALLBACK_SUCCESS
/// });
/// optimizer.set_convergence_tolerance(1e-8);
///
/// let mut x = Vector::zeros(2);
/// let value = optimizer.optimize(&mut x).unwrap();
/// assert!((x[0] - 3.0).abs() < 1e-5 && (x[1] + 1.0).abs() < 1e-5);
/// assert!(value < 1e-9);
/// ```
pub struct Optimizer<'a> {
    rep: Box<dyn OptimizerRep<'a> + 'a>,
}

impl<'a> Optimizer<'a> {
    /// Binds the backend the shape of `system` calls for.
    pub fn new(system: &'a OptimizerSystem) -> OptimizerResult<Self> {
        Self::with_algorithm(system, Algorithm::BestAvailable)
    }

    /// Binds the backend for `algorithm`, falling back to the shape rule if
    /// that backend is not linked into this build.
    ///
    /// # Errors
    ///
    /// Construction errors of the requested backend other than
    /// `BackendUnavailable`, e.g. `UnsupportedProblem`.
    pub fn with_algorithm(system: &'a OptimizerSystem, algorithm: Algorithm) -> OptimizerResult<Self> {
        Ok(Self {
            rep: select_backend(system, algorithm)?,
        })
    }

    /// Replaces the backend with one bound to `system`.
    ///
    /// On error the current backend is kept.
    pub fn set_optimizer_system(
        &mut self,
        system: &'a OptimizerSystem,
        algorithm: Algorithm,
    ) -> OptimizerResult<()> {
        self.rep = select_backend(system, algorithm)?;
        Ok(())
    }

    /// Whether the backend of `algorithm` is linked into this build.
    ///
    /// Only concrete algorithms are reported; `BestAvailable` is not.
    pub fn is_algorithm_available(algorithm: Algorithm) -> bool {
        polyopt_solvers::is_available(algorithm)
    }

    /// Algorithm of the bound backend.
    pub fn algorithm(&self) -> Algorithm {
        self.rep.algorithm()
    }

    /// The problem descriptor.
    pub fn system(&self) -> &'a OptimizerSystem {
        self.rep.core().system()
    }

    /// Registers the objective.
    pub fn register_objective<F>(&mut self, f: F)
    where
        F: Fn(&OptimizerSystem, VectorView<'_>, bool, &mut Real) -> i32 + 'a,
    {
        self.rep.core_mut().callbacks_mut().set_objective(f);
    }

    /// Registers the objective gradient.
    pub fn register_gradient<F>(&mut self, f: F)
    where
        F: Fn(&OptimizerSystem, VectorView<'_>, bool, VectorViewMut<'_>) -> i32 + 'a,
    {
        self.rep.core_mut().callbacks_mut().set_gradient(f);
    }

    /// Registers the constraint function. Equality rows come first.
    pub fn register_constraint<F>(&mut self, f: F)
    where
        F: Fn(&OptimizerSystem, VectorView<'_>, bool, VectorViewMut<'_>) -> i32 + 'a,
    {
        self.rep.core_mut().callbacks_mut().set_constraint(f);
    }

    /// Registers the constraint Jacobian.
    pub fn register_constraint_jacobian<F>(&mut self, f: F)
    where
        F: Fn(&OptimizerSystem, VectorView<'_>, bool, &mut Matrix) -> i32 + 'a,
    {
        self.rep.core_mut().callbacks_mut().set_constraint_jacobian(f);
    }

    /// Registers the objective Hessian.
    pub fn register_hessian<F>(&mut self, f: F)
    where
        F: Fn(&OptimizerSystem, VectorView<'_>, bool, MatrixViewMut<'_>) -> i32 + 'a,
    {
        self.rep.core_mut().callbacks_mut().set_hessian(f);
    }

    /// Sets the convergence tolerance.
    pub fn set_convergence_tolerance(&mut self, tolerance: Real) {
        self.rep.set_convergence_tolerance(tolerance);
    }

    /// Sets the iteration budget.
    pub fn set_max_iterations(&mut self, iterations: usize) {
        self.rep.set_max_iterations(iterations);
    }

    /// Sets the limited-memory history size.
    pub fn set_limited_memory_history(&mut self, history: usize) {
        self.rep.set_limited_memory_history(history);
    }

    /// Sets the diagnostics level.
    pub fn set_diagnostics_level(&mut self, level: u32) {
        self.rep.set_diagnostics_level(level);
    }

    /// Estimates gradients numerically even if a gradient is registered.
    pub fn use_numerical_gradient(&mut self, flag: bool) {
        self.rep.use_numerical_gradient(flag);
    }

    /// Estimates the Jacobian numerically even if one is registered.
    pub fn use_numerical_jacobian(&mut self, flag: bool) {
        self.rep.use_numerical_jacobian(flag);
    }

    /// Selects the finite-difference scheme.
    pub fn set_differentiator_method(&mut self, method: DifferentiationMethod) {
        self.rep.set_differentiator_method(method);
    }

    /// Replaces all common settings at once.
    pub fn apply_config(&mut self, config: &OptimizerConfig) {
        self.rep.core_mut().set_config(config.clone());
    }

    /// Current common settings.
    pub fn config(&self) -> &OptimizerConfig {
        self.rep.core().config()
    }

    /// Advanced options the bound backend recognizes.
    pub fn recognized_options(&self) -> &'static [OptionSpec] {
        self.rep.core().advanced().recognized()
    }

    /// Sets a string option; `false` if the backend does not recognize it.
    pub fn set_advanced_str_option(&mut self, key: &str, value: &str) -> bool {
        self.rep.set_advanced_str_option(key, value)
    }

    /// Sets a real option; `false` if the backend does not recognize it.
    pub fn set_advanced_real_option(&mut self, key: &str, value: Real) -> bool {
        self.rep.set_advanced_real_option(key, value)
    }

    /// Sets an integer option; `false` if the backend does not recognize it.
    pub fn set_advanced_int_option(&mut self, key: &str, value: i64) -> bool {
        self.rep.set_advanced_int_option(key, value)
    }

    /// Sets a boolean option; `false` if the backend does not recognize it.
    pub fn set_advanced_bool_option(&mut self, key: &str, value: bool) -> bool {
        self.rep.set_advanced_bool_option(key, value)
    }

    /// Minimizes from the point in `results` and leaves the solution there.
    ///
    /// Returns the objective value at the solution.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `results` does not hold n values, otherwise
    /// whatever the backend reports (non-convergence, failed evaluations,
    /// infeasibility, invalid advanced options).
    pub fn optimize(&mut self, results: &mut Vector) -> OptimizerResult<Real> {
        self.rep.optimize(results)
    }
}

impl fmt::Debug for Optimizer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Optimizer")
            .field("algorithm", &self.algorithm())
            .field("core", self.rep.core())
            .finish()
    }
}
