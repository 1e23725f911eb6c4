//! Backend interface contract.
//!
//! A backend is one concrete optimization algorithm. All backends share the
//! same state, gathered in [`RepCore`]: a borrowed problem descriptor, the
//! five callback slots, the common settings, the backend's advanced options
//! and two finite-difference estimators (one for gradients, one for
//! Jacobians). [`OptimizerRep`] adds the algorithm-specific part, which is
//! essentially `optimize`.
//!
//! The option setters are provided methods so that every backend forwards
//! them the same way. They store values verbatim; the backend interprets them
//! when `optimize` runs.

use crate::algorithm::Algorithm;
use crate::callbacks::CallbackSlots;
use crate::config::{AdvancedOptions, OptimizerConfig, OptionSpec, OptionValue};
use crate::error::{OptimizerError, OptimizerResult};
use crate::numerical::{DifferentiationMethod, Differentiator};
use crate::system::OptimizerSystem;
use crate::types::{Real, Vector};

/// State shared by every backend.
#[derive(Debug)]
pub struct RepCore<'a> {
    system: &'a OptimizerSystem,
    callbacks: CallbackSlots<'a>,
    config: OptimizerConfig,
    advanced: AdvancedOptions,
    grad_diff: Differentiator,
    jac_diff: Differentiator,
}

impl<'a> RepCore<'a> {
    /// Creates the shared state for a backend recognizing `recognized` advanced options.
    pub fn new(system: &'a OptimizerSystem, recognized: &'static [OptionSpec]) -> Self {
        let config = OptimizerConfig::default();
        Self {
            system,
            callbacks: CallbackSlots::default(),
            advanced: AdvancedOptions::new(recognized),
            grad_diff: Differentiator::new(config.differentiation_method),
            jac_diff: Differentiator::new(config.differentiation_method),
            config,
        }
    }

    /// The problem descriptor.
    pub fn system(&self) -> &'a OptimizerSystem {
        self.system
    }

    /// Registered callbacks.
    pub fn callbacks(&self) -> &CallbackSlots<'a> {
        &self.callbacks
    }

    /// Registered callbacks, for registration.
    pub fn callbacks_mut(&mut self) -> &mut CallbackSlots<'a> {
        &mut self.callbacks
    }

    /// Common settings.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Replaces the common settings wholesale.
    pub fn set_config(&mut self, config: OptimizerConfig) {
        self.grad_diff.set_method(config.differentiation_method);
        self.jac_diff.set_method(config.differentiation_method);
        self.config = config;
    }

    /// Advanced options accepted so far.
    pub fn advanced(&self) -> &AdvancedOptions {
        &self.advanced
    }

    /// Gradient differentiator.
    pub fn gradient_differentiator(&self) -> &Differentiator {
        &self.grad_diff
    }

    /// Jacobian differentiator.
    pub fn jacobian_differentiator(&self) -> &Differentiator {
        &self.jac_diff
    }

    /// Whether gradients are estimated numerically, either on request or
    /// because no analytic gradient was registered.
    pub fn uses_numerical_gradient(&self) -> bool {
        self.config.numerical_gradient || self.callbacks.gradient.is_none()
    }

    /// Whether Jacobians are estimated numerically, either on request or
    /// because no analytic Jacobian was registered.
    pub fn uses_numerical_jacobian(&self) -> bool {
        self.config.numerical_jacobian || self.callbacks.constraint_jacobian.is_none()
    }

    /// Whether records at `level` should be emitted.
    pub fn diagnostics(&self, level: u32) -> bool {
        self.config.diagnostics_level >= level
    }

    /// Checks that the caller's buffer has room for n parameters.
    pub fn check_results(&self, results: &Vector) -> OptimizerResult<()> {
        let n = self.system.num_parameters();
        if results.len() == n {
            Ok(())
        } else {
            Err(OptimizerError::dimension_mismatch(n, results.len()))
        }
    }
}

/// Contract every concrete backend satisfies.
pub trait OptimizerRep<'a> {
    /// Algorithm implemented by this backend.
    fn algorithm(&self) -> Algorithm;

    /// Shared state.
    fn core(&self) -> &RepCore<'a>;

    /// Shared state, mutable.
    fn core_mut(&mut self) -> &mut RepCore<'a>;

    /// Runs the native solve loop from the point in `results`, leaves the
    /// solution there and returns the final objective value.
    fn optimize(&mut self, results: &mut Vector) -> OptimizerResult<Real>;

    /// Sets the convergence tolerance.
    fn set_convergence_tolerance(&mut self, tolerance: Real) {
        self.core_mut().config.convergence_tolerance = tolerance;
    }

    /// Sets the iteration budget.
    fn set_max_iterations(&mut self, iterations: usize) {
        self.core_mut().config.max_iterations = iterations;
    }

    /// Sets the limited-memory history size.
    fn set_limited_memory_history(&mut self, history: usize) {
        self.core_mut().config.limited_memory_history = history;
    }

    /// Sets the diagnostics level.
    fn set_diagnostics_level(&mut self, level: u32) {
        self.core_mut().config.diagnostics_level = level;
    }

    /// Forces (or stops forcing) numerical gradients.
    fn use_numerical_gradient(&mut self, flag: bool) {
        self.core_mut().config.numerical_gradient = flag;
    }

    /// Forces (or stops forcing) numerical Jacobians.
    fn use_numerical_jacobian(&mut self, flag: bool) {
        self.core_mut().config.numerical_jacobian = flag;
    }

    /// Selects the finite-difference scheme of both differentiators.
    fn set_differentiator_method(&mut self, method: DifferentiationMethod) {
        let core = self.core_mut();
        core.config.differentiation_method = method;
        core.grad_diff.set_method(method);
        core.jac_diff.set_method(method);
    }

    /// Sets a string option; `false` if the backend does not recognize it.
    fn set_advanced_str_option(&mut self, key: &str, value: &str) -> bool {
        self.core_mut()
            .advanced
            .set(key, OptionValue::Str(value.to_owned()))
    }

    /// Sets a real option; `false` if the backend does not recognize it.
    fn set_advanced_real_option(&mut self, key: &str, value: Real) -> bool {
        self.core_mut().advanced.set(key, OptionValue::Real(value))
    }

    /// Sets an integer option; `false` if the backend does not recognize it.
    fn set_advanced_int_option(&mut self, key: &str, value: i64) -> bool {
        self.core_mut().advanced.set(key, OptionValue::Int(value))
    }

    /// Sets a boolean option; `false` if the backend does not recognize it.
    fn set_advanced_bool_option(&mut self, key: &str, value: bool) -> bool {
        self.core_mut().advanced.set(key, OptionValue::Bool(value))
    }
}
