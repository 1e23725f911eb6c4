//! Common backend settings.
//!
//! Every backend understands the same scalar settings: convergence tolerance,
//! iteration budget, limited-memory history, diagnostics level and the two
//! numerical-differentiation switches. Backend-specific knobs live in
//! [`AdvancedOptions`](super::AdvancedOptions) instead.

use crate::error::{OptimizerError, OptimizerResult};
use crate::numerical::DifferentiationMethod;
use crate::types::{constants, Real};

/// Settings shared by every backend.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizerConfig {
    /// Convergence tolerance on the backend's optimality measure.
    pub convergence_tolerance: Real,
    /// Maximum number of major iterations.
    pub max_iterations: usize,
    /// Number of correction pairs kept by limited-memory updates.
    pub limited_memory_history: usize,
    /// 0 is silent; higher levels emit more `log` records.
    pub diagnostics_level: u32,
    /// Estimate gradients by finite differences even if a gradient is registered.
    pub numerical_gradient: bool,
    /// Estimate the constraint Jacobian by finite differences even if one is registered.
    pub numerical_jacobian: bool,
    /// Finite-difference scheme used by both differentiators.
    pub differentiation_method: DifferentiationMethod,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            convergence_tolerance: constants::DEFAULT_TOLERANCE,
            max_iterations: constants::DEFAULT_MAX_ITERATIONS,
            limited_memory_history: constants::DEFAULT_LIMITED_MEMORY_HISTORY,
            diagnostics_level: 0,
            numerical_gradient: false,
            numerical_jacobian: false,
            differentiation_method: DifferentiationMethod::Forward,
        }
    }
}

impl OptimizerConfig {
    /// Starts a builder from the default settings.
    pub fn builder() -> OptimizerConfigBuilder {
        OptimizerConfigBuilder::new()
    }

    /// Checks the settings a solve loop cannot run with.
    ///
    /// Setters store values verbatim, so backends call this when `optimize` starts.
    pub fn validate(&self) -> OptimizerResult<()> {
        if !(self.convergence_tolerance > 0.0 && self.convergence_tolerance.is_finite()) {
            return Err(OptimizerError::invalid_configuration(
                "Convergence tolerance must be positive and finite",
                "convergence_tolerance",
                self.convergence_tolerance.to_string(),
            ));
        }
        if self.limited_memory_history == 0 {
            return Err(OptimizerError::invalid_configuration(
                "Limited-memory history must keep at least one pair",
                "limited_memory_history",
                "0",
            ));
        }
        Ok(())
    }
}

/// Builder for creating a custom [`OptimizerConfig`].
#[derive(Debug, Clone, Default)]
pub struct OptimizerConfigBuilder {
    config: OptimizerConfig,
}

impl OptimizerConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the convergence tolerance.
    pub fn convergence_tolerance(mut self, tolerance: Real) -> Self {
        self.config.convergence_tolerance = tolerance;
        self
    }

    /// Set the iteration budget.
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.config.max_iterations = iterations;
        self
    }

    /// Set the limited-memory history size.
    pub fn limited_memory_history(mut self, history: usize) -> Self {
        self.config.limited_memory_history = history;
        self
    }

    /// Set the diagnostics level.
    pub fn diagnostics_level(mut self, level: u32) -> Self {
        self.config.diagnostics_level = level;
        self
    }

    /// Enable or disable numerical gradients.
    pub fn numerical_gradient(mut self, flag: bool) -> Self {
        self.config.numerical_gradient = flag;
        self
    }

    /// Enable or disable numerical Jacobians.
    pub fn numerical_jacobian(mut self, flag: bool) -> Self {
        self.config.numerical_jacobian = flag;
        self
    }

    /// Choose the finite-difference scheme.
    pub fn differentiation_method(mut self, method: DifferentiationMethod) -> Self {
        self.config.differentiation_method = method;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> OptimizerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = OptimizerConfig::default();
        assert_eq!(config.convergence_tolerance, 1e-4);
        assert_eq!(config.max_iterations, 1000);
        assert_eq!(config.limited_memory_history, 50);
        assert_eq!(config.diagnostics_level, 0);
        assert!(!config.numerical_gradient);
        assert!(!config.numerical_jacobian);
    }

    #[test]
    fn test_builder() {
        let config = OptimizerConfig::builder()
            .convergence_tolerance(1e-8)
            .max_iterations(20)
            .limited_memory_history(7)
            .diagnostics_level(2)
            .numerical_gradient(true)
            .numerical_jacobian(true)
            .differentiation_method(DifferentiationMethod::Central)
            .build();

        assert_eq!(
            config,
            OptimizerConfig {
                convergence_tolerance: 1e-8,
                max_iterations: 20,
                limited_memory_history: 7,
                diagnostics_level: 2,
                numerical_gradient: true,
                numerical_jacobian: true,
                differentiation_method: DifferentiationMethod::Central,
            }
        );
    }

    #[test]
    fn test_validate() {
        assert!(OptimizerConfig::default().validate().is_ok());
        let bad = OptimizerConfig::builder().convergence_tolerance(-1.0).build();
        assert!(matches!(
            bad.validate(),
            Err(OptimizerError::InvalidConfiguration { .. })
        ));
        let bad = OptimizerConfig::builder().limited_memory_history(0).build();
        assert!(bad.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let config = OptimizerConfig::builder().max_iterations(5).build();
        let json = serde_json::to_string(&config).unwrap();
        let back: OptimizerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
