//! Error types for the optimizer front end.
//!
//! This module defines the error taxonomy shared by the façade, the backend
//! selection logic and the concrete backends. Callback failures never appear
//! here directly: the adapter layer converts them into the native failure
//! sentinel and each backend decides whether that becomes an error.

use thiserror::Error;

/// Errors that can occur while building or running an optimizer.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// An optional backend is not linked into this build.
    ///
    /// This is the only recoverable construction error: backend selection
    /// reacts to it by falling back to the shape-based default.
    #[error("Optimizer backend {algorithm} is not available: {reason}")]
    BackendUnavailable {
        /// Name of the requested algorithm
        algorithm: String,
        /// Why the backend cannot be constructed
        reason: String,
    },

    /// The backend cannot handle the shape of the problem.
    #[error("{algorithm} cannot solve this problem: {reason}")]
    UnsupportedProblem {
        /// Name of the algorithm that rejected the problem
        algorithm: String,
        /// Description of the unsupported feature
        reason: String,
    },

    /// Dimension mismatch between buffers.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Invalid problem descriptor or configuration value.
    #[error("Invalid optimizer configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// A callback reported failure where the backend cannot recover.
    #[error("Evaluation of the {callback} failed: {reason}")]
    EvaluationFailed {
        /// Which callback failed (objective, gradient, ...)
        callback: String,
        /// Context supplied by the backend
        reason: String,
    },

    /// Finite-difference estimation could not evaluate the function.
    #[error("Numerical differentiation failed: {reason}")]
    DifferentiationFailed {
        /// Description of the failure
        reason: String,
    },

    /// Line search failed to find an acceptable step.
    #[error("Line search failed: {reason}")]
    LineSearchFailed {
        /// Description of why the line search failed
        reason: String,
        /// Number of iterations attempted
        iterations: usize,
        /// Last step size tried
        last_step_size: f64,
        /// Function value at the starting point
        initial_value: f64,
    },

    /// Maximum number of iterations reached without convergence.
    #[error("Maximum iterations ({max_iterations}) reached without convergence")]
    MaxIterationsReached {
        /// Maximum number of iterations allowed
        max_iterations: usize,
        /// Final function value
        final_value: f64,
        /// Final optimality measure (gradient norm or KKT residual)
        final_gradient_norm: f64,
        /// Convergence tolerance that was not met
        tolerance: f64,
    },

    /// The backend terminated without finding a feasible point.
    #[error("Problem appears infeasible: constraint violation {violation:e} exceeds {tolerance:e}")]
    Infeasible {
        /// Final constraint violation (infinity norm)
        violation: f64,
        /// Feasibility tolerance
        tolerance: f64,
    },
}

impl OptimizerError {
    /// Create a BackendUnavailable error.
    pub fn backend_unavailable<S1, S2>(algorithm: S1, reason: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: Into<String>,
    {
        Self::BackendUnavailable {
            algorithm: algorithm.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedProblem error.
    pub fn unsupported_problem<S1, S2>(algorithm: S1, reason: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: Into<String>,
    {
        Self::UnsupportedProblem {
            algorithm: algorithm.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Create an EvaluationFailed error.
    pub fn evaluation_failed<S1, S2>(callback: S1, reason: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::EvaluationFailed {
            callback: callback.into(),
            reason: reason.into(),
        }
    }

    /// Create a DifferentiationFailed error.
    pub fn differentiation_failed<S: Into<String>>(reason: S) -> Self {
        Self::DifferentiationFailed {
            reason: reason.into(),
        }
    }

    /// Create a LineSearchFailed error with detailed context.
    pub fn line_search_failed<S: Into<String>>(
        reason: S,
        iterations: usize,
        last_step_size: f64,
        initial_value: f64,
    ) -> Self {
        Self::LineSearchFailed {
            reason: reason.into(),
            iterations,
            last_step_size,
            initial_value,
        }
    }

    /// Create a MaxIterationsReached error with convergence information.
    pub fn max_iterations_reached(
        max_iterations: usize,
        final_value: f64,
        final_gradient_norm: f64,
        tolerance: f64,
    ) -> Self {
        Self::MaxIterationsReached {
            max_iterations,
            final_value,
            final_gradient_norm,
            tolerance,
        }
    }

    /// Create an Infeasible error.
    pub fn infeasible(violation: f64, tolerance: f64) -> Self {
        Self::Infeasible {
            violation,
            tolerance,
        }
    }

    /// Whether backend selection may recover from this error by falling back.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}

/// Result type alias for optimizer operations.
pub type OptimizerResult<T> = std::result::Result<T, OptimizerError>;
