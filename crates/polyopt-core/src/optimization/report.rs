//! Outcome of a native solve loop.

use crate::error::{OptimizerError, OptimizerResult};
use crate::types::Real;
use std::time::Duration;

/// Why a solve loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The optimality measure dropped below the tolerance
    Converged,
    /// Iteration budget exhausted without convergence
    MaxIterations,
    /// No step satisfying sufficient decrease was found
    LineSearchFailed,
    /// A callback failed where the loop cannot recover (e.g. at the start point)
    EvaluationFailed(&'static str),
    /// Optimality reached for the penalized problem but constraints remain violated
    Infeasible,
}

/// Summary of a solve loop, from which `optimize` builds its result.
#[derive(Debug, Clone)]
pub struct SolveReport {
    /// Objective value at the final point
    pub value: Real,
    /// Final optimality measure (gradient norm, projected gradient or KKT residual)
    pub optimality: Real,
    /// Final constraint violation (infinity norm), zero when unconstrained
    pub constraint_violation: Real,
    /// Number of major iterations
    pub iterations: usize,
    /// Last step size the line search tried
    pub last_step_size: Real,
    /// Number of objective evaluations requested by the loop
    pub function_evaluations: usize,
    /// Number of gradient evaluations requested by the loop
    pub gradient_evaluations: usize,
    /// Wall-clock time
    pub duration: Duration,
    /// Why the loop stopped
    pub termination_reason: TerminationReason,
}

impl SolveReport {
    /// Creates a report with zeroed counters.
    pub fn new(termination_reason: TerminationReason) -> Self {
        Self {
            value: Real::NAN,
            optimality: Real::NAN,
            constraint_violation: 0.0,
            iterations: 0,
            last_step_size: 0.0,
            function_evaluations: 0,
            gradient_evaluations: 0,
            duration: Duration::ZERO,
            termination_reason,
        }
    }

    /// Whether the loop converged.
    pub fn converged(&self) -> bool {
        self.termination_reason == TerminationReason::Converged
    }

    /// Converts the report into the value `optimize` returns, or the error it raises.
    pub fn into_result(self, tolerance: Real, max_iterations: usize) -> OptimizerResult<Real> {
        match self.termination_reason {
            TerminationReason::Converged => Ok(self.value),
            TerminationReason::MaxIterations => Err(OptimizerError::max_iterations_reached(
                max_iterations,
                self.value,
                self.optimality,
                tolerance,
            )),
            TerminationReason::LineSearchFailed => Err(OptimizerError::line_search_failed(
                "no step satisfies the sufficient decrease condition",
                self.iterations,
                self.last_step_size,
                self.value,
            )),
            TerminationReason::EvaluationFailed(callback) => Err(OptimizerError::evaluation_failed(
                callback,
                format!("callback failed after {} iterations", self.iterations),
            )),
            TerminationReason::Infeasible => Err(OptimizerError::infeasible(
                self.constraint_violation,
                tolerance,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converged_report_yields_value() {
        let mut report = SolveReport::new(TerminationReason::Converged);
        report.value = 1.5;
        assert!(report.converged());
        assert_eq!(report.into_result(1e-6, 10).unwrap(), 1.5);
    }

    #[test]
    fn test_failures_map_to_errors() {
        let report = SolveReport::new(TerminationReason::MaxIterations);
        assert!(matches!(
            report.into_result(1e-6, 10),
            Err(OptimizerError::MaxIterationsReached {
                max_iterations: 10,
                ..
            })
        ));

        let report = SolveReport::new(TerminationReason::EvaluationFailed("objective"));
        let err = report.into_result(1e-6, 10).unwrap_err();
        assert!(err.to_string().contains("objective"));

        let mut report = SolveReport::new(TerminationReason::Infeasible);
        report.constraint_violation = 0.5;
        assert!(matches!(
            report.into_result(1e-6, 10),
            Err(OptimizerError::Infeasible { .. })
        ));

        let report = SolveReport::new(TerminationReason::LineSearchFailed);
        assert!(matches!(
            report.into_result(1e-6, 10),
            Err(OptimizerError::LineSearchFailed { .. })
        ));
    }
}
