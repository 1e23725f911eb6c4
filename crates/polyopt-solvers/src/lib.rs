//! PolyOpt Solvers - native solve loops behind the optimizer backends.
//!
//! Every backend in this crate implements [`OptimizerRep`] on top of the
//! shared [`RepCore`] and drives its engine through the
//! [`AdapterBridge`](polyopt_core::AdapterBridge), so engines only ever see
//! the native calling convention.
//!
//! # Available Backends
//!
//! - **InteriorPoint**: augmented-Lagrangian log-barrier method, any problem
//! - **LBFGS**: limited-memory BFGS, unconstrained problems without limits
//! - **LBFGSB**: projected limited-memory BFGS, parameter limits only
//! - **CFSQP**: sequential quadratic programming, any problem; linked only
//!   with the `sqp` feature
//!
//! # Examples
//!
//! ```rust
//! use polyopt_core::prelude::*;
//! use polyopt_solvers::LBFGSOptimizer;
//!
//! let system = OptimizerSystem::new(2);
//! let mut backend = LBFGSOptimizer::new(&system).unwrap();
//! backend.core_mut().callbacks_mut().set_objective(|_, x, _, f| {
//!     *f = (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2);
//!     CALLBACK_SUCCESS
//! });
//!
//! let mut x = Vector::zeros(2);
//! let value = backend.optimize(&mut x).unwrap();
//! assert!(value < 1e-6);
//! ```

pub mod interior_point;
pub mod lbfgs;
pub mod lbfgsb;
pub mod quasi_newton;
pub mod sqp;

// Re-export the backends for convenience
pub use interior_point::InteriorPointOptimizer;
pub use lbfgs::LBFGSOptimizer;
pub use lbfgsb::LBFGSBOptimizer;
pub use sqp::CfsqpOptimizer;

use log::info;
use polyopt_core::algorithm::Algorithm;
use polyopt_core::backend::{OptimizerRep, RepCore};
use polyopt_core::config::AdvancedOptions;
use polyopt_core::error::{OptimizerError, OptimizerResult};
use polyopt_core::optimization::SolveReport;
use polyopt_core::system::OptimizerSystem;

/// Whether the backend for `algorithm` is linked into this build.
///
/// `BestAvailable` names no backend of its own and is reported unavailable.
pub fn is_available(algorithm: Algorithm) -> bool {
    match algorithm {
        Algorithm::CFSQP => sqp::AVAILABLE,
        Algorithm::InteriorPoint | Algorithm::LBFGS | Algorithm::LBFGSB => true,
        Algorithm::BestAvailable => false,
    }
}

/// Constructs the concrete backend for `algorithm` bound to `system`.
///
/// # Errors
///
/// Whatever the backend constructor reports (`BackendUnavailable`,
/// `UnsupportedProblem`), or `InvalidConfiguration` for `BestAvailable`,
/// which names no concrete backend.
pub fn create_backend<'a>(
    algorithm: Algorithm,
    system: &'a OptimizerSystem,
) -> OptimizerResult<Box<dyn OptimizerRep<'a> + 'a>> {
    Ok(match algorithm {
        Algorithm::InteriorPoint => Box::new(InteriorPointOptimizer::new(system)?),
        Algorithm::LBFGS => Box::new(LBFGSOptimizer::new(system)?),
        Algorithm::LBFGSB => Box::new(LBFGSBOptimizer::new(system)?),
        Algorithm::CFSQP => Box::new(CfsqpOptimizer::new(system)?),
        Algorithm::BestAvailable => {
            return Err(OptimizerError::invalid_configuration(
                "BestAvailable must be resolved to a concrete backend",
                "algorithm",
                algorithm.name(),
            ))
        }
    })
}

/// Emits the end-of-solve summary when diagnostics are enabled.
pub(crate) fn log_summary(core: &RepCore<'_>, label: &str, report: &SolveReport) {
    if core.diagnostics(1) {
        info!(
            "{label}: {:?} after {} iterations in {:?}, f = {:.6e}, optimality = {:.3e}, violation = {:.3e}, {} function / {} gradient evaluations",
            report.termination_reason,
            report.iterations,
            report.duration,
            report.value,
            report.optimality,
            report.constraint_violation,
            report.function_evaluations,
            report.gradient_evaluations,
        );
    }
}

/// Reads a non-negative integer option.
pub(crate) fn usize_option(
    advanced: &AdvancedOptions,
    key: &'static str,
    default: usize,
) -> OptimizerResult<usize> {
    let value = advanced.int_or(key, i64::try_from(default).unwrap_or(i64::MAX));
    usize::try_from(value).map_err(|_| {
        OptimizerError::invalid_configuration("Option must be non-negative", key, value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyopt_core::config::{OptionKind, OptionSpec, OptionValue};

    #[test]
    fn test_availability() {
        assert!(!is_available(Algorithm::BestAvailable));
        assert!(is_available(Algorithm::InteriorPoint));
        assert!(is_available(Algorithm::LBFGS));
        assert!(is_available(Algorithm::LBFGSB));
        assert_eq!(is_available(Algorithm::CFSQP), cfg!(feature = "sqp"));
    }

    #[test]
    fn test_create_backend_reports_algorithm() {
        let sys = OptimizerSystem::new(2);
        for algorithm in [Algorithm::InteriorPoint, Algorithm::LBFGS, Algorithm::LBFGSB] {
            let backend = create_backend(algorithm, &sys).unwrap();
            assert_eq!(backend.algorithm(), algorithm);
        }
        assert!(create_backend(Algorithm::BestAvailable, &sys).is_err());
        assert_eq!(
            create_backend(Algorithm::CFSQP, &sys).is_ok(),
            is_available(Algorithm::CFSQP)
        );
    }

    #[test]
    fn test_usize_option() {
        static OPTIONS: [OptionSpec; 1] = [OptionSpec::new("sweeps", OptionKind::Int)];
        let mut advanced = AdvancedOptions::new(&OPTIONS);
        assert_eq!(usize_option(&advanced, "sweeps", 7).unwrap(), 7);
        assert!(advanced.set("sweeps", OptionValue::Int(12)));
        assert_eq!(usize_option(&advanced, "sweeps", 7).unwrap(), 12);
        assert!(advanced.set("sweeps", OptionValue::Int(-1)));
        assert!(matches!(
            usize_option(&advanced, "sweeps", 7),
            Err(OptimizerError::InvalidConfiguration { .. })
        ));
    }
}
