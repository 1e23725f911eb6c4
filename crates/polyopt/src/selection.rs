//! Backend selection.
//!
//! An explicit request is honored when the backend can be built. If the
//! backend is not linked into this build (`BackendUnavailable`), selection
//! falls through to the shape rule, the same way for every optional backend.
//! Any other construction error reaches the caller unchanged.

use log::warn;
use polyopt_core::algorithm::Algorithm;
use polyopt_core::backend::OptimizerRep;
use polyopt_core::error::OptimizerResult;
use polyopt_core::system::OptimizerSystem;
use polyopt_solvers::create_backend;

/// Backend the shape of `system` calls for.
///
/// Constraints take precedence over limits: any problem with `m > 0` goes to
/// the interior-point backend.
pub fn shape_rule(system: &OptimizerSystem) -> Algorithm {
    if system.num_constraints() > 0 {
        Algorithm::InteriorPoint
    } else if system.has_limits() {
        Algorithm::LBFGSB
    } else {
        Algorithm::LBFGS
    }
}

/// Builds the backend for `algorithm` bound to `system`.
///
/// # Errors
///
/// Construction errors of the explicitly requested backend, except
/// `BackendUnavailable`, which triggers the fallback.
pub fn select_backend<'a>(
    system: &'a OptimizerSystem,
    algorithm: Algorithm,
) -> OptimizerResult<Box<dyn OptimizerRep<'a> + 'a>> {
    if algorithm != Algorithm::BestAvailable {
        match create_backend(algorithm, system) {
            Err(err) if err.is_backend_unavailable() => {
                let fallback = shape_rule(system);
                warn!("{err}; falling back to {fallback}");
            }
            built => return built,
        }
    }
    create_backend(shape_rule(system), system)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyopt_core::error::OptimizerError;
    use polyopt_core::types::Vector;

    fn bounded(n: usize) -> OptimizerSystem {
        OptimizerSystem::new(n)
            .with_limits(Vector::from_element(n, -1.0), Vector::from_element(n, 1.0))
            .unwrap()
    }

    #[test]
    fn test_shape_rule() {
        assert_eq!(shape_rule(&OptimizerSystem::new(3)), Algorithm::LBFGS);
        assert_eq!(shape_rule(&bounded(3)), Algorithm::LBFGSB);
        assert_eq!(
            shape_rule(&OptimizerSystem::new(3).with_constraints(2, 1).unwrap()),
            Algorithm::InteriorPoint
        );
        assert_eq!(
            shape_rule(&bounded(3).with_constraints(1, 0).unwrap()),
            Algorithm::InteriorPoint
        );
    }

    #[test]
    fn test_explicit_request_honored() {
        let sys = bounded(2);
        let backend = select_backend(&sys, Algorithm::InteriorPoint).unwrap();
        assert_eq!(backend.algorithm(), Algorithm::InteriorPoint);
    }

    #[test]
    fn test_unsupported_shape_propagates() {
        let sys = OptimizerSystem::new(2).with_constraints(1, 1).unwrap();
        assert!(matches!(
            select_backend(&sys, Algorithm::LBFGS),
            Err(OptimizerError::UnsupportedProblem { .. })
        ));
    }

    #[cfg(not(feature = "sqp"))]
    #[test]
    fn test_unavailable_backend_falls_back() {
        let sys = bounded(2);
        let backend = select_backend(&sys, Algorithm::CFSQP).unwrap();
        assert_eq!(backend.algorithm(), Algorithm::LBFGSB);
    }

    #[cfg(feature = "sqp")]
    #[test]
    fn test_linked_backend_is_used() {
        let sys = bounded(2);
        let backend = select_backend(&sys, Algorithm::CFSQP).unwrap();
        assert_eq!(backend.algorithm(), Algorithm::CFSQP);
    }
}
