//! Bound-constrained L-BFGS-B backend.
//!
//! Projected limited-memory BFGS: variables on a bound with the gradient
//! pointing outward are frozen for the iteration, the quasi-Newton direction
//! is computed over the free variables, and the Armijo search runs along the
//! projected path `P(x + α d)`. Converges when the projected gradient
//! `‖P(x − ∇f) − x‖∞` drops below the tolerance.
//!
//! Problems without limits are accepted and solved as unbounded.
//!
//! # Advanced options
//!
//! | key | kind | default |
//! |---|---|---|
//! | `line_search_c1` | real | 1e-4 |
//! | `max_line_search_iterations` | int | 40 |
//! | `curvature_epsilon` | real | 1e-10 |

use crate::quasi_newton::{
    minimize, Bounds, Convergence, NativeObjective, QuasiNewtonSettings, StepRule,
};
use crate::{log_summary, usize_option};
use polyopt_core::adapter::AdapterBridge;
use polyopt_core::algorithm::Algorithm;
use polyopt_core::backend::{OptimizerRep, RepCore};
use polyopt_core::config::{OptionKind, OptionSpec};
use polyopt_core::error::{OptimizerError, OptimizerResult};
use polyopt_core::system::OptimizerSystem;
use polyopt_core::types::{Real, Vector};

static OPTIONS: [OptionSpec; 3] = [
    OptionSpec::new("line_search_c1", OptionKind::Real),
    OptionSpec::new("max_line_search_iterations", OptionKind::Int),
    OptionSpec::new("curvature_epsilon", OptionKind::Real),
];

/// L-BFGS-B backend.
#[derive(Debug)]
pub struct LBFGSBOptimizer<'a> {
    core: RepCore<'a>,
}

impl<'a> LBFGSBOptimizer<'a> {
    /// Binds the backend to `system`.
    ///
    /// # Errors
    ///
    /// `UnsupportedProblem` if the problem has general constraints.
    pub fn new(system: &'a OptimizerSystem) -> OptimizerResult<Self> {
        if system.num_constraints() > 0 {
            return Err(OptimizerError::unsupported_problem(
                Algorithm::LBFGSB,
                format!(
                    "problem has {} constraints, only parameter limits are supported",
                    system.num_constraints()
                ),
            ));
        }
        Ok(Self {
            core: RepCore::new(system, &OPTIONS),
        })
    }

    /// Advanced options recognized by this backend.
    pub fn recognized_options() -> &'static [OptionSpec] {
        &OPTIONS
    }

    fn settings(&self) -> OptimizerResult<QuasiNewtonSettings> {
        let config = self.core.config();
        config.validate()?;
        let advanced = self.core.advanced();

        let mut settings = QuasiNewtonSettings::from_config(config, "LBFGSB");
        settings.step_rule = StepRule::Armijo;
        settings.convergence = Convergence::ProjectedGradient;
        settings.curvature_epsilon = advanced.real_or("curvature_epsilon", settings.curvature_epsilon);
        if !(settings.curvature_epsilon >= 0.0) {
            return Err(OptimizerError::invalid_configuration(
                "Curvature threshold must be non-negative",
                "curvature_epsilon",
                settings.curvature_epsilon.to_string(),
            ));
        }
        let line_search = &mut settings.line_search;
        line_search.c1 = advanced.real_or("line_search_c1", line_search.c1);
        line_search.max_iterations =
            usize_option(advanced, "max_line_search_iterations", line_search.max_iterations)?;
        line_search.validate()?;
        Ok(settings)
    }
}

impl<'a> OptimizerRep<'a> for LBFGSBOptimizer<'a> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::LBFGSB
    }

    fn core(&self) -> &RepCore<'a> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RepCore<'a> {
        &mut self.core
    }

    fn optimize(&mut self, results: &mut Vector) -> OptimizerResult<Real> {
        self.core.check_results(results)?;
        let settings = self.settings()?;
        let (lower, upper) = self.core.system().bounds_or_infinite();

        let bridge = AdapterBridge::new(&self.core);
        let objective = NativeObjective::new(&bridge);
        let report = minimize(
            &objective,
            results.as_mut_slice(),
            Some(Bounds::new(&lower, &upper)),
            &settings,
        );

        log_summary(&self.core, "LBFGSB", &report);
        report.into_result(settings.tolerance, settings.max_iterations)
    }
}
