//! Unconstrained L-BFGS backend.
//!
//! Limited-memory BFGS with a weak Wolfe line search. The curvature condition
//! guarantees `⟨s, y⟩ > 0` on every accepted step, so correction pairs are
//! rarely skipped.
//!
//! The backend only accepts problems without constraints and without
//! parameter limits; [`LBFGSOptimizer::new`] rejects anything else.
//!
//! # Advanced options
//!
//! | key | kind | default |
//! |---|---|---|
//! | `line_search_c1` | real | 1e-4 |
//! | `line_search_c2` | real | 0.9 |
//! | `max_line_search_iterations` | int | 40 |
//! | `initial_step` | real | 1.0 |

use crate::quasi_newton::{minimize, Convergence, NativeObjective, QuasiNewtonSettings, StepRule};
use crate::{log_summary, usize_option};
use polyopt_core::adapter::AdapterBridge;
use polyopt_core::algorithm::Algorithm;
use polyopt_core::backend::{OptimizerRep, RepCore};
use polyopt_core::config::{OptionKind, OptionSpec};
use polyopt_core::error::{OptimizerError, OptimizerResult};
use polyopt_core::system::OptimizerSystem;
use polyopt_core::types::{Real, Vector};

static OPTIONS: [OptionSpec; 4] = [
    OptionSpec::new("line_search_c1", OptionKind::Real),
    OptionSpec::new("line_search_c2", OptionKind::Real),
    OptionSpec::new("max_line_search_iterations", OptionKind::Int),
    OptionSpec::new("initial_step", OptionKind::Real),
];

/// L-BFGS backend.
#[derive(Debug)]
pub struct LBFGSOptimizer<'a> {
    core: RepCore<'a>,
}

impl<'a> LBFGSOptimizer<'a> {
    /// Binds the backend to `system`.
    ///
    /// # Errors
    ///
    /// `UnsupportedProblem` if the problem has constraints or parameter limits.
    pub fn new(system: &'a OptimizerSystem) -> OptimizerResult<Self> {
        if system.num_constraints() > 0 {
            return Err(OptimizerError::unsupported_problem(
                Algorithm::LBFGS,
                format!("problem has {} constraints", system.num_constraints()),
            ));
        }
        if system.has_limits() {
            return Err(OptimizerError::unsupported_problem(
                Algorithm::LBFGS,
                "problem has parameter limits",
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

        let mut settings = QuasiNewtonSettings::from_config(config, "LBFGS");
        settings.step_rule = StepRule::WeakWolfe;
        settings.convergence = Convergence::RelativeGradient;
        let line_search = &mut settings.line_search;
        line_search.c1 = advanced.real_or("line_search_c1", line_search.c1);
        line_search.c2 = advanced.real_or("line_search_c2", line_search.c2);
        line_search.initial_step_size = advanced.real_or("initial_step", line_search.initial_step_size);
        line_search.max_iterations =
            usize_option(advanced, "max_line_search_iterations", line_search.max_iterations)?;
        line_search.validate()?;
        Ok(settings)
    }
}

impl<'a> OptimizerRep<'a> for LBFGSOptimizer<'a> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::LBFGS
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

        let bridge = AdapterBridge::new(&self.core);
        let objective = NativeObjective::new(&bridge);
        let report = minimize(&objective, results.as_mut_slice(), None, &settings);

        log_summary(&self.core, "LBFGS", &report);
        report.into_result(settings.tolerance, settings.max_iterations)
    }
}
