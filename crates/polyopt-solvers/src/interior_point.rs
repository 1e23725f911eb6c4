//! Interior-point backend for general constraints.
//!
//! A primal barrier method. Inequalities `c_I(x) ≥ 0` get slack variables
//! `s > 0` kept interior by a logarithmic barrier, and all residuals
//! `r = [c_E(x); c_I(x) − s]` are handled by an augmented Lagrangian:
//!
//! ```text
//! Φ(x, s) = f(x) − μ Σ log sⱼ + λᵀ r + (ρ/2) ‖r‖²
//! ```
//!
//! Each outer iteration minimizes Φ over `(x, s)` with the projected
//! limited-memory loop (parameter limits and `s ≥ ε` as bounds), then updates
//! the multipliers `λ ← λ + ρ r`, raises the penalty ρ when the residual did
//! not shrink enough and lowers the barrier parameter μ.
//!
//! Equality constraints are the first `m_eq` rows of the constraint vector,
//! inequalities the remaining rows. The Jacobian structure is queried once,
//! values on every gradient evaluation.
//!
//! # Advanced options
//!
//! | key | kind | default |
//! |---|---|---|
//! | `mu_init` | real | 0.1 |
//! | `mu_decrease` | real | 0.2 |
//! | `constraint_violation_tolerance` | real | 1e-6 |
//! | `penalty_init` | real | 10 |
//! | `max_outer_iterations` | int | 50 |
//! | `hessian_approximation` | str | `"limited-memory"` |

use crate::quasi_newton::{
    minimize, Bounds, Convergence, QuasiNewtonSettings, SmoothObjective, StepRule,
};
use crate::{log_summary, usize_option};
use log::debug;
use polyopt_core::adapter::AdapterBridge;
use polyopt_core::algorithm::Algorithm;
use polyopt_core::backend::{OptimizerRep, RepCore};
use polyopt_core::config::{OptionKind, OptionSpec};
use polyopt_core::error::{OptimizerError, OptimizerResult};
use polyopt_core::native::{objective_value, succeeded, Index, NativeProblem};
use polyopt_core::optimization::{SolveReport, TerminationReason};
use polyopt_core::system::OptimizerSystem;
use polyopt_core::types::{norm_inf, Real, Vector};
use std::time::Instant;

static OPTIONS: [OptionSpec; 6] = [
    OptionSpec::new("mu_init", OptionKind::Real),
    OptionSpec::new("mu_decrease", OptionKind::Real),
    OptionSpec::new("constraint_violation_tolerance", OptionKind::Real),
    OptionSpec::new("penalty_init", OptionKind::Real),
    OptionSpec::new("max_outer_iterations", OptionKind::Int),
    OptionSpec::new("hessian_approximation", OptionKind::Str),
];

/// Smallest slack value the inner loop may reach.
const SLACK_FLOOR: Real = 1e-12;

/// Smallest initial slack.
const SLACK_INIT: Real = 1e-2;

/// Upper limit of the penalty parameter.
const MAX_PENALTY: Real = 1e10;

/// Settings of the outer barrier loop.
#[derive(Debug, Clone)]
pub struct BarrierSettings {
    /// Settings of each inner minimization
    pub inner: QuasiNewtonSettings,
    /// Initial barrier parameter
    pub mu_init: Real,
    /// Factor applied to μ after each outer iteration
    pub mu_decrease: Real,
    /// Largest constraint violation accepted at convergence
    pub constraint_violation_tolerance: Real,
    /// Initial penalty parameter ρ
    pub penalty_init: Real,
    /// Outer iteration budget
    pub max_outer_iterations: usize,
}

/// Barrier-augmented Lagrangian over `(x, s)`.
struct BarrierProblem<'p, P: ?Sized> {
    problem: &'p P,
    n: usize,
    m: usize,
    m_eq: usize,
    rows: Vec<Index>,
    cols: Vec<Index>,
    mu: Real,
    rho: Real,
    lambda: Vec<Real>,
}

impl<'p, P: NativeProblem + ?Sized> BarrierProblem<'p, P> {
    /// Queries the Jacobian structure at `x`.
    fn new(problem: &'p P, m_eq: usize, x: &[Real], mu: Real, rho: Real) -> Option<Self> {
        let n = problem.num_parameters();
        let m = problem.num_constraints();
        let nele = if m == 0 { 0 } else { problem.jacobian_nonzeros() };
        let mut rows = vec![0; nele];
        let mut cols = vec![0; nele];
        if m > 0 {
            let status = problem.eval_jac_g(x, true, nele, Some(&mut rows), Some(&mut cols), None);
            let in_range = rows.iter().zip(&cols).all(|(&r, &c)| {
                usize::try_from(r).is_ok_and(|r| r < m) && usize::try_from(c).is_ok_and(|c| c < n)
            });
            if !succeeded(status) || !in_range {
                return None;
            }
        }
        Some(Self {
            problem,
            n,
            m,
            m_eq,
            rows,
            cols,
            mu,
            rho,
            lambda: vec![0.0; m],
        })
    }

    fn constraints(&self, x: &[Real], new_x: bool, c: &mut [Real]) -> bool {
        self.m == 0 || succeeded(self.problem.eval_g(x, new_x, c))
    }

    /// Residuals `[c_E; c_I − s]` from constraint values `c`, in place.
    fn residuals(&self, c: &mut [Real], s: &[Real]) {
        for (ci, si) in c[self.m_eq..].iter_mut().zip(s) {
            *ci -= si;
        }
    }

    /// Violation of the original constraints, infinity norm.
    fn violation(&self, c: &[Real]) -> Real {
        let equality = norm_inf(&c[..self.m_eq]);
        let inequality = c[self.m_eq..].iter().fold(0.0, |acc: Real, ci| acc.max(-ci));
        equality.max(inequality)
    }
}

impl<P: NativeProblem + ?Sized> SmoothObjective for BarrierProblem<'_, P> {
    fn dimension(&self) -> usize {
        self.n + self.m - self.m_eq
    }

    fn value(&self, z: &[Real], new_x: bool) -> Option<Real> {
        let (x, s) = z.split_at(self.n);
        if s.iter().any(|&si| !(si > 0.0)) {
            return None;
        }
        let f = objective_value(self.problem, x, new_x)?;
        let mut r = vec![0.0; self.m];
        if !self.constraints(x, false, &mut r) {
            return None;
        }
        self.residuals(&mut r, s);

        let barrier: Real = s.iter().map(|si| si.ln()).sum();
        let linear: Real = self.lambda.iter().zip(&r).map(|(l, ri)| l * ri).sum();
        let quadratic: Real = r.iter().map(|ri| ri * ri).sum();
        Some(f - self.mu * barrier + linear + 0.5 * self.rho * quadratic)
    }

    fn gradient(&self, z: &[Real], new_x: bool, gradient: &mut [Real]) -> bool {
        let (x, s) = z.split_at(self.n);
        let (grad_x, grad_s) = gradient.split_at_mut(self.n);
        if !succeeded(self.problem.eval_grad_f(x, new_x, grad_x)) {
            return false;
        }
        if self.m == 0 {
            return true;
        }

        let mut w = vec![0.0; self.m];
        if !self.constraints(x, false, &mut w) {
            return false;
        }
        self.residuals(&mut w, s);
        for (wi, li) in w.iter_mut().zip(&self.lambda) {
            *wi = li + self.rho * *wi;
        }

        let mut values = vec![0.0; self.rows.len()];
        let status = self
            .problem
            .eval_jac_g(x, false, values.len(), None, None, Some(&mut values));
        if !succeeded(status) {
            return false;
        }
        for ((&row, &col), value) in self.rows.iter().zip(&self.cols).zip(&values) {
            grad_x[col as usize] += value * w[row as usize];
        }
        for (gs, (si, wi)) in grad_s.iter_mut().zip(s.iter().zip(&w[self.m_eq..])) {
            *gs = -self.mu / si - wi;
        }
        true
    }
}

/// Barrier loop from `x`, leaving the last iterate in `x`.
pub fn solve<P>(
    problem: &P,
    m_eq: usize,
    x: &mut [Real],
    bounds: Bounds<'_>,
    settings: &BarrierSettings,
) -> SolveReport
where
    P: NativeProblem + ?Sized,
{
    let start = Instant::now();
    let mut report = run(problem, m_eq, x, bounds, settings);
    report.duration = start.elapsed();
    report
}

fn run<P>(
    problem: &P,
    m_eq: usize,
    x: &mut [Real],
    bounds: Bounds<'_>,
    settings: &BarrierSettings,
) -> SolveReport
where
    P: NativeProblem + ?Sized,
{
    let n = x.len();
    let m = problem.num_constraints();
    bounds.project(x);

    let mut c = vec![0.0; m];
    if m > 0 && !succeeded(problem.eval_g(x, true, &mut c)) {
        return SolveReport::new(TerminationReason::EvaluationFailed("constraint"));
    }
    let Some(mut barrier) =
        BarrierProblem::new(problem, m_eq, x, settings.mu_init, settings.penalty_init)
    else {
        return SolveReport::new(TerminationReason::EvaluationFailed("constraint Jacobian"));
    };

    let mut z = x.to_vec();
    z.extend(c[m_eq..].iter().map(|ci| ci.max(SLACK_INIT)));
    let (lower, upper) = bounds_with_slacks(bounds, m - m_eq);
    let z_bounds = Bounds::new(&lower, &upper);

    let mut report = SolveReport::new(TerminationReason::MaxIterations);
    let mut previous_residual = Real::INFINITY;
    let mut violation = Real::INFINITY;

    for outer in 1..=settings.max_outer_iterations {
        let inner_settings = QuasiNewtonSettings {
            tolerance: settings.inner.tolerance.max(barrier.mu),
            ..settings.inner.clone()
        };
        let inner = minimize(&barrier, &mut z, Some(z_bounds), &inner_settings);
        report.iterations += inner.iterations;
        report.function_evaluations += inner.function_evaluations;
        report.gradient_evaluations += inner.gradient_evaluations;
        report.optimality = inner.optimality;
        report.last_step_size = inner.last_step_size;
        if let TerminationReason::EvaluationFailed(_) = inner.termination_reason {
            report.termination_reason = inner.termination_reason;
            break;
        }

        let (xz, s) = z.split_at(n);
        if !barrier.constraints(xz, true, &mut c) {
            report.termination_reason = TerminationReason::EvaluationFailed("constraint");
            break;
        }
        violation = barrier.violation(&c);
        barrier.residuals(&mut c, s);
        let residual = norm_inf(&c);

        for (li, ri) in barrier.lambda.iter_mut().zip(&c) {
            *li += barrier.rho * ri;
        }
        if residual > 0.25 * previous_residual {
            barrier.rho = (barrier.rho * 10.0).min(MAX_PENALTY);
        }
        previous_residual = residual;

        if settings.inner.diagnostics_level >= 2 {
            debug!(
                "InteriorPoint: outer {outer}, mu = {:.3e}, rho = {:.3e}, violation = {violation:.3e}, inner {:?} after {} iterations",
                barrier.mu, barrier.rho, inner.termination_reason, inner.iterations
            );
        }

        if violation <= settings.constraint_violation_tolerance
            && barrier.mu <= settings.inner.tolerance
            && inner.converged()
        {
            report.termination_reason = TerminationReason::Converged;
            break;
        }
        barrier.mu *= settings.mu_decrease;
    }

    x.copy_from_slice(&z[..n]);
    report.constraint_violation = violation;
    if report.termination_reason == TerminationReason::MaxIterations
        && violation > settings.constraint_violation_tolerance
    {
        report.termination_reason = TerminationReason::Infeasible;
    }
    match objective_value(problem, x, true) {
        Some(f) => report.value = f,
        None if !matches!(report.termination_reason, TerminationReason::EvaluationFailed(_)) => {
            report.termination_reason = TerminationReason::EvaluationFailed("objective");
        }
        None => {}
    }
    report
}

fn bounds_with_slacks(bounds: Bounds<'_>, slacks: usize) -> (Vec<Real>, Vec<Real>) {
    let (lower, upper) = bounds.as_slices();
    let mut lower = lower.to_vec();
    let mut upper = upper.to_vec();
    lower.extend(std::iter::repeat(SLACK_FLOOR).take(slacks));
    upper.extend(std::iter::repeat(Real::INFINITY).take(slacks));
    (lower, upper)
}

/// Interior-point backend.
#[derive(Debug)]
pub struct InteriorPointOptimizer<'a> {
    core: RepCore<'a>,
}

impl<'a> InteriorPointOptimizer<'a> {
    /// Binds the backend to `system`. Any problem shape is accepted.
    pub fn new(system: &'a OptimizerSystem) -> OptimizerResult<Self> {
        Ok(Self {
            core: RepCore::new(system, &OPTIONS),
        })
    }

    /// Advanced options recognized by this backend.
    pub fn recognized_options() -> &'static [OptionSpec] {
        &OPTIONS
    }

    fn settings(&self) -> OptimizerResult<BarrierSettings> {
        let config = self.core.config();
        config.validate()?;
        let advanced = self.core.advanced();

        let hessian = advanced.str_or("hessian_approximation", "limited-memory");
        if hessian != "limited-memory" {
            return Err(OptimizerError::invalid_configuration(
                "Only the limited-memory Hessian approximation is available",
                "hessian_approximation",
                hessian,
            ));
        }

        let mut inner = QuasiNewtonSettings::from_config(config, "InteriorPoint");
        inner.step_rule = StepRule::Armijo;
        inner.convergence = Convergence::ProjectedGradient;
        // Inner loops are logged through the outer loop only.
        inner.diagnostics_level = config.diagnostics_level.min(1);

        let settings = BarrierSettings {
            inner,
            mu_init: advanced.real_or("mu_init", 0.1),
            mu_decrease: advanced.real_or("mu_decrease", 0.2),
            constraint_violation_tolerance: advanced.real_or("constraint_violation_tolerance", 1e-6),
            penalty_init: advanced.real_or("penalty_init", 10.0),
            max_outer_iterations: usize_option(advanced, "max_outer_iterations", 50)?,
        };
        if !(settings.mu_init > 0.0) {
            return Err(OptimizerError::invalid_configuration(
                "Initial barrier parameter must be positive",
                "mu_init",
                settings.mu_init.to_string(),
            ));
        }
        if !(settings.mu_decrease > 0.0 && settings.mu_decrease < 1.0) {
            return Err(OptimizerError::invalid_configuration(
                "Barrier decrease factor must be in (0, 1)",
                "mu_decrease",
                settings.mu_decrease.to_string(),
            ));
        }
        if !(settings.penalty_init > 0.0) {
            return Err(OptimizerError::invalid_configuration(
                "Initial penalty must be positive",
                "penalty_init",
                settings.penalty_init.to_string(),
            ));
        }
        if !(settings.constraint_violation_tolerance > 0.0) {
            return Err(OptimizerError::invalid_configuration(
                "Constraint violation tolerance must be positive",
                "constraint_violation_tolerance",
                settings.constraint_violation_tolerance.to_string(),
            ));
        }
        Ok(settings)
    }
}

impl<'a> OptimizerRep<'a> for InteriorPointOptimizer<'a> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::InteriorPoint
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
        let system = self.core.system();
        let (lower, upper) = system.bounds_or_infinite();

        let bridge = AdapterBridge::new(&self.core);
        let report = solve(
            &bridge,
            system.num_equality_constraints(),
            results.as_mut_slice(),
            Bounds::new(&lower, &upper),
            &settings,
        );

        log_summary(&self.core, "InteriorPoint", &report);
        match report.termination_reason {
            TerminationReason::Infeasible => Err(OptimizerError::infeasible(
                report.constraint_violation,
                settings.constraint_violation_tolerance,
            )),
            _ => report.into_result(settings.inner.tolerance, settings.max_outer_iterations),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polyopt_core::test_problems::{unit_sum_constraint, unit_sum_jacobian};
    use polyopt_core::CALLBACK_SUCCESS;

    /// Registers ‖x − target‖² as the objective.
    fn set_distance_to(rep: &mut InteriorPointOptimizer<'_>, target: [Real; 2]) {
        rep.core_mut().callbacks_mut().set_objective(move |_, x, _, f| {
            *f = (x[0] - target[0]).powi(2) + (x[1] - target[1]).powi(2);
            CALLBACK_SUCCESS
        });
    }

    #[test]
    fn test_equality_constraint() {
        // Closest point to (2, 1) on x₀ + x₁ = 1 is (1, 0).
        let sys = OptimizerSystem::new(2).with_constraints(1, 1).unwrap();
        let mut rep = InteriorPointOptimizer::new(&sys).unwrap();
        set_distance_to(&mut rep, [2.0, 1.0]);
        rep.core_mut().callbacks_mut().set_constraint(unit_sum_constraint);
        rep.core_mut().callbacks_mut().set_constraint_jacobian(unit_sum_jacobian);

        let mut x = Vector::zeros(2);
        let f = rep.optimize(&mut x).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(x[1], 0.0, epsilon = 1e-3);
        assert_relative_eq!(f, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_inequality_constraint_is_active() {
        // Closest point to the origin with x₀ + x₁ − 1 ≥ 0 is (0.5, 0.5).
        let sys = OptimizerSystem::new(2).with_constraints(1, 0).unwrap();
        let mut rep = InteriorPointOptimizer::new(&sys).unwrap();
        set_distance_to(&mut rep, [0.0, 0.0]);
        rep.core_mut().callbacks_mut().set_constraint(unit_sum_constraint);

        let mut x = Vector::from_vec(vec![2.0, 2.0]);
        let f = rep.optimize(&mut x).unwrap();
        assert_relative_eq!(x[0], 0.5, epsilon = 1e-3);
        assert_relative_eq!(x[1], 0.5, epsilon = 1e-3);
        assert_relative_eq!(f, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_inactive_inequality_and_bounds() {
        // Minimum (2, 1) satisfies x₀ + x₁ ≥ 1 but x₁ ≤ 0.5 cuts it off.
        let sys = OptimizerSystem::new(2)
            .with_constraints(1, 0)
            .unwrap()
            .with_limits(
                Vector::from_vec(vec![-5.0, -5.0]),
                Vector::from_vec(vec![5.0, 0.5]),
            )
            .unwrap();
        let mut rep = InteriorPointOptimizer::new(&sys).unwrap();
        set_distance_to(&mut rep, [2.0, 1.0]);
        rep.core_mut().callbacks_mut().set_constraint(unit_sum_constraint);
        rep.core_mut().callbacks_mut().set_constraint_jacobian(unit_sum_jacobian);

        let mut x = Vector::zeros(2);
        rep.optimize(&mut x).unwrap();
        assert_relative_eq!(x[0], 2.0, epsilon = 1e-3);
        assert_relative_eq!(x[1], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_incompatible_equalities_are_infeasible() {
        let sys = OptimizerSystem::new(1).with_constraints(2, 2).unwrap();
        let mut rep = InteriorPointOptimizer::new(&sys).unwrap();
        rep.core_mut().callbacks_mut().set_objective(|_, x, _, f| {
            *f = x[0] * x[0];
            CALLBACK_SUCCESS
        });
        rep.core_mut().callbacks_mut().set_constraint(|_, x, _, mut g| {
            g[0] = x[0] - 1.0;
            g[1] = x[0] - 2.0;
            CALLBACK_SUCCESS
        });
        assert!(rep.set_advanced_int_option("max_outer_iterations", 8));
        rep.set_max_iterations(200);

        assert!(matches!(
            rep.optimize(&mut Vector::zeros(1)),
            Err(OptimizerError::Infeasible { .. })
        ));
    }

    #[test]
    fn test_hessian_approximation_option() {
        let sys = OptimizerSystem::new(2);
        let mut rep = InteriorPointOptimizer::new(&sys).unwrap();
        set_distance_to(&mut rep, [1.0, 1.0]);
        assert!(rep.set_advanced_str_option("hessian_approximation", "exact"));
        assert!(matches!(
            rep.optimize(&mut Vector::zeros(2)),
            Err(OptimizerError::InvalidConfiguration { .. })
        ));
        assert!(rep.set_advanced_str_option("hessian_approximation", "limited-memory"));
        let f = rep.optimize(&mut Vector::zeros(2)).unwrap();
        assert!(f < 1e-6);
    }
}
