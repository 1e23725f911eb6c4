//! Limited-memory quasi-Newton solve loop.
//!
//! One loop serves three backends:
//!
//! - **L-BFGS**: no bounds, weak Wolfe steps, relative gradient test;
//! - **L-BFGS-B**: box bounds handled by projection, Armijo steps along the
//!   projected path, projected-gradient test;
//! - **interior point**: the inner barrier subproblems, which are box
//!   constrained in the slack variables.
//!
//! With bounds, a component sitting on a bound whose gradient pushes it
//! outward is *active*: it is removed from the gradient before the two-loop
//! recursion and from the resulting direction, so the step only moves the
//! free variables (and the projection catches the ones that hit a bound
//! during the line search).
//!
//! The loop only sees a [`SmoothObjective`]. [`NativeObjective`] provides one
//! over a [`NativeProblem`], so nothing here knows about user callbacks.

use log::debug;
use polyopt_core::config::OptimizerConfig;
use polyopt_core::native::{objective_value, succeeded, NativeProblem};
use polyopt_core::optimization::{
    backtracking, weak_wolfe, LimitedMemory, LineSearchParams, SolveReport, TerminationReason,
};
use polyopt_core::types::{dot, norm2, norm_inf, Real};
use std::cell::Cell;
use std::time::Instant;

/// A continuously differentiable function the loop can minimize.
pub trait SmoothObjective {
    /// Number of variables.
    fn dimension(&self) -> usize;

    /// Value at `x`, `None` if it cannot be evaluated there.
    fn value(&self, x: &[Real], new_x: bool) -> Option<Real>;

    /// Gradient at `x`; `false` if it cannot be evaluated there.
    fn gradient(&self, x: &[Real], new_x: bool, gradient: &mut [Real]) -> bool;
}

/// The objective of a [`NativeProblem`].
#[derive(Debug)]
pub struct NativeObjective<'p, P: ?Sized> {
    problem: &'p P,
}

impl<'p, P: NativeProblem + ?Sized> NativeObjective<'p, P> {
    /// Wraps `problem`.
    pub fn new(problem: &'p P) -> Self {
        Self { problem }
    }
}

impl<P: NativeProblem + ?Sized> SmoothObjective for NativeObjective<'_, P> {
    fn dimension(&self) -> usize {
        self.problem.num_parameters()
    }

    fn value(&self, x: &[Real], new_x: bool) -> Option<Real> {
        objective_value(self.problem, x, new_x)
    }

    fn gradient(&self, x: &[Real], new_x: bool, gradient: &mut [Real]) -> bool {
        succeeded(self.problem.eval_grad_f(x, new_x, gradient))
    }
}

/// Optimality measure the loop stops on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// `‖∇f‖₂ ≤ tol · max(1, ‖x‖₂)`
    RelativeGradient,
    /// `‖P(x − ∇f) − x‖∞ ≤ tol`, P the projection onto the bounds
    ProjectedGradient,
}

/// Step acceptance rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRule {
    /// Sufficient decrease only, by backtracking
    Armijo,
    /// Sufficient decrease and curvature. Needs an unbounded problem.
    WeakWolfe,
}

/// Settings of one run of [`minimize`].
#[derive(Debug, Clone)]
pub struct QuasiNewtonSettings {
    /// Stopping tolerance on the optimality measure
    pub tolerance: Real,
    /// Iteration budget
    pub max_iterations: usize,
    /// Correction pairs kept
    pub history: usize,
    /// Curvature threshold below which a correction pair is skipped
    pub curvature_epsilon: Real,
    /// Line search parameters
    pub line_search: LineSearchParams,
    /// Step acceptance rule
    pub step_rule: StepRule,
    /// Optimality measure
    pub convergence: Convergence,
    /// Per-iteration records are emitted from level 2
    pub diagnostics_level: u32,
    /// Prefix of log records
    pub label: &'static str,
}

impl QuasiNewtonSettings {
    /// Settings taken from the common backend configuration.
    pub fn from_config(config: &OptimizerConfig, label: &'static str) -> Self {
        Self {
            tolerance: config.convergence_tolerance,
            max_iterations: config.max_iterations,
            history: config.limited_memory_history,
            curvature_epsilon: 1e-10,
            line_search: LineSearchParams::default(),
            step_rule: StepRule::Armijo,
            convergence: Convergence::ProjectedGradient,
            diagnostics_level: config.diagnostics_level,
            label,
        }
    }
}

/// Box bounds `lower ≤ x ≤ upper`.
#[derive(Debug, Clone, Copy)]
pub struct Bounds<'b> {
    lower: &'b [Real],
    upper: &'b [Real],
}

impl<'b> Bounds<'b> {
    /// Bounds from two slices of equal length with `lower ≤ upper`.
    pub fn new(lower: &'b [Real], upper: &'b [Real]) -> Self {
        debug_assert_eq!(lower.len(), upper.len());
        Self { lower, upper }
    }

    /// Lower and upper bound slices.
    pub fn as_slices(&self) -> (&'b [Real], &'b [Real]) {
        (self.lower, self.upper)
    }

    /// Projects `x` onto the box in place.
    pub fn project(&self, x: &mut [Real]) {
        for ((xi, &lo), &hi) in x.iter_mut().zip(self.lower).zip(self.upper) {
            *xi = num_traits::clamp(*xi, lo, hi);
        }
    }

    /// `‖P(x − g) − x‖∞`.
    pub fn projected_gradient_norm(&self, x: &[Real], g: &[Real]) -> Real {
        x.iter()
            .zip(g)
            .zip(self.lower.iter().zip(self.upper))
            .fold(0.0, |acc, ((&xi, &gi), (&lo, &hi))| {
                acc.max((num_traits::clamp(xi - gi, lo, hi) - xi).abs())
            })
    }

    fn is_active(&self, i: usize, xi: Real, gi: Real) -> bool {
        (xi <= self.lower[i] && gi > 0.0) || (xi >= self.upper[i] && gi < 0.0)
    }
}

/// Evaluation counters around an objective.
struct Counted<'o, O: ?Sized> {
    inner: &'o O,
    values: Cell<usize>,
    gradients: Cell<usize>,
}

impl<'o, O: SmoothObjective + ?Sized> Counted<'o, O> {
    fn new(inner: &'o O) -> Self {
        Self {
            inner,
            values: Cell::new(0),
            gradients: Cell::new(0),
        }
    }

    fn value(&self, x: &[Real], new_x: bool) -> Option<Real> {
        self.values.set(self.values.get() + 1);
        self.inner.value(x, new_x).filter(|f| f.is_finite())
    }

    fn gradient(&self, x: &[Real], new_x: bool, gradient: &mut [Real]) -> bool {
        self.gradients.set(self.gradients.get() + 1);
        self.inner.gradient(x, new_x, gradient) && gradient.iter().all(|g| g.is_finite())
    }
}

fn optimality(x: &[Real], g: &[Real], bounds: Option<&Bounds<'_>>, convergence: Convergence) -> Real {
    match (convergence, bounds) {
        (Convergence::ProjectedGradient, Some(bounds)) => bounds.projected_gradient_norm(x, g),
        (Convergence::ProjectedGradient, None) => norm_inf(g),
        (Convergence::RelativeGradient, _) => norm2(g) / norm2(x).max(1.0),
    }
}

/// Minimizes `objective` from `x`, leaving the last iterate in `x`.
///
/// The returned report carries the final value, the optimality measure and
/// why the loop stopped; it never fails by itself.
pub fn minimize<O>(
    objective: &O,
    x: &mut [Real],
    bounds: Option<Bounds<'_>>,
    settings: &QuasiNewtonSettings,
) -> SolveReport
where
    O: SmoothObjective + ?Sized,
{
    let start = Instant::now();
    let counted = Counted::new(objective);
    let mut report = run(&counted, x, bounds.as_ref(), settings);
    report.function_evaluations = counted.values.get();
    report.gradient_evaluations = counted.gradients.get();
    report.duration = start.elapsed();
    report
}

fn run<O>(
    objective: &Counted<'_, O>,
    x: &mut [Real],
    bounds: Option<&Bounds<'_>>,
    settings: &QuasiNewtonSettings,
) -> SolveReport
where
    O: SmoothObjective + ?Sized,
{
    let n = x.len();
    debug_assert_eq!(objective.inner.dimension(), n);
    if let Some(bounds) = bounds {
        bounds.project(x);
    }

    let Some(mut f) = objective.value(x, true) else {
        return SolveReport::new(TerminationReason::EvaluationFailed("objective"));
    };
    let mut g = vec![0.0; n];
    if !objective.gradient(x, false, &mut g) {
        let mut report = SolveReport::new(TerminationReason::EvaluationFailed("gradient"));
        report.value = f;
        return report;
    }

    // Weak Wolfe needs φ'(α) along a straight ray, which projection breaks.
    let step_rule = if bounds.is_some() {
        StepRule::Armijo
    } else {
        settings.step_rule
    };

    let mut memory =
        LimitedMemory::new(settings.history).with_curvature_epsilon(settings.curvature_epsilon);
    let mut d = vec![0.0; n];
    let mut free = vec![true; n];
    let mut x_trial = vec![0.0; n];
    let mut g_trial = vec![0.0; n];
    let mut report = SolveReport::new(TerminationReason::MaxIterations);
    let mut iteration = 0;

    loop {
        report.optimality = optimality(x, &g, bounds, settings.convergence);
        if report.optimality <= settings.tolerance {
            report.termination_reason = TerminationReason::Converged;
            break;
        }
        if iteration >= settings.max_iterations {
            break;
        }

        if let Some(bounds) = bounds {
            for (i, is_free) in free.iter_mut().enumerate() {
                *is_free = !bounds.is_active(i, x[i], g[i]);
            }
        }
        let masked = |v: &mut [Real], free: &[bool]| {
            v.iter_mut().zip(free).filter(|(_, f)| !**f).for_each(|(vi, _)| *vi = 0.0);
        };

        d.copy_from_slice(&g);
        masked(&mut d, &free);
        memory.apply_inverse_hessian(&mut d);
        d.iter_mut().for_each(|di| *di = -*di);
        masked(&mut d, &free);
        let mut slope = dot(&g, &d);
        if !(slope < 0.0) {
            // Not a descent direction: restart from steepest descent.
            memory.clear();
            d.iter_mut().zip(&g).for_each(|(di, gi)| *di = -gi);
            masked(&mut d, &free);
            slope = dot(&g, &d);
            if !(slope < 0.0) {
                report.termination_reason = TerminationReason::LineSearchFailed;
                break;
            }
        }

        let mut params = settings.line_search.clone();
        if memory.is_empty() {
            params.initial_step_size *= (1.0 / norm2(&d)).min(1.0);
        }

        let result = match step_rule {
            StepRule::WeakWolfe => weak_wolfe(
                |alpha| {
                    for i in 0..n {
                        x_trial[i] = x[i] + alpha * d[i];
                    }
                    let value = objective.value(&x_trial, true)?;
                    objective
                        .gradient(&x_trial, false, &mut g_trial)
                        .then(|| (value, dot(&g_trial, &d)))
                },
                f,
                slope,
                &params,
            ),
            StepRule::Armijo => {
                let result = backtracking(
                    |alpha| {
                        for i in 0..n {
                            x_trial[i] = x[i] + alpha * d[i];
                        }
                        if let Some(bounds) = bounds {
                            bounds.project(&mut x_trial);
                        }
                        let value = objective.value(&x_trial, true)?;
                        let moved: Real = (0..n).map(|i| g[i] * (x_trial[i] - x[i])).sum();
                        Some((value, moved))
                    },
                    f,
                    &params,
                );
                if result.success && !objective.gradient(&x_trial, false, &mut g_trial) {
                    report.termination_reason = TerminationReason::EvaluationFailed("gradient");
                    break;
                }
                result
            }
        };
        report.last_step_size = result.step_size;

        if !result.success {
            if memory.is_empty() {
                report.termination_reason = TerminationReason::LineSearchFailed;
                break;
            }
            if settings.diagnostics_level >= 2 {
                debug!(
                    "{}: line search failed at iteration {iteration}, dropping {} correction pairs",
                    settings.label,
                    memory.len()
                );
            }
            memory.clear();
            continue;
        }

        let s: Vec<Real> = x_trial.iter().zip(x.iter()).map(|(a, b)| a - b).collect();
        let y: Vec<Real> = g_trial.iter().zip(&g).map(|(a, b)| a - b).collect();
        memory.push(s, y);

        x.copy_from_slice(&x_trial);
        g.copy_from_slice(&g_trial);
        f = result.new_value;
        iteration += 1;

        if settings.diagnostics_level >= 2 {
            debug!(
                "{}: iteration {iteration}, f = {f:.6e}, optimality = {:.3e}, step = {:.3e}",
                settings.label, report.optimality, result.step_size
            );
        }
    }

    report.value = f;
    report.iterations = iteration;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Σ wᵢ (xᵢ − cᵢ)²
    struct Quadratic {
        weights: Vec<Real>,
        center: Vec<Real>,
    }

    impl SmoothObjective for Quadratic {
        fn dimension(&self) -> usize {
            self.center.len()
        }

        fn value(&self, x: &[Real], _: bool) -> Option<Real> {
            Some(
                x.iter()
                    .zip(&self.center)
                    .zip(&self.weights)
                    .map(|((xi, ci), wi)| wi * (xi - ci).powi(2))
                    .sum(),
            )
        }

        fn gradient(&self, x: &[Real], _: bool, gradient: &mut [Real]) -> bool {
            for i in 0..x.len() {
                gradient[i] = 2.0 * self.weights[i] * (x[i] - self.center[i]);
            }
            true
        }
    }

    fn settings(step_rule: StepRule, convergence: Convergence) -> QuasiNewtonSettings {
        QuasiNewtonSettings {
            tolerance: 1e-8,
            step_rule,
            convergence,
            ..QuasiNewtonSettings::from_config(&OptimizerConfig::default(), "test")
        }
    }

    fn quadratic() -> Quadratic {
        Quadratic {
            weights: vec![1.0, 10.0, 100.0],
            center: vec![1.0, -2.0, 3.0],
        }
    }

    #[test]
    fn test_unbounded_weak_wolfe() {
        let objective = quadratic();
        let mut x = vec![0.0; 3];
        let report = minimize(
            &objective,
            &mut x,
            None,
            &settings(StepRule::WeakWolfe, Convergence::RelativeGradient),
        );
        assert!(report.converged(), "{report:?}");
        for (xi, ci) in x.iter().zip(&objective.center) {
            assert_relative_eq!(xi, ci, epsilon = 1e-6);
        }
        assert!(report.function_evaluations >= report.iterations);
    }

    #[test]
    fn test_bounds_are_respected_and_active_set_found() {
        let objective = quadratic();
        let lower = [-10.0, 0.0, -10.0];
        let upper = [10.0, 10.0, 2.5];
        let mut x = vec![5.0, 5.0, 0.0];
        let report = minimize(
            &objective,
            &mut x,
            Some(Bounds::new(&lower, &upper)),
            &settings(StepRule::Armijo, Convergence::ProjectedGradient),
        );
        assert!(report.converged(), "{report:?}");
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-6);
        assert_eq!(x[1], 0.0);
        assert_eq!(x[2], 2.5);
    }

    #[test]
    fn test_start_point_is_projected() {
        let bounds_lower = [0.0];
        let bounds_upper = [1.0];
        let bounds = Bounds::new(&bounds_lower, &bounds_upper);
        let mut x = [7.0];
        bounds.project(&mut x);
        assert_eq!(x, [1.0]);
        assert_eq!(bounds.projected_gradient_norm(&[1.0], &[-3.0]), 0.0);
        assert_eq!(bounds.projected_gradient_norm(&[0.5], &[-3.0]), 0.5);
    }

    #[test]
    fn test_iteration_budget() {
        let objective = quadratic();
        let mut x = vec![0.0; 3];
        let report = minimize(
            &objective,
            &mut x,
            None,
            &QuasiNewtonSettings {
                max_iterations: 1,
                ..settings(StepRule::WeakWolfe, Convergence::RelativeGradient)
            },
        );
        assert_eq!(report.termination_reason, TerminationReason::MaxIterations);
        assert_eq!(report.iterations, 1);
    }

    #[test]
    fn test_failure_at_start_point() {
        struct Broken;
        impl SmoothObjective for Broken {
            fn dimension(&self) -> usize {
                1
            }
            fn value(&self, _: &[Real], _: bool) -> Option<Real> {
                None
            }
            fn gradient(&self, _: &[Real], _: bool, _: &mut [Real]) -> bool {
                false
            }
        }

        let report = minimize(
            &Broken,
            &mut [0.0],
            None,
            &settings(StepRule::Armijo, Convergence::RelativeGradient),
        );
        assert_eq!(
            report.termination_reason,
            TerminationReason::EvaluationFailed("objective")
        );
    }
}
