//! SQP solve loop and its QP subproblem solver.

use log::debug;
use nalgebra::linalg::Cholesky;
use nalgebra::Dyn;
use polyopt_core::native::{objective_value, succeeded, Index, NativeProblem};
use polyopt_core::optimization::{backtracking, LineSearchParams, SolveReport, TerminationReason};
use polyopt_core::types::{constants, Matrix, Real, Vector};
use std::time::Instant;

/// Curvature ratio below which a row counts as dependent on the active rows.
const DEPENDENT_ROW: Real = 1e-10;

/// Row slack tolerance of the QP, relative to the right-hand sides.
const QP_FEASIBILITY: Real = 1e-10;

/// How the QP Hessian is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HessianMode {
    /// Damped BFGS updates
    Bfgs,
    /// Hessian callback, regularized to be positive definite
    Exact,
}

/// Settings of the SQP loop.
#[derive(Debug, Clone)]
pub struct SqpSettings {
    /// Tolerance on the step length and the constraint violation
    pub tolerance: Real,
    /// Iteration budget
    pub max_iterations: usize,
    /// Initial ℓ1 merit penalty σ
    pub merit_penalty: Real,
    /// Active-set change budget of the QP solver
    pub max_qp_iterations: usize,
    /// QP Hessian source
    pub hessian: HessianMode,
    /// Merit line search parameters
    pub line_search: LineSearchParams,
    /// Per-iteration records are emitted from level 2
    pub diagnostics_level: u32,
}

/// Why a QP subproblem produced no step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QpFailure {
    /// No step satisfies all rows
    Inconsistent,
    /// The active-set budget ran out
    IterationLimit,
}

/// Function values and first derivatives at one point.
struct Linearization {
    f: Real,
    grad: Vector,
    c: Vector,
    jac: Matrix,
}

/// Dense index structure of the constraint Jacobian and Hessian.
struct Structure {
    jac_rows: Vec<Index>,
    jac_cols: Vec<Index>,
    hess_rows: Vec<Index>,
    hess_cols: Vec<Index>,
}

/// QP rows `A d ≤ b` at one iterate. Equalities come first and hold with `=`.
struct QpRows {
    a: Matrix,
    b: Vector,
    /// For each constraint, the sign and row of its multiplier
    owners: Vec<(Real, usize)>,
}

/// Evaluation context of one SQP run.
struct Model<'p, P: ?Sized> {
    problem: &'p P,
    n: usize,
    m: usize,
    m_eq: usize,
    lower: &'p [Real],
    upper: &'p [Real],
    structure: Structure,
}

impl<'p, P: NativeProblem + ?Sized> Model<'p, P> {
    fn new(
        problem: &'p P,
        m_eq: usize,
        lower: &'p [Real],
        upper: &'p [Real],
        x: &[Real],
        hessian: HessianMode,
    ) -> Result<Self, &'static str> {
        let n = problem.num_parameters();
        let m = problem.num_constraints();

        let nele_jac = if m == 0 { 0 } else { problem.jacobian_nonzeros() };
        let mut jac_rows = vec![0; nele_jac];
        let mut jac_cols = vec![0; nele_jac];
        if m > 0 {
            let status =
                problem.eval_jac_g(x, true, nele_jac, Some(&mut jac_rows), Some(&mut jac_cols), None);
            if !succeeded(status) || !in_range(&jac_rows, &jac_cols, m, n) {
                return Err("constraint Jacobian");
            }
        }

        let nele_hess = match hessian {
            HessianMode::Exact => problem.hessian_nonzeros(),
            HessianMode::Bfgs => 0,
        };
        let mut hess_rows = vec![0; nele_hess];
        let mut hess_cols = vec![0; nele_hess];
        if hessian == HessianMode::Exact {
            let status = problem.eval_h(
                x,
                true,
                1.0,
                &vec![0.0; m],
                true,
                nele_hess,
                Some(&mut hess_rows),
                Some(&mut hess_cols),
                None,
            );
            if !succeeded(status) || !in_range(&hess_rows, &hess_cols, n, n) {
                return Err("Hessian");
            }
        }

        Ok(Self {
            problem,
            n,
            m,
            m_eq,
            lower,
            upper,
            structure: Structure {
                jac_rows,
                jac_cols,
                hess_rows,
                hess_cols,
            },
        })
    }

    fn constraints(&self, x: &[Real], new_x: bool) -> Option<Vector> {
        let mut c = Vector::zeros(self.m);
        (self.m == 0 || succeeded(self.problem.eval_g(x, new_x, c.as_mut_slice()))).then_some(c)
    }

    fn linearize(&self, x: &[Real]) -> Result<Linearization, &'static str> {
        let f = objective_value(self.problem, x, true).ok_or("objective")?;
        let mut grad = Vector::zeros(self.n);
        if !succeeded(self.problem.eval_grad_f(x, false, grad.as_mut_slice())) {
            return Err("gradient");
        }
        let c = self.constraints(x, false).ok_or("constraint")?;

        let mut jac = Matrix::zeros(self.m, self.n);
        if self.m > 0 {
            let mut values = vec![0.0; self.structure.jac_rows.len()];
            let status = self
                .problem
                .eval_jac_g(x, false, values.len(), None, None, Some(&mut values));
            if !succeeded(status) {
                return Err("constraint Jacobian");
            }
            for ((&row, &col), value) in self
                .structure
                .jac_rows
                .iter()
                .zip(&self.structure.jac_cols)
                .zip(values)
            {
                jac[(row as usize, col as usize)] += value;
            }
        }
        Ok(Linearization { f, grad, c, jac })
    }

    fn hessian(&self, x: &[Real], multipliers: &Vector) -> Option<Matrix> {
        let mut values = vec![0.0; self.structure.hess_rows.len()];
        let status = self.problem.eval_h(
            x,
            false,
            1.0,
            multipliers.as_slice(),
            true,
            values.len(),
            None,
            None,
            Some(&mut values),
        );
        if !succeeded(status) {
            return None;
        }
        let mut h = Matrix::zeros(self.n, self.n);
        for ((&row, &col), value) in self
            .structure
            .hess_rows
            .iter()
            .zip(&self.structure.hess_cols)
            .zip(values)
        {
            h[(row as usize, col as usize)] += value;
        }
        Some((&h + h.transpose()) * 0.5)
    }

    /// ℓ1 violation `Σ |c_E| + Σ max(0, −c_I)`.
    fn violation_l1(&self, c: &Vector) -> Real {
        let equality: Real = c.rows(0, self.m_eq).iter().map(|ci| ci.abs()).sum();
        let inequality: Real = c.rows(self.m_eq, self.m - self.m_eq).iter().map(|ci| (-ci).max(0.0)).sum();
        equality + inequality
    }

    /// Infinity-norm violation.
    fn violation_inf(&self, c: &Vector) -> Real {
        let equality = c.rows(0, self.m_eq).iter().fold(0.0, |acc: Real, ci| acc.max(ci.abs()));
        c.rows(self.m_eq, self.m - self.m_eq)
            .iter()
            .fold(equality, |acc, ci| acc.max(-ci))
    }

    /// Linearized constraints and finite limits as QP rows.
    ///
    /// Equality `i` becomes `J_i d = −c_i`, inequality `i` becomes
    /// `−J_i d ≤ c_i`, and each finite limit one row on `d_j`.
    fn qp_rows(&self, x: &[Real], lin: &Linearization) -> QpRows {
        let mut rows: Vec<(Vec<Real>, Real)> = Vec::new();
        let mut owners = Vec::with_capacity(self.m);
        for i in 0..self.m {
            let grad_i = lin.jac.row(i);
            if i < self.m_eq {
                owners.push((1.0, rows.len()));
                rows.push((grad_i.iter().copied().collect(), -lin.c[i]));
            } else {
                owners.push((-1.0, rows.len()));
                rows.push((grad_i.iter().map(|v| -v).collect(), lin.c[i]));
            }
        }
        for j in 0..self.n {
            if self.upper[j] < constants::INFINITE_BOUND {
                let mut e = vec![0.0; self.n];
                e[j] = 1.0;
                rows.push((e, self.upper[j] - x[j]));
            }
            if self.lower[j] > -constants::INFINITE_BOUND {
                let mut e = vec![0.0; self.n];
                e[j] = -1.0;
                rows.push((e, x[j] - self.lower[j]));
            }
        }

        QpRows {
            a: Matrix::from_fn(rows.len(), self.n, |r, c| rows[r].0[c]),
            b: Vector::from_iterator(rows.len(), rows.iter().map(|(_, rhs)| *rhs)),
            owners,
        }
    }

    /// Right-hand sides for which `d = 0` is admissible.
    fn relaxed(&self, b: &Vector) -> Vector {
        Vector::from_iterator(
            b.len(),
            b.iter()
                .enumerate()
                .map(|(row, &rhs)| if row < self.m_eq { 0.0 } else { rhs.max(0.0) }),
        )
    }
}

/// Per-constraint multipliers `w` such that `∇L = ∇f + Jᵀ w`.
fn constraint_multipliers(owners: &[(Real, usize)], nu: &Vector) -> Vector {
    Vector::from_iterator(owners.len(), owners.iter().map(|&(sign, row)| sign * nu[row]))
}

fn in_range(rows: &[Index], cols: &[Index], nrows: usize, ncols: usize) -> bool {
    rows.iter().zip(cols).all(|(&r, &c)| {
        usize::try_from(r).is_ok_and(|r| r < nrows) && usize::try_from(c).is_ok_and(|c| c < ncols)
    })
}

/// Cholesky factor of `b`, shifting the diagonal until it exists.
fn regularized_cholesky(b: &Matrix) -> Option<Cholesky<Real, Dyn>> {
    if let Some(chol) = b.clone().cholesky() {
        return Some(chol);
    }
    let scale = b.diagonal().amax().max(1.0);
    let mut shift = 1e-8 * scale;
    while shift < 1e10 * scale {
        let mut shifted = b.clone();
        for i in 0..shifted.nrows() {
            shifted[(i, i)] += shift;
        }
        if let Some(chol) = shifted.cholesky() {
            return Some(chol);
        }
        shift *= 10.0;
    }
    None
}

/// One active QP row: its index, orientation and multiplier.
#[derive(Debug, Clone, Copy)]
struct ActiveRow {
    row: usize,
    sign: Real,
    multiplier: Real,
}

/// Primal and dual directions for adding a row with normal `normal` to the
/// active rows, `z = H n` and `r = N* n`.
fn directions(
    chol: &Cholesky<Real, Dyn>,
    a: &Matrix,
    active: &[ActiveRow],
    normal: &Vector,
    ginv_normal: &Vector,
) -> Result<(Vector, Vector), QpFailure> {
    if active.is_empty() {
        return Ok((ginv_normal.clone(), Vector::zeros(0)));
    }
    let normals = Matrix::from_fn(normal.len(), active.len(), |i, j| {
        -active[j].sign * a[(active[j].row, i)]
    });
    let ginv_normals = chol.solve(&normals);
    let gram = normals.transpose() * &ginv_normals;
    let rhs = ginv_normals.transpose() * normal;
    let r = match gram.clone().cholesky() {
        Some(factor) => factor.solve(&rhs),
        None => gram.lu().solve(&rhs).ok_or(QpFailure::Inconsistent)?,
    };
    let z = ginv_normal - ginv_normals * &r;
    Ok((z, r))
}

/// Goldfarb–Idnani dual active-set method for
///
/// ```text
/// min ½ dᵀBd + gᵀd   s.t.  A_E d = b_E,  A_I d ≤ b_I
/// ```
///
/// where the first `meq` rows of `a` are the equalities and `chol` factors
/// `B`. The method starts at the unconstrained minimizer and adds violated
/// rows one at a time. A row whose normal depends on the active rows only
/// moves the multipliers, dropping an active inequality when its multiplier
/// reaches zero, so degenerate vertices need no special treatment.
///
/// Returns the step and one multiplier per row, with `B d + g + Aᵀν = 0` and
/// `ν ≥ 0` on the inequality rows.
pub fn solve_qp(
    chol: &Cholesky<Real, Dyn>,
    g: &Vector,
    a: &Matrix,
    b: &Vector,
    meq: usize,
    max_iterations: usize,
) -> Result<(Vector, Vector), QpFailure> {
    let k = a.nrows();
    let mut d = -chol.solve(g);
    if k == 0 {
        return Ok((d, Vector::zeros(0)));
    }
    let feasibility = QP_FEASIBILITY * (1.0 + b.amax());

    let mut active: Vec<ActiveRow> = Vec::new();
    let mut redundant = vec![false; k];
    let mut iterations = 0;

    loop {
        let slack = b - a * &d;
        let is_active = |i: usize| active.iter().any(|entry| entry.row == i);
        let next = (0..meq).find(|&i| !redundant[i] && !is_active(i)).or_else(|| {
            (meq..k)
                .filter(|&i| slack[i] < -feasibility && !is_active(i))
                .min_by(|&i, &j| slack[i].total_cmp(&slack[j]))
        });
        let Some(p) = next else {
            break;
        };

        // Orient the row so that the step towards it is positive.
        let sign = if p < meq && slack[p] > 0.0 { -1.0 } else { 1.0 };
        let normal: Vector = a.row(p).transpose() * -sign;
        let ginv_normal = chol.solve(&normal);
        let mut multiplier = 0.0;

        loop {
            iterations += 1;
            if iterations > max_iterations {
                return Err(QpFailure::IterationLimit);
            }

            let (z, r) = directions(chol, a, &active, &normal, &ginv_normal)?;
            let curvature = z.dot(&normal);
            let dependent = !(curvature > DEPENDENT_ROW * normal.dot(&ginv_normal));
            let oriented_slack = sign * b[p] + normal.dot(&d);

            if dependent && p < meq && oriented_slack.abs() <= feasibility {
                redundant[p] = true;
                break;
            }

            let partial = active
                .iter()
                .zip(r.iter())
                .enumerate()
                .filter(|(_, (entry, rj))| entry.row >= meq && **rj > 0.0)
                .map(|(j, (entry, rj))| (entry.multiplier / rj, j))
                .min_by(|x, y| x.0.total_cmp(&y.0));
            let full = (!dependent).then(|| -oriented_slack / curvature);

            let (t, dropped) = match (full, partial) {
                (None, None) => return Err(QpFailure::Inconsistent),
                (Some(t_full), Some((t_partial, j))) if t_partial < t_full => (t_partial, Some(j)),
                (Some(t_full), _) => (t_full, None),
                (None, Some((t_partial, j))) => (t_partial, Some(j)),
            };

            if !dependent {
                d.axpy(t, &z, 1.0);
            }
            for (entry, rj) in active.iter_mut().zip(r.iter()) {
                entry.multiplier -= t * rj;
            }
            multiplier += t;

            match dropped {
                Some(j) => {
                    active.remove(j);
                }
                None => {
                    active.push(ActiveRow {
                        row: p,
                        sign,
                        multiplier,
                    });
                    break;
                }
            }
        }
    }

    let mut nu = Vector::zeros(k);
    for entry in active {
        nu[entry.row] = entry.sign * entry.multiplier;
    }
    Ok((d, nu))
}

/// Damped BFGS update of `b` with step `s` and Lagrangian gradient change `y`.
fn damped_bfgs_update(b: &mut Matrix, s: &Vector, y: &Vector) {
    let bs = &*b * s;
    let sbs = s.dot(&bs);
    if !(sbs > constants::EPSILON) {
        return;
    }
    let sy = s.dot(y);
    let r = if sy >= 0.2 * sbs {
        y.clone()
    } else {
        let theta = 0.8 * sbs / (sbs - sy);
        y * theta + &bs * (1.0 - theta)
    };
    let sr = s.dot(&r);
    if !(sr > 0.0) {
        return;
    }
    *b += &r * r.transpose() / sr - &bs * bs.transpose() / sbs;
}

/// SQP loop from `x`, leaving the last iterate in `x`.
pub fn solve<P>(
    problem: &P,
    m_eq: usize,
    x: &mut [Real],
    lower: &[Real],
    upper: &[Real],
    settings: &SqpSettings,
) -> SolveReport
where
    P: NativeProblem + ?Sized,
{
    let start = Instant::now();
    let mut report = run(problem, m_eq, x, lower, upper, settings);
    report.duration = start.elapsed();
    report
}

fn run<P>(
    problem: &P,
    m_eq: usize,
    x_out: &mut [Real],
    lower: &[Real],
    upper: &[Real],
    settings: &SqpSettings,
) -> SolveReport
where
    P: NativeProblem + ?Sized,
{
    let n = x_out.len();
    let mut x = Vector::from_iterator(
        n,
        x_out
            .iter()
            .zip(lower.iter().zip(upper))
            .map(|(&xi, (&lo, &hi))| num_traits::clamp(xi, lo, hi)),
    );

    let model = match Model::new(problem, m_eq, lower, upper, x.as_slice(), settings.hessian) {
        Ok(model) => model,
        Err(callback) => return SolveReport::new(TerminationReason::EvaluationFailed(callback)),
    };
    let mut lin = match model.linearize(x.as_slice()) {
        Ok(lin) => lin,
        Err(callback) => return SolveReport::new(TerminationReason::EvaluationFailed(callback)),
    };

    let mut report = SolveReport::new(TerminationReason::MaxIterations);
    report.function_evaluations = 1;
    report.gradient_evaluations = 1;
    let mut b = Matrix::identity(n, n);
    let mut w = Vector::zeros(model.m);
    let mut sigma = settings.merit_penalty;
    let mut iteration = 0;

    loop {
        if settings.hessian == HessianMode::Exact {
            match model.hessian(x.as_slice(), &w) {
                Some(h) => b = h,
                None => {
                    report.termination_reason = TerminationReason::EvaluationFailed("Hessian");
                    break;
                }
            }
        }
        let Some(chol) = regularized_cholesky(&b) else {
            report.termination_reason = TerminationReason::EvaluationFailed("Hessian");
            break;
        };

        report.constraint_violation = model.violation_inf(&lin.c);
        let feasible = report.constraint_violation <= settings.tolerance;
        let rows = model.qp_rows(x.as_slice(), &lin);
        let mut step = solve_qp(&chol, &lin.grad, &rows.a, &rows.b, m_eq, settings.max_qp_iterations);
        if step.is_err() && feasible {
            // Residuals below the tolerance may still make the linearized
            // rows inconsistent; drop them so that d = 0 stays admissible.
            let relaxed = model.relaxed(&rows.b);
            step = solve_qp(&chol, &lin.grad, &rows.a, &relaxed, m_eq, settings.max_qp_iterations);
        }
        let (d, nu) = match step {
            Ok(step) => step,
            Err(QpFailure::Inconsistent) if !feasible => {
                report.termination_reason = TerminationReason::Infeasible;
                break;
            }
            Err(failure) => {
                debug!("CFSQP: QP subproblem failed ({failure:?}) at iteration {iteration}");
                report.termination_reason = TerminationReason::MaxIterations;
                break;
            }
        };
        w = constraint_multipliers(&rows.owners, &nu);

        report.optimality = d.amax();
        if report.optimality <= settings.tolerance && feasible {
            report.termination_reason = TerminationReason::Converged;
            break;
        }
        if iteration >= settings.max_iterations {
            break;
        }

        sigma = sigma.max(1.1 * w.amax());
        let merit0 = lin.f + sigma * model.violation_l1(&lin.c);
        let derivative = lin.grad.dot(&d) - sigma * model.violation_l1(&lin.c);
        if !(derivative < 0.0) {
            report.termination_reason = TerminationReason::LineSearchFailed;
            break;
        }

        let mut x_trial = x.clone();
        let result = backtracking(
            |alpha| {
                for i in 0..n {
                    x_trial[i] = num_traits::clamp(x[i] + alpha * d[i], lower[i], upper[i]);
                }
                let f = objective_value(problem, x_trial.as_slice(), true)?;
                let c = model.constraints(x_trial.as_slice(), false)?;
                Some((f + sigma * model.violation_l1(&c), alpha * derivative))
            },
            merit0,
            &settings.line_search,
        );
        report.function_evaluations += result.function_evals;
        report.last_step_size = result.step_size;
        if !result.success {
            report.termination_reason = TerminationReason::LineSearchFailed;
            break;
        }

        let next = match model.linearize(x_trial.as_slice()) {
            Ok(next) => next,
            Err(callback) => {
                report.termination_reason = TerminationReason::EvaluationFailed(callback);
                break;
            }
        };
        report.function_evaluations += 1;
        report.gradient_evaluations += 1;

        if settings.hessian == HessianMode::Bfgs {
            let s = &x_trial - &x;
            let y = (&next.grad + next.jac.transpose() * &w) - (&lin.grad + lin.jac.transpose() * &w);
            damped_bfgs_update(&mut b, &s, &y);
        }

        x = x_trial;
        lin = next;
        iteration += 1;

        if settings.diagnostics_level >= 2 {
            debug!(
                "CFSQP: iteration {iteration}, f = {:.6e}, step = {:.3e}, violation = {:.3e}, sigma = {sigma:.3e}",
                lin.f, report.optimality, report.constraint_violation
            );
        }
    }

    x_out.copy_from_slice(x.as_slice());
    report.value = lin.f;
    report.iterations = iteration;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn identity_factor(n: usize) -> Cholesky<Real, Dyn> {
        Cholesky::new(Matrix::identity(n, n)).unwrap()
    }

    #[test]
    fn test_qp_unconstrained_step_is_newton_step() {
        let b = Matrix::from_diagonal(&Vector::from_vec(vec![2.0, 4.0]));
        let chol = b.cholesky().unwrap();
        let g = Vector::from_vec(vec![2.0, -4.0]);
        let (d, nu) = solve_qp(&chol, &g, &Matrix::zeros(0, 2), &Vector::zeros(0), 0, 10).unwrap();
        assert_relative_eq!(d[0], -1.0);
        assert_relative_eq!(d[1], 1.0);
        assert_eq!(nu.len(), 0);
    }

    #[test]
    fn test_qp_active_row() {
        // min ½‖d‖² − d₀  s.t. d₀ ≤ 0.25: solution d₀ = 0.25, multiplier 0.75.
        let g = Vector::from_element(1, -1.0);
        let a = Matrix::from_element(1, 1, 1.0);
        let b = Vector::from_element(1, 0.25);
        let (d, nu) = solve_qp(&identity_factor(1), &g, &a, &b, 0, 100).unwrap();
        assert_relative_eq!(d[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(nu[0], 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_qp_equality_multiplier_takes_either_sign() {
        // min ½‖d‖² + d₀ + d₁  s.t. d₀ + d₁ = 2: d = (1, 1), ν = −2.
        let g = Vector::from_vec(vec![1.0, 1.0]);
        let a = Matrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let b = Vector::from_element(1, 2.0);
        let (d, nu) = solve_qp(&identity_factor(2), &g, &a, &b, 1, 100).unwrap();
        assert_relative_eq!(d, Vector::from_vec(vec![1.0, 1.0]), epsilon = 1e-12);
        assert_relative_eq!(nu[0], -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_qp_inconsistent_rows() {
        // d ≤ −1 and −d ≤ −1 cannot both hold.
        let g = Vector::zeros(1);
        let a = Matrix::from_column_slice(2, 1, &[1.0, -1.0]);
        let b = Vector::from_vec(vec![-1.0, -1.0]);
        assert_eq!(
            solve_qp(&identity_factor(1), &g, &a, &b, 0, 100).unwrap_err(),
            QpFailure::Inconsistent
        );
    }

    #[test]
    fn test_qp_degenerate_vertex() {
        // Three rows through the origin of the plane, two of them equal:
        // d₀ ≤ 0, −d₀ − d₁ ≤ 0 and d₀ ≤ 0 again. The gradient pushes into the
        // corner, so the step is zero and the duplicate row carries nothing.
        let b_matrix = Matrix::from_row_slice(2, 2, &[102.0, -200.0, -200.0, 400.0 + 1e-3]);
        let chol = b_matrix.cholesky().unwrap();
        let g = Vector::from_vec(vec![-51.0, 50.0]);
        let a = Matrix::from_row_slice(3, 2, &[1.0, 0.0, -1.0, -1.0, 1.0, 0.0]);
        let b = Vector::zeros(3);

        let (d, nu) = solve_qp(&chol, &g, &a, &b, 0, 100).unwrap();
        assert!(d.amax() < 1e-10, "d = {d}");
        assert!(nu.iter().all(|&v| v >= 0.0));
        // Stationarity: g + Aᵀν = 0 at d = 0.
        assert_relative_eq!(g + a.transpose() * &nu, Vector::zeros(2), epsilon = 1e-8);
        assert_relative_eq!(nu[1], 50.0, epsilon = 1e-8);
        assert_relative_eq!(nu[0] + nu[2], 101.0, epsilon = 1e-8);
    }

    #[test]
    fn test_qp_dependent_equalities() {
        // The second equality repeats the first scaled by two.
        let g = Vector::from_vec(vec![-1.0, 0.0]);
        let a = Matrix::from_row_slice(2, 2, &[1.0, 1.0, 2.0, 2.0]);
        let b = Vector::from_vec(vec![0.0, 0.0]);
        let (d, _) = solve_qp(&identity_factor(2), &g, &a, &b, 2, 100).unwrap();
        assert_relative_eq!(d, Vector::from_vec(vec![0.5, -0.5]), epsilon = 1e-12);
    }

    #[test]
    fn test_qp_iteration_budget() {
        let g = Vector::from_element(1, -1.0);
        let a = Matrix::from_element(1, 1, 1.0);
        let b = Vector::from_element(1, 0.25);
        assert_eq!(
            solve_qp(&identity_factor(1), &g, &a, &b, 0, 0).unwrap_err(),
            QpFailure::IterationLimit
        );
    }

    #[test]
    fn test_damped_update_keeps_positive_definite() {
        let mut b = Matrix::identity(2, 2);
        let s = Vector::from_vec(vec![1.0, 0.0]);
        let y = Vector::from_vec(vec![-1.0, 0.5]);
        damped_bfgs_update(&mut b, &s, &y);
        assert!(b.clone().cholesky().is_some());
        assert_relative_eq!(b, b.transpose(), epsilon = 1e-12);
    }
}
