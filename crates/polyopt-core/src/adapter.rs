//! Callback adapter layer.
//!
//! Backend engines call back through the native convention of
//! [`crate::native`]: raw slices in, status sentinel out. The free functions
//! here translate each of those calls into a call of the matching user
//! callback registered on a [`RepCore`]:
//!
//! - raw parameter buffers are wrapped in read-only views, output buffers in
//!   mutable views, so nothing is copied on the way in or out;
//! - the user status convention (`0` = success) is inverted into the native
//!   one (nonzero = success);
//! - a panic escaping a user callback is caught here and reported as the
//!   native failure sentinel, so it never unwinds through an engine;
//! - gradients and Jacobians fall back to finite differences when requested
//!   or when no analytic callback is registered.
//!
//! [`AdapterBridge`] binds the functions to one backend's state and is what
//! engines actually receive.

use crate::backend::RepCore;
use crate::native::{succeeded, Index, NativeProblem, NativeStatus, NATIVE_FAILURE, NATIVE_SUCCESS};
use crate::types::{Matrix, MatrixViewMut, Real, Vector, VectorView, VectorViewMut};
use log::{trace, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Runs a user callback, converting its status and any panic to a native status.
fn invoke<F>(callback: &str, f: F) -> NativeStatus
where
    F: FnOnce() -> i32,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(0) => NATIVE_SUCCESS,
        Ok(code) => {
            trace!("{callback} callback returned status {code}");
            NATIVE_FAILURE
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_owned());
            warn!("{callback} callback panicked: {message}");
            NATIVE_FAILURE
        }
    }
}

fn parameters(n: usize, x: &[Real]) -> Option<VectorView<'_>> {
    (x.len() >= n).then(|| VectorView::from_slice(&x[..n], n))
}

/// Objective adapter: evaluates the registered objective at `x[..n]` into `f`.
pub fn objective_adapter(rep: &RepCore<'_>, n: usize, x: &[Real], new_x: bool, f: &mut Real) -> NativeStatus {
    let Some(objective) = rep.callbacks().objective.as_ref() else {
        warn!("no objective function registered");
        return NATIVE_FAILURE;
    };
    let Some(params) = parameters(n, x) else {
        return NATIVE_FAILURE;
    };
    let status = invoke("objective", || objective(rep.system(), params, new_x, f));
    if rep.diagnostics(3) {
        trace!("objective(new_x = {new_x}) = {f} [status {status}]");
    }
    status
}

/// Gradient adapter: analytic gradient, or forward/central differences of the
/// objective when numerical gradients are on or no gradient is registered.
///
/// The output is written straight into `gradient[..n]`.
pub fn gradient_adapter(
    rep: &RepCore<'_>,
    n: usize,
    x: &[Real],
    new_x: bool,
    gradient: &mut [Real],
) -> NativeStatus {
    if gradient.len() < n {
        return NATIVE_FAILURE;
    }
    let Some(params) = parameters(n, x) else {
        return NATIVE_FAILURE;
    };

    match rep.callbacks().gradient.as_ref() {
        Some(analytic) if !rep.config().numerical_gradient => {
            let out = VectorViewMut::from_slice(&mut gradient[..n], n);
            invoke("gradient", || analytic(rep.system(), params, new_x, out))
        }
        _ => {
            let mut f0 = 0.0;
            if !succeeded(objective_adapter(rep, n, x, true, &mut f0)) {
                return NATIVE_FAILURE;
            }
            let objective = |xp: &[Real]| {
                let mut fp = 0.0;
                succeeded(objective_adapter(rep, n, xp, true, &mut fp)).then_some(fp)
            };
            match rep
                .gradient_differentiator()
                .calc_gradient(&x[..n], f0, objective, &mut gradient[..n])
            {
                Ok(()) => NATIVE_SUCCESS,
                Err(err) => {
                    warn!("numerical gradient failed: {err}");
                    NATIVE_FAILURE
                }
            }
        }
    }
}

/// Constraint adapter: evaluates the registered constraints into `g[..m]`.
pub fn constraint_adapter(
    rep: &RepCore<'_>,
    n: usize,
    x: &[Real],
    new_x: bool,
    m: usize,
    g: &mut [Real],
) -> NativeStatus {
    if m == 0 {
        return NATIVE_SUCCESS;
    }
    let Some(constraint) = rep.callbacks().constraint.as_ref() else {
        warn!("problem has {m} constraints but no constraint function is registered");
        return NATIVE_FAILURE;
    };
    let Some(params) = parameters(n, x) else {
        return NATIVE_FAILURE;
    };
    if g.len() < m {
        return NATIVE_FAILURE;
    }
    let out = VectorViewMut::from_slice(&mut g[..m], m);
    invoke("constraint", || constraint(rep.system(), params, new_x, out))
}

/// Constraint Jacobian adapter.
///
/// Two-phase: with `values == None` it reports a dense structure of `m * n`
/// `(constraint, parameter)` pairs, row by row; otherwise it writes the
/// Jacobian values in that same row-major order. With `m == 0` it succeeds
/// without touching any buffer.
#[allow(clippy::too_many_arguments)]
pub fn constraint_jacobian_adapter(
    rep: &RepCore<'_>,
    n: usize,
    x: &[Real],
    new_x: bool,
    m: usize,
    nele_jac: usize,
    i_row: Option<&mut [Index]>,
    j_col: Option<&mut [Index]>,
    values: Option<&mut [Real]>,
) -> NativeStatus {
    if m == 0 {
        return NATIVE_SUCCESS;
    }
    if nele_jac != m * n {
        warn!("Jacobian expected with {} entries, backend asked for {nele_jac}", m * n);
        return NATIVE_FAILURE;
    }

    let Some(values) = values else {
        let (Some(rows), Some(cols)) = (i_row, j_col) else {
            return NATIVE_FAILURE;
        };
        if rows.len() < nele_jac || cols.len() < nele_jac {
            return NATIVE_FAILURE;
        }
        dense_structure(m, n, rows, cols, true);
        return NATIVE_SUCCESS;
    };
    if values.len() < nele_jac {
        return NATIVE_FAILURE;
    }

    let Some(params) = parameters(n, x) else {
        return NATIVE_FAILURE;
    };
    let mut jac = Matrix::zeros(m, n);
    let status = match rep.callbacks().constraint_jacobian.as_ref() {
        Some(analytic) if !rep.config().numerical_jacobian => {
            let status = invoke("constraint Jacobian", || {
                analytic(rep.system(), params, new_x, &mut jac)
            });
            if succeeded(status) && jac.shape() != (m, n) {
                warn!(
                    "constraint Jacobian callback resized its output to {}x{}",
                    jac.nrows(),
                    jac.ncols()
                );
                return NATIVE_FAILURE;
            }
            status
        }
        _ => numerical_jacobian(rep, n, &x[..n], m, &mut jac),
    };
    if !succeeded(status) {
        return status;
    }

    // Row-major: entry k = row * n + col, matching the structure above.
    for (k, value) in values[..nele_jac].iter_mut().enumerate() {
        *value = jac[(k / n, k % n)];
    }
    NATIVE_SUCCESS
}

fn numerical_jacobian(rep: &RepCore<'_>, n: usize, x: &[Real], m: usize, jac: &mut Matrix) -> NativeStatus {
    let mut fy0 = Vector::zeros(m);
    if !succeeded(constraint_adapter(rep, n, x, true, m, fy0.as_mut_slice())) {
        return NATIVE_FAILURE;
    }
    let constraints = |xp: &[Real], out: &mut [Real]| succeeded(constraint_adapter(rep, n, xp, true, m, out));
    match rep
        .jacobian_differentiator()
        .calc_jacobian(x, fy0.as_slice(), constraints, jac)
    {
        Ok(()) => NATIVE_SUCCESS,
        Err(err) => {
            warn!("numerical Jacobian failed: {err}");
            NATIVE_FAILURE
        }
    }
}

/// Hessian adapter.
///
/// Two-phase like the Jacobian adapter. The structure is the dense `n * n`
/// pattern enumerated column by column, so the values buffer is handed to the
/// registered Hessian callback as a column-major n×n view without copying.
/// The result is scaled by `obj_factor`; constraint curvature (`lambda`) is
/// not representable with the registered callbacks and is ignored.
#[allow(clippy::too_many_arguments)]
pub fn hessian_adapter(
    rep: &RepCore<'_>,
    n: usize,
    x: &[Real],
    new_x: bool,
    obj_factor: Real,
    _lambda: &[Real],
    _new_lambda: bool,
    nele_hess: usize,
    i_row: Option<&mut [Index]>,
    j_col: Option<&mut [Index]>,
    values: Option<&mut [Real]>,
) -> NativeStatus {
    if nele_hess != n * n {
        warn!("Hessian expected with {} entries, backend asked for {nele_hess}", n * n);
        return NATIVE_FAILURE;
    }

    let Some(values) = values else {
        let (Some(rows), Some(cols)) = (i_row, j_col) else {
            return NATIVE_FAILURE;
        };
        if rows.len() < nele_hess || cols.len() < nele_hess {
            return NATIVE_FAILURE;
        }
        dense_structure(n, n, rows, cols, false);
        return NATIVE_SUCCESS;
    };

    let Some(hessian) = rep.callbacks().hessian.as_ref() else {
        warn!("backend requested a Hessian but none is registered");
        return NATIVE_FAILURE;
    };
    let Some(params) = parameters(n, x) else {
        return NATIVE_FAILURE;
    };
    if values.len() < nele_hess {
        return NATIVE_FAILURE;
    }

    let status = {
        let out = MatrixViewMut::from_slice(&mut values[..nele_hess], n, n);
        invoke("Hessian", || hessian(rep.system(), params, new_x, out))
    };
    if succeeded(status) && obj_factor != 1.0 {
        values[..nele_hess].iter_mut().for_each(|v| *v *= obj_factor);
    }
    status
}

/// Writes the dense `rows × cols` index pattern, row by row or column by column.
fn dense_structure(rows: usize, cols: usize, i_row: &mut [Index], j_col: &mut [Index], row_major: bool) {
    let pairs = (0..rows * cols).map(|k| {
        if row_major {
            (k / cols, k % cols)
        } else {
            (k % rows, k / rows)
        }
    });
    for (k, (row, col)) in pairs.enumerate() {
        i_row[k] = row as Index;
        j_col[k] = col as Index;
    }
}

/// [`NativeProblem`] implementation bound to one backend's state.
///
/// Engines receive this instead of an untyped context pointer; it lives only
/// for the duration of one `optimize` call.
#[derive(Debug, Clone, Copy)]
pub struct AdapterBridge<'r, 'a> {
    rep: &'r RepCore<'a>,
}

impl<'r, 'a> AdapterBridge<'r, 'a> {
    /// Binds the adapters to `rep`.
    pub fn new(rep: &'r RepCore<'a>) -> Self {
        Self { rep }
    }

    /// The bound backend state.
    pub fn rep(&self) -> &'r RepCore<'a> {
        self.rep
    }
}

impl NativeProblem for AdapterBridge<'_, '_> {
    fn num_parameters(&self) -> usize {
        self.rep.system().num_parameters()
    }

    fn num_constraints(&self) -> usize {
        self.rep.system().num_constraints()
    }

    fn eval_f(&self, x: &[Real], new_x: bool, f: &mut Real) -> NativeStatus {
        objective_adapter(self.rep, self.num_parameters(), x, new_x, f)
    }

    fn eval_grad_f(&self, x: &[Real], new_x: bool, grad_f: &mut [Real]) -> NativeStatus {
        gradient_adapter(self.rep, self.num_parameters(), x, new_x, grad_f)
    }

    fn eval_g(&self, x: &[Real], new_x: bool, g: &mut [Real]) -> NativeStatus {
        constraint_adapter(self.rep, self.num_parameters(), x, new_x, self.num_constraints(), g)
    }

    fn eval_jac_g(
        &self,
        x: &[Real],
        new_x: bool,
        nele_jac: usize,
        i_row: Option<&mut [Index]>,
        j_col: Option<&mut [Index]>,
        values: Option<&mut [Real]>,
    ) -> NativeStatus {
        constraint_jacobian_adapter(
            self.rep,
            self.num_parameters(),
            x,
            new_x,
            self.num_constraints(),
            nele_jac,
            i_row,
            j_col,
            values,
        )
    }

    fn eval_h(
        &self,
        x: &[Real],
        new_x: bool,
        obj_factor: Real,
        lambda: &[Real],
        new_lambda: bool,
        nele_hess: usize,
        i_row: Option<&mut [Index]>,
        j_col: Option<&mut [Index]>,
        values: Option<&mut [Real]>,
    ) -> NativeStatus {
        hessian_adapter(
            self.rep,
            self.num_parameters(),
            x,
            new_x,
            obj_factor,
            lambda,
            new_lambda,
            nele_hess,
            i_row,
            j_col,
            values,
        )
    }
}
