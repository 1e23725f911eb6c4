//! User callback types and the slots a backend stores them in.
//!
//! Every callback receives the problem descriptor, a read-only view of the
//! current parameters and a flag telling whether the point differs from the
//! one of the previous evaluation. It writes its result through the last
//! argument and returns a status code: `0` is success, anything else failure.

use crate::system::OptimizerSystem;
use crate::types::{Matrix, MatrixViewMut, Real, VectorView, VectorViewMut};

/// User status meaning success.
pub const CALLBACK_SUCCESS: i32 = 0;

/// Objective: writes f(x).
pub type ObjectiveFunc<'a> =
    Box<dyn Fn(&OptimizerSystem, VectorView<'_>, bool, &mut Real) -> i32 + 'a>;

/// Gradient: writes ∇f(x), length n.
pub type GradientFunc<'a> =
    Box<dyn Fn(&OptimizerSystem, VectorView<'_>, bool, VectorViewMut<'_>) -> i32 + 'a>;

/// Constraints: writes g(x), length m.
pub type ConstraintFunc<'a> =
    Box<dyn Fn(&OptimizerSystem, VectorView<'_>, bool, VectorViewMut<'_>) -> i32 + 'a>;

/// Constraint Jacobian: writes the m×n matrix, row = constraint, column = parameter.
pub type ConstraintJacobianFunc<'a> =
    Box<dyn Fn(&OptimizerSystem, VectorView<'_>, bool, &mut Matrix) -> i32 + 'a>;

/// Objective Hessian: writes the dense n×n matrix.
pub type HessianFunc<'a> =
    Box<dyn Fn(&OptimizerSystem, VectorView<'_>, bool, MatrixViewMut<'_>) -> i32 + 'a>;

/// The five callback slots of a backend, each empty until registered.
#[derive(Default)]
pub struct CallbackSlots<'a> {
    /// Objective slot
    pub objective: Option<ObjectiveFunc<'a>>,
    /// Gradient slot
    pub gradient: Option<GradientFunc<'a>>,
    /// Constraint slot
    pub constraint: Option<ConstraintFunc<'a>>,
    /// Constraint Jacobian slot
    pub constraint_jacobian: Option<ConstraintJacobianFunc<'a>>,
    /// Hessian slot
    pub hessian: Option<HessianFunc<'a>>,
}

impl<'a> CallbackSlots<'a> {
    /// Stores the objective callback, replacing any previous one.
    pub fn set_objective<F>(&mut self, f: F)
    where
        F: Fn(&OptimizerSystem, VectorView<'_>, bool, &mut Real) -> i32 + 'a,
    {
        self.objective = Some(Box::new(f));
    }

    /// Stores the gradient callback, replacing any previous one.
    pub fn set_gradient<F>(&mut self, f: F)
    where
        F: Fn(&OptimizerSystem, VectorView<'_>, bool, VectorViewMut<'_>) -> i32 + 'a,
    {
        self.gradient = Some(Box::new(f));
    }

    /// Stores the constraint callback, replacing any previous one.
    pub fn set_constraint<F>(&mut self, f: F)
    where
        F: Fn(&OptimizerSystem, VectorView<'_>, bool, VectorViewMut<'_>) -> i32 + 'a,
    {
        self.constraint = Some(Box::new(f));
    }

    /// Stores the constraint Jacobian callback, replacing any previous one.
    pub fn set_constraint_jacobian<F>(&mut self, f: F)
    where
        F: Fn(&OptimizerSystem, VectorView<'_>, bool, &mut Matrix) -> i32 + 'a,
    {
        self.constraint_jacobian = Some(Box::new(f));
    }

    /// Stores the Hessian callback, replacing any previous one.
    pub fn set_hessian<F>(&mut self, f: F)
    where
        F: Fn(&OptimizerSystem, VectorView<'_>, bool, MatrixViewMut<'_>) -> i32 + 'a,
    {
        self.hessian = Some(Box::new(f));
    }
}

impl std::fmt::Debug for CallbackSlots<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSlots")
            .field("objective", &self.objective.is_some())
            .field("gradient", &self.gradient.is_some())
            .field("constraint", &self.constraint.is_some())
            .field("constraint_jacobian", &self.constraint_jacobian.is_some())
            .field("hessian", &self.hessian.is_some())
            .finish()
    }
}
