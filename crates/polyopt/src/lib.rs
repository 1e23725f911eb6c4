//! # PolyOpt
//!
//! One optimizer API over pluggable nonlinear solver backends.
//!
//! An [`Optimizer`] is bound to a problem descriptor ([`OptimizerSystem`])
//! and to exactly one backend. Callers register plain closures for the
//! objective, its gradient, the constraints, their Jacobian and the Hessian;
//! missing derivatives are estimated by finite differences.
//!
//! ## Backends
//!
//! | algorithm | problems | availability |
//! |---|---|---|
//! | `LBFGS` | unconstrained, no limits | always |
//! | `LBFGSB` | parameter limits | always |
//! | `InteriorPoint` | general constraints and limits | always |
//! | `CFSQP` | general constraints and limits | `sqp` feature |
//!
//! With [`Algorithm::BestAvailable`] the backend follows the shape of the
//! problem: constraints select `InteriorPoint`, limits alone `LBFGSB`,
//! anything else `LBFGS`. An explicit request for a backend missing from
//! the build falls back to the same rule and logs a warning.
//!
//! ## Quick Start
//!
//! ```rust
//! use polyopt::prelude::*;
//!
//! // Minimize (x₀ − 1)² + (x₁ − 2)² subject to x₀ + x₁ = 1.
//! let system = OptimizerSystem::new(2).with_constraints(1, 1).unwrap();
//! let mut optimizer = Optimizer::new(&system).unwrap();
//! optimizer.register_objective(|_, x, _, f| {
//!     *f = (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2);
//!     CALLBACK_SUCCESS
//! });
//! optimizer.register_constraint(|_, x, _, mut g| {
//!     g[0] = x[0] + x[1] - 1.0;
//!     CALLBACK_SUCCESS
//! });
//! optimizer.set_convergence_tolerance(1e-7);
//!
//! let mut x = Vector::zeros(2);
//! let value = optimizer.optimize(&mut x).unwrap();
//! assert!((x[0] - 0.0).abs() < 1e-4 && (x[1] - 1.0).abs() < 1e-4);
//! assert!((value - 2.0).abs() < 1e-4);
//! ```
//!
//! ## Features
//!
//! - `sqp`: link the SQP backend (`Algorithm::CFSQP`)
//! - `serde`: serialization of settings and identifiers
//! - `full`: everything

pub mod optimizer;
pub mod selection;

pub use optimizer::Optimizer;
pub use selection::{select_backend, shape_rule};

// Re-export the building blocks
pub use polyopt_core::{
    Algorithm, OptimizerConfig, OptimizerConfigBuilder, OptimizerError, OptimizerResult,
    OptimizerSystem, CALLBACK_SUCCESS,
};
pub use polyopt_core::numerical::DifferentiationMethod;
pub use polyopt_core::types::{Matrix, Real, Vector};

pub use nalgebra;
pub use polyopt_core;
pub use polyopt_solvers;

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use polyopt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::optimizer::Optimizer;
    pub use polyopt_core::algorithm::Algorithm;
    pub use polyopt_core::callbacks::CALLBACK_SUCCESS;
    pub use polyopt_core::config::{OptimizerConfig, OptimizerConfigBuilder};
    pub use polyopt_core::error::{OptimizerError, OptimizerResult};
    pub use polyopt_core::numerical::DifferentiationMethod;
    pub use polyopt_core::system::OptimizerSystem;
    pub use polyopt_core::types::{
        Matrix, MatrixViewMut, Real, Vector, VectorView, VectorViewMut,
    };
}
