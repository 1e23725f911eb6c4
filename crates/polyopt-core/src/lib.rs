//! Core types and the callback adapter layer of PolyOpt.
//!
//! This crate holds everything a backend needs to be plugged behind the
//! [`polyopt`](https://docs.rs/polyopt) façade without knowing about it:
//!
//! - **Problem descriptor**: [`OptimizerSystem`] fixes the number of
//!   parameters and constraints and optional parameter limits.
//! - **Callbacks**: user functions with a `0` = success status convention,
//!   stored in [`CallbackSlots`].
//! - **Backend contract**: [`OptimizerRep`] and the shared [`RepCore`]
//!   state (settings, advanced options, differentiators).
//! - **Native convention**: [`NativeProblem`], the raw-buffer callback
//!   surface solve loops are written against.
//! - **Adapters**: [`AdapterBridge`] implements [`NativeProblem`] on top of
//!   the registered user callbacks, with finite-difference fallbacks.
//!
//! # Modules
//!
//! - [`adapter`]: translation between native callbacks and user callbacks
//! - [`algorithm`]: algorithm identifiers
//! - [`backend`]: backend interface contract
//! - [`callbacks`]: user callback types
//! - [`config`]: common settings and advanced option tables
//! - [`error`]: error types
//! - [`native`]: native status sentinels and the engine-facing trait
//! - [`numerical`]: finite-difference gradients and Jacobians
//! - [`optimization`]: line search, limited-memory updates, solve reports
//! - [`system`]: problem descriptor
//! - [`types`]: type aliases and numerical constants

pub mod adapter;
pub mod algorithm;
pub mod backend;
pub mod callbacks;
pub mod config;
pub mod error;
pub mod native;
pub mod numerical;
pub mod optimization;
pub mod system;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_problems;

// Re-export commonly used items at the crate root
pub use adapter::AdapterBridge;
pub use algorithm::Algorithm;
pub use backend::{OptimizerRep, RepCore};
pub use callbacks::{CallbackSlots, CALLBACK_SUCCESS};
pub use config::{OptimizerConfig, OptimizerConfigBuilder};
pub use error::{OptimizerError, OptimizerResult};
pub use native::{NativeProblem, NativeStatus, NATIVE_FAILURE, NATIVE_SUCCESS};
pub use system::OptimizerSystem;

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use polyopt_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::adapter::AdapterBridge;
    pub use crate::algorithm::Algorithm;
    pub use crate::backend::{OptimizerRep, RepCore};
    pub use crate::callbacks::{
        CallbackSlots, ConstraintFunc, ConstraintJacobianFunc, GradientFunc, HessianFunc,
        ObjectiveFunc, CALLBACK_SUCCESS,
    };
    pub use crate::config::{
        AdvancedOptions, OptimizerConfig, OptimizerConfigBuilder, OptionKind, OptionSpec,
        OptionValue,
    };
    pub use crate::error::{OptimizerError, OptimizerResult};
    pub use crate::native::{NativeProblem, NativeStatus, NATIVE_FAILURE, NATIVE_SUCCESS};
    pub use crate::numerical::{DifferentiationMethod, Differentiator};
    pub use crate::optimization::{SolveReport, TerminationReason};
    pub use crate::system::OptimizerSystem;
    pub use crate::types::{
        constants, Matrix, MatrixViewMut, Real, Vector, VectorView, VectorViewMut,
    };
}
