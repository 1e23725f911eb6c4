//! Numerical differentiation used when analytic derivatives are missing or disabled.

pub mod differentiator;

pub use differentiator::{DifferentiationMethod, Differentiator};
