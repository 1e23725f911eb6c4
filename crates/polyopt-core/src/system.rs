//! Problem descriptor.
//!
//! An [`OptimizerSystem`] states the shape of a problem: how many parameters,
//! how many constraints (and how many of those are equalities) and, optionally,
//! box limits on the parameters. It is owned by the caller and only ever
//! borrowed by an optimizer, which therefore cannot outlive it.
//!
//! Constraint rows follow a fixed convention: the first
//! `num_equality_constraints` rows are equalities `g_i(x) = 0`, the remaining
//! rows are inequalities `g_i(x) >= 0`.

use crate::error::{OptimizerError, OptimizerResult};
use crate::types::{constants, Real, Vector};

/// Shape of an optimization problem.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizerSystem {
    num_parameters: usize,
    num_constraints: usize,
    num_equality_constraints: usize,
    limits: Option<(Vector, Vector)>,
}

impl OptimizerSystem {
    /// Creates an unconstrained, unbounded problem over `num_parameters` variables.
    pub fn new(num_parameters: usize) -> Self {
        Self {
            num_parameters,
            num_constraints: 0,
            num_equality_constraints: 0,
            limits: None,
        }
    }

    /// Sets the total constraint count and how many leading rows are equalities.
    pub fn with_constraints(
        mut self,
        num_constraints: usize,
        num_equality_constraints: usize,
    ) -> OptimizerResult<Self> {
        if num_equality_constraints > num_constraints {
            return Err(OptimizerError::invalid_configuration(
                "equality constraints cannot outnumber constraints",
                "num_equality_constraints",
                num_equality_constraints.to_string(),
            ));
        }
        self.num_constraints = num_constraints;
        self.num_equality_constraints = num_equality_constraints;
        Ok(self)
    }

    /// Sets lower and upper limits on every parameter.
    pub fn with_limits(mut self, lower: Vector, upper: Vector) -> OptimizerResult<Self> {
        let n = self.num_parameters;
        if lower.len() != n {
            return Err(OptimizerError::dimension_mismatch(n, lower.len()));
        }
        if upper.len() != n {
            return Err(OptimizerError::dimension_mismatch(n, upper.len()));
        }
        if let Some(i) = (0..n).find(|&i| lower[i] > upper[i]) {
            return Err(OptimizerError::invalid_configuration(
                "lower limit exceeds upper limit",
                format!("limits[{i}]"),
                format!("[{}, {}]", lower[i], upper[i]),
            ));
        }
        self.limits = Some((lower, upper));
        Ok(self)
    }

    /// Number of free parameters (n).
    pub fn num_parameters(&self) -> usize {
        self.num_parameters
    }

    /// Total number of constraints (m).
    pub fn num_constraints(&self) -> usize {
        self.num_constraints
    }

    /// Number of leading constraint rows that are equalities.
    pub fn num_equality_constraints(&self) -> usize {
        self.num_equality_constraints
    }

    /// Number of trailing constraint rows that are inequalities.
    pub fn num_inequality_constraints(&self) -> usize {
        self.num_constraints - self.num_equality_constraints
    }

    /// Whether parameter limits were supplied.
    pub fn has_limits(&self) -> bool {
        self.limits.is_some()
    }

    /// Lower and upper limits, if any.
    pub fn parameter_limits(&self) -> Option<(&Vector, &Vector)> {
        self.limits.as_ref().map(|(l, u)| (l, u))
    }

    /// Limits as dense arrays, using `±INFINITE_BOUND` where none were given.
    pub fn bounds_or_infinite(&self) -> (Vec<Real>, Vec<Real>) {
        match &self.limits {
            Some((l, u)) => (l.as_slice().to_vec(), u.as_slice().to_vec()),
            None => (
                vec![-constants::INFINITE_BOUND; self.num_parameters],
                vec![constants::INFINITE_BOUND; self.num_parameters],
            ),
        }
    }
}
