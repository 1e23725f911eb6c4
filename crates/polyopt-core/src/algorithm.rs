//! Algorithm identifiers.

use std::fmt;

/// The set of optimization backends a façade can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// Pick a backend from the shape of the problem.
    #[default]
    BestAvailable,
    /// Interior-point method for general constraints.
    InteriorPoint,
    /// Unconstrained limited-memory quasi-Newton.
    LBFGS,
    /// Bound-constrained limited-memory quasi-Newton.
    LBFGSB,
    /// Sequential quadratic programming (optional backend).
    CFSQP,
}

impl Algorithm {
    /// Every concrete backend, in declaration order.
    pub const CONCRETE: [Self; 4] = [Self::InteriorPoint, Self::LBFGS, Self::LBFGSB, Self::CFSQP];

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::BestAvailable => "BestAvailable",
            Self::InteriorPoint => "InteriorPoint",
            Self::LBFGS => "LBFGS",
            Self::LBFGSB => "LBFGSB",
            Self::CFSQP => "CFSQP",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_automatic() {
        assert_eq!(Algorithm::default(), Algorithm::BestAvailable);
        assert!(!Algorithm::CONCRETE.contains(&Algorithm::BestAvailable));
        assert_eq!(Algorithm::LBFGSB.to_string(), "LBFGSB");
    }
}
