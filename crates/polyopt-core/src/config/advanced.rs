//! Backend-specific named options.
//!
//! Each backend publishes a static table of the keys it understands together
//! with the expected value kind. Setting a key outside that table, or with the
//! wrong kind, is not an error: the setter simply reports `false`.

use crate::types::Real;
use std::collections::HashMap;

/// The kind of value an advanced option carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// String value
    Str,
    /// Real value
    Real,
    /// Integer value
    Int,
    /// Boolean value
    Bool,
}

/// A typed advanced option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// String value
    Str(String),
    /// Real value
    Real(Real),
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
}

impl OptionValue {
    /// Kind of this value.
    pub fn kind(&self) -> OptionKind {
        match self {
            Self::Str(_) => OptionKind::Str,
            Self::Real(_) => OptionKind::Real,
            Self::Int(_) => OptionKind::Int,
            Self::Bool(_) => OptionKind::Bool,
        }
    }
}

/// One recognized key in a backend's option table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    /// Option name
    pub key: &'static str,
    /// Expected value kind
    pub kind: OptionKind,
}

impl OptionSpec {
    /// Declares a recognized key.
    pub const fn new(key: &'static str, kind: OptionKind) -> Self {
        Self { key, kind }
    }
}

/// Values accepted so far, validated against a backend's option table.
#[derive(Debug, Clone)]
pub struct AdvancedOptions {
    recognized: &'static [OptionSpec],
    values: HashMap<&'static str, OptionValue>,
}

impl AdvancedOptions {
    /// Creates an empty option set for the given table.
    pub fn new(recognized: &'static [OptionSpec]) -> Self {
        Self {
            recognized,
            values: HashMap::new(),
        }
    }

    /// Keys this option set accepts.
    pub fn recognized(&self) -> &'static [OptionSpec] {
        self.recognized
    }

    /// Stores `value` under `key` if the table recognizes both. Returns whether it did.
    pub fn set(&mut self, key: &str, value: OptionValue) -> bool {
        match self
            .recognized
            .iter()
            .find(|spec| spec.key == key && spec.kind == value.kind())
        {
            Some(spec) => {
                self.values.insert(spec.key, value);
                true
            }
            None => false,
        }
    }

    /// Real option or `default`.
    pub fn real_or(&self, key: &str, default: Real) -> Real {
        match self.values.get(key) {
            Some(OptionValue::Real(v)) => *v,
            _ => default,
        }
    }

    /// Integer option or `default`.
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            Some(OptionValue::Int(v)) => *v,
            _ => default,
        }
    }

    /// Boolean option or `default`.
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(OptionValue::Bool(v)) => *v,
            _ => default,
        }
    }

    /// String option or `default`.
    pub fn str_or<'s>(&'s self, key: &str, default: &'s str) -> &'s str {
        match self.values.get(key) {
            Some(OptionValue::Str(v)) => v.as_str(),
            _ => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TABLE: [OptionSpec; 3] = [
        OptionSpec::new("mu_init", OptionKind::Real),
        OptionSpec::new("max_outer_iterations", OptionKind::Int),
        OptionSpec::new("hessian_approximation", OptionKind::Str),
    ];

    #[test]
    fn test_recognized_keys_are_stored() {
        let mut options = AdvancedOptions::new(&TABLE);
        assert!(options.set("mu_init", OptionValue::Real(0.5)));
        assert!(options.set("max_outer_iterations", OptionValue::Int(7)));
        assert_eq!(options.real_or("mu_init", 0.1), 0.5);
        assert_eq!(options.int_or("max_outer_iterations", 1), 7);
        assert_eq!(options.str_or("hessian_approximation", "bfgs"), "bfgs");
    }

    #[test]
    fn test_unknown_key_or_wrong_kind_is_rejected() {
        let mut options = AdvancedOptions::new(&TABLE);
        assert!(!options.set("no_such_option", OptionValue::Bool(true)));
        assert!(!options.set("mu_init", OptionValue::Int(1)));
        assert_eq!(options.real_or("mu_init", 0.1), 0.1);
        assert!(!options.bool_or("no_such_option", false));
    }
}
