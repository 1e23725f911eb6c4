//! Configuration for optimizer backends.

pub mod advanced;
pub mod options;

// Re-export key items
pub use advanced::{AdvancedOptions, OptionKind, OptionSpec, OptionValue};
pub use options::{OptimizerConfig, OptimizerConfigBuilder};
