//! Building blocks shared by the backend solve loops.

pub mod limited_memory;
pub mod line_search;
pub mod report;

pub use limited_memory::LimitedMemory;
pub use line_search::{backtracking, weak_wolfe, LineSearchParams, LineSearchResult};
pub use report::{SolveReport, TerminationReason};
