//! Solver configuration.

pub mod options;
pub use options::{InnerMethod, SchurOptions, SourceIterationOptions};
