//! Schur-complement coupling of partitions through their boundary flux.
//!
//! - [`boundary`]: the unknown vector and its mapping onto the side field.
//! - [`operator`]: the matrix-free operators `x − S(x)`.
//! - [`sweeper`]: the plain driver, a coupled solve per outer source iteration.
//! - [`outer`]: the outer driver, one coupled solve with inner source iteration.

pub mod boundary;
pub mod operator;
pub mod outer;
pub mod sweeper;

pub use boundary::{vector_size, BoundaryLayout, BoundarySlot};
pub use operator::{Coupling, SchurOperator, SchurOuterOperator};
pub use outer::{OuterReport, SchurOuterSweeper};
pub use sweeper::{SchurSweeper, SolveReport};
