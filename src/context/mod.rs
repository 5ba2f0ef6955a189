//! Context types for configuring and running the boundary Krylov solve.
//!
//! Modules:
//! - [`ksp_context`]: the `KrylovSolver` context and `SolverKind` selection.
//!
//! # References
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

pub mod ksp_context;
pub use ksp_context::{KrylovSolver, SolverKind};
