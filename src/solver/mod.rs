//! Iterative solver interfaces.

use crate::core::traits::Operator;
use crate::error::SchurError;
use crate::parallel::Comm;
use crate::utils::convergence::SolveStats;

/// Common interface for the matrix-free iterative solvers.
pub trait LinearSolver {
    /// Solve A·x = b, writing the result into `x`.
    /// Returns iteration stats (including convergence info).
    fn solve(
        &mut self,
        op: &mut dyn Operator,
        comm: &dyn Comm,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<SolveStats<f64>, SchurError>;
}

pub mod gmres;
pub use gmres::GmresSolver;

pub mod richardson;
pub use richardson::RichardsonSolver;

pub mod source_iteration;
pub use source_iteration::SourceIteration;
