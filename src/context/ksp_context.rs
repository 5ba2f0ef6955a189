//! Krylov solver context for boundary solves.
//!
//! `KrylovSolver` owns the right-hand side and solution vectors of one
//! distributed linear system, selects the iterative method by [`SolverKind`],
//! and remembers the statistics of the last solve. The operator is supplied on
//! every call to [`KrylovSolver::solve`], so it may borrow data that changes
//! between solves.
//!
//! # Usage
//!
//! 1. Construct with the local vector length, tolerance and iteration cap.
//! 2. Fill `rhs_mut()`, optionally `solution_mut()` plus
//!    `set_initial_guess_nonzero()`.
//! 3. Call `solve(op, comm)` and read `solution()`.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

use std::str::FromStr;

use crate::core::traits::Operator;
use crate::error::SchurError;
use crate::parallel::Comm;
use crate::solver::{GmresSolver, LinearSolver, RichardsonSolver};
use crate::utils::convergence::SolveStats;

/// Available iterative methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Restarted GMRES
    Gmres,
    /// Unpreconditioned Richardson (plain fixed-point re-sweeps)
    Richardson,
}

impl FromStr for SolverKind {
    type Err = SchurError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gmres" => Ok(SolverKind::Gmres),
            "richardson" => Ok(SolverKind::Richardson),
            other => Err(SchurError::Config(format!("unknown solver kind `{other}`"))),
        }
    }
}

pub struct KrylovSolver {
    kind: SolverKind,
    tol: f64,
    max_iters: usize,
    restart: usize,
    nonzero_guess: bool,
    rhs: Vec<f64>,
    solution: Vec<f64>,
    last: Option<SolveStats<f64>>,
}

impl KrylovSolver {
    /// `size` is the rank-local vector length.
    pub fn new(size: usize, tol: f64, max_iters: usize) -> Self {
        Self {
            kind: SolverKind::Gmres,
            tol,
            max_iters,
            restart: 30,
            nonzero_guess: false,
            rhs: vec![0.0; size],
            solution: vec![0.0; size],
            last: None,
        }
    }

    pub fn with_kind(mut self, kind: SolverKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = restart;
        self
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    pub fn rhs_mut(&mut self) -> &mut [f64] {
        &mut self.rhs
    }

    pub fn solution(&self) -> &[f64] {
        &self.solution
    }

    pub fn solution_mut(&mut self) -> &mut [f64] {
        &mut self.solution
    }

    /// Start the next solve from the current contents of `solution`.
    pub fn set_initial_guess_nonzero(&mut self) {
        self.nonzero_guess = true;
    }

    /// Solve `op · solution = rhs`. Collective over `comm`.
    ///
    /// Hitting the iteration cap is reported in the returned stats, not as an
    /// error.
    pub fn solve<O, C>(&mut self, op: &mut O, comm: &C) -> Result<SolveStats<f64>, SchurError>
    where
        O: Operator,
        C: Comm,
    {
        let mut solver: Box<dyn LinearSolver> = match self.kind {
            SolverKind::Gmres => Box::new(
                GmresSolver::new(self.restart, self.tol, self.max_iters).with_nonzero_guess(self.nonzero_guess),
            ),
            SolverKind::Richardson => Box::new(
                RichardsonSolver::new(self.tol, self.max_iters).with_nonzero_guess(self.nonzero_guess),
            ),
        };
        let stats = solver.solve(op, comm, &self.rhs, &mut self.solution)?;
        self.last = Some(stats.clone());
        Ok(stats)
    }

    /// Iterations of the last solve.
    pub fn iterations(&self) -> usize {
        self.last.as_ref().map_or(0, |s| s.iterations)
    }

    /// Final residual norm of the last solve.
    pub fn residual_norm(&self) -> f64 {
        self.last.as_ref().map_or(0.0, |s| s.final_residual)
    }

    pub fn last_stats(&self) -> Option<&SolveStats<f64>> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wrappers::FnOperator;
    use crate::parallel::SerialComm;

    fn diag_op() -> impl Operator {
        FnOperator::new(|x: &[f64], y: &mut [f64]| {
            for (i, (yi, xi)) in y.iter_mut().zip(x).enumerate() {
                *yi = (i as f64 + 1.0) * xi;
            }
            Ok(())
        })
    }

    #[test]
    fn solves_and_records_stats() {
        let mut ksp = KrylovSolver::new(3, 1e-12, 50);
        ksp.rhs_mut().copy_from_slice(&[1.0, 2.0, 3.0]);
        let stats = ksp.solve(&mut diag_op(), &SerialComm).unwrap();
        assert!(stats.converged);
        for &v in ksp.solution() {
            assert!((v - 1.0).abs() < 1e-10);
        }
        assert_eq!(ksp.iterations(), stats.iterations);
        assert!(ksp.residual_norm() <= 1e-11);
    }

    #[test]
    fn zero_guess_ignores_stale_solution() {
        let mut ksp = KrylovSolver::new(1, 1e-12, 5);
        ksp.solution_mut()[0] = 100.0;
        ksp.rhs_mut()[0] = 2.0;
        ksp.solve(&mut diag_op(), &SerialComm).unwrap();
        assert!((ksp.solution()[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn parses_kind() {
        assert_eq!("GMRES".parse::<SolverKind>().unwrap(), SolverKind::Gmres);
        assert_eq!("richardson".parse::<SolverKind>().unwrap(), SolverKind::Richardson);
        assert!("cg".parse::<SolverKind>().is_err());
    }
}
