//! Unpreconditioned Richardson iteration, `x ← x + (b − A x)`.
//!
//! For a boundary operator `A = I − S` this is the plain re-sweep loop
//! `x ← S x + b`, kept for comparison against GMRES.

use crate::core::traits::Operator;
use crate::error::SchurError;
use crate::parallel::Comm;
use crate::solver::LinearSolver;
use crate::utils::convergence::{Convergence, SolveStats};

pub struct RichardsonSolver {
    pub conv: Convergence<f64>,
    pub nonzero_guess: bool,
}

impl RichardsonSolver {
    pub fn new(tol: f64, max_iters: usize) -> Self {
        Self {
            conv: Convergence::new(tol, max_iters),
            nonzero_guess: false,
        }
    }

    pub fn with_nonzero_guess(mut self, nonzero: bool) -> Self {
        self.nonzero_guess = nonzero;
        self
    }
}

impl LinearSolver for RichardsonSolver {
    fn solve(
        &mut self,
        op: &mut dyn Operator,
        comm: &dyn Comm,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<SolveStats<f64>, SchurError> {
        if b.len() != x.len() {
            return Err(SchurError::VectorSize { expected: b.len(), actual: x.len() });
        }
        let b_norm = comm.norm(b);
        let mut r = vec![0.0; b.len()];
        let mut history = Vec::new();
        if !self.nonzero_guess {
            x.fill(0.0);
        }
        let mut iteration = 0;
        loop {
            if iteration == 0 && !self.nonzero_guess {
                r.copy_from_slice(b);
            } else {
                op.apply(x, &mut r)?;
                for (ri, bi) in r.iter_mut().zip(b) {
                    *ri = bi - *ri;
                }
            }
            let res_norm = comm.norm(&r);
            history.push(res_norm);
            if let Some(reason) = self.conv.check(res_norm, b_norm, iteration) {
                return Ok(SolveStats::new(iteration, res_norm, reason, history));
            }
            for (xi, ri) in x.iter_mut().zip(&r) {
                *xi += ri;
            }
            iteration += 1;
        }
    }
}
