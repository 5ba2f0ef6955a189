//! Generalized Minimal Residual (GMRES) solver with fixed restart (Saad §6.4)
//!
//! Matrix-free and distributed: the operator is only applied, and every inner
//! product goes through [`Comm::dot`], so all ranks see the same scalars and
//! take the same branches. The operator is therefore applied the same number
//! of times on every rank.
//!
//! # Features
//! - Double (iterative) modified Gram-Schmidt orthogonalization
//! - Happy breakdown detection for early termination
//! - Givens rotations for the least-squares update
//! - Back-substitution with zero-pivot protection
//! - True residual recomputed only at restarts
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.4

use faer::Mat;
use log::trace;

use crate::core::traits::Operator;
use crate::error::SchurError;
use crate::parallel::Comm;
use crate::solver::LinearSolver;
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats};

const BREAKDOWN_TOL: f64 = 1e-14;

pub struct GmresSolver {
    /// Number of Arnoldi vectors before restart
    pub restart: usize,
    /// Convergence criteria (tolerance and max iterations)
    pub conv: Convergence<f64>,
    /// Use the incoming `x` as initial guess; otherwise start from zero
    pub nonzero_guess: bool,
}

impl GmresSolver {
    pub fn new(restart: usize, tol: f64, max_iters: usize) -> Self {
        Self {
            restart: restart.max(1),
            conv: Convergence::new(tol, max_iters),
            nonzero_guess: false,
        }
    }

    pub fn with_nonzero_guess(mut self, nonzero: bool) -> Self {
        self.nonzero_guess = nonzero;
        self
    }

    /// One Arnoldi step: `h[.., j]` and the next basis vector.
    /// Returns true on happy breakdown.
    fn arnoldi(
        op: &mut dyn Operator,
        comm: &dyn Comm,
        v_basis: &mut Vec<Vec<f64>>,
        h: &mut Mat<f64>,
        j: usize,
    ) -> Result<bool, SchurError> {
        let n = v_basis[j].len();
        let mut w = vec![0.0; n];
        op.apply(&v_basis[j], &mut w)?;
        let w_norm = comm.norm(&w);
        for _pass in 0..2 {
            for i in 0..=j {
                let hij = comm.dot(&w, &v_basis[i]);
                h[(i, j)] += hij;
                for (wk, vik) in w.iter_mut().zip(&v_basis[i]) {
                    *wk -= hij * vik;
                }
            }
        }
        let h_next = comm.norm(&w);
        h[(j + 1, j)] = h_next;
        if h_next <= BREAKDOWN_TOL * w_norm {
            return Ok(true);
        }
        v_basis.push(w.iter().map(|wi| wi / h_next).collect());
        Ok(false)
    }

    fn apply_givens_and_update_g(h: &mut Mat<f64>, g: &mut [f64], cs: &mut [f64], sn: &mut [f64], j: usize) {
        for i in 0..j {
            let temp = cs[i] * h[(i, j)] + sn[i] * h[(i + 1, j)];
            h[(i + 1, j)] = -sn[i] * h[(i, j)] + cs[i] * h[(i + 1, j)];
            h[(i, j)] = temp;
        }
        let h_kk = h[(j, j)];
        let h_k1k = h[(j + 1, j)];
        let r = h_kk.hypot(h_k1k);
        if r == 0.0 {
            cs[j] = 1.0;
            sn[j] = 0.0;
        } else {
            cs[j] = h_kk / r;
            sn[j] = h_k1k / r;
        }
        h[(j, j)] = cs[j] * h_kk + sn[j] * h_k1k;
        h[(j + 1, j)] = 0.0;
        let temp = cs[j] * g[j] + sn[j] * g[j + 1];
        g[j + 1] = -sn[j] * g[j] + cs[j] * g[j + 1];
        g[j] = temp;
    }

    /// Solve the leading `m × m` upper-triangular system `H y = g`.
    fn back_substitution(h: &Mat<f64>, g: &[f64], m: usize) -> Vec<f64> {
        let mut y = vec![0.0; m];
        for i in (0..m).rev() {
            let mut yi = g[i];
            for k in (i + 1)..m {
                yi -= h[(i, k)] * y[k];
            }
            y[i] = if h[(i, i)].abs() > f64::MIN_POSITIVE {
                yi / h[(i, i)]
            } else {
                0.0
            };
        }
        y
    }

    fn residual(
        op: &mut dyn Operator,
        b: &[f64],
        x: &[f64],
        r: &mut [f64],
    ) -> Result<(), SchurError> {
        op.apply(x, r)?;
        for (ri, bi) in r.iter_mut().zip(b) {
            *ri = bi - *ri;
        }
        Ok(())
    }
}

impl LinearSolver for GmresSolver {
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
        let n = b.len();
        let b_norm = comm.norm(b);
        let mut r = vec![0.0; n];
        if self.nonzero_guess {
            Self::residual(op, b, x, &mut r)?;
        } else {
            x.fill(0.0);
            r.copy_from_slice(b);
        }
        let mut beta = comm.norm(&r);
        let mut history = vec![beta];
        if let Some(reason) = self.conv.check(beta, b_norm, 0) {
            return Ok(SolveStats::new(0, beta, reason, history));
        }

        let restart = self.restart;
        let mut iteration = 0;
        loop {
            let mut v_basis: Vec<Vec<f64>> = Vec::with_capacity(restart + 1);
            v_basis.push(r.iter().map(|ri| ri / beta).collect());
            let mut h = Mat::<f64>::zeros(restart + 1, restart);
            let mut g = vec![0.0; restart + 1];
            g[0] = beta;
            let mut cs = vec![0.0; restart];
            let mut sn = vec![0.0; restart];
            let mut m = 0;
            let mut stop = None;
            for j in 0..restart {
                iteration += 1;
                let breakdown = Self::arnoldi(op, comm, &mut v_basis, &mut h, j)?;
                Self::apply_givens_and_update_g(&mut h, &mut g, &mut cs, &mut sn, j);
                let res_norm = g[j + 1].abs();
                history.push(res_norm);
                trace!("gmres it {iteration}: residual {res_norm:e}");
                m = j + 1;
                stop = self.conv.check(res_norm, b_norm, iteration);
                if breakdown && !matches!(stop, Some(ConvergedReason::Rtol | ConvergedReason::Atol)) {
                    stop = Some(ConvergedReason::HappyBreakdown);
                }
                if stop.is_some() {
                    break;
                }
            }
            let y = Self::back_substitution(&h, &g, m);
            for (yj, vj) in y.iter().zip(&v_basis) {
                for (xi, vji) in x.iter_mut().zip(vj) {
                    *xi += yj * vji;
                }
            }
            if let Some(reason) = stop {
                return Ok(SolveStats::new(iteration, g[m].abs(), reason, history));
            }
            // restart from the true residual
            Self::residual(op, b, x, &mut r)?;
            beta = comm.norm(&r);
            if let Some(reason) = self.conv.check(beta, b_norm, iteration) {
                return Ok(SolveStats::new(iteration, beta, reason, history));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wrappers::FnOperator;
    use crate::parallel::SerialComm;

    fn dense_op(a: Vec<Vec<f64>>) -> impl Operator {
        FnOperator::new(move |x: &[f64], y: &mut [f64]| {
            for (yi, row) in y.iter_mut().zip(&a) {
                *yi = row.iter().zip(x).map(|(aij, xj)| aij * xj).sum();
            }
            Ok(())
        })
    }

    fn system() -> (Vec<Vec<f64>>, Vec<f64>, Vec<f64>) {
        // A = [[4,1,0,0],[1,3,1,0],[0,1,2,1],[0,0,1,3]], x_true = [1,2,3,4]
        let a = vec![
            vec![4.0, 1.0, 0.0, 0.0],
            vec![1.0, 3.0, 1.0, 0.0],
            vec![0.0, 1.0, 2.0, 1.0],
            vec![0.0, 0.0, 1.0, 3.0],
        ];
        let x_true = vec![1.0, 2.0, 3.0, 4.0];
        let b = a
            .iter()
            .map(|row| row.iter().zip(&x_true).map(|(aij, xj)| aij * xj).sum())
            .collect();
        (a, x_true, b)
    }

    #[test]
    fn gmres_solves_well_conditioned_nonsym() {
        let (a, x_true, b) = system();
        let mut op = dense_op(a);
        let mut x = vec![0.0; 4];
        let mut solver = GmresSolver::new(4, 1e-10, 100);
        let stats = solver.solve(&mut op, &SerialComm, &b, &mut x).unwrap();
        for (xi, ei) in x.iter().zip(x_true.iter()) {
            assert!((xi - ei).abs() < 1e-8, "xi = {}, expected = {}", xi, ei);
        }
        assert!(stats.converged, "GMRES did not converge");
        assert!(stats.iterations <= 4);
        assert_eq!(stats.residual_history.len(), stats.iterations + 1);
    }

    #[test]
    fn gmres_restarts_and_still_converges() {
        let (a, x_true, b) = system();
        let mut op = dense_op(a);
        let mut x = vec![0.0; 4];
        let mut solver = GmresSolver::new(2, 1e-10, 200);
        let stats = solver.solve(&mut op, &SerialComm, &b, &mut x).unwrap();
        assert!(stats.converged);
        for (xi, ei) in x.iter().zip(x_true.iter()) {
            assert!((xi - ei).abs() < 1e-7);
        }
    }

    #[test]
    fn zero_rhs_converges_without_iterating() {
        let (a, _, _) = system();
        let mut op = dense_op(a);
        let mut x = vec![5.0; 4];
        let stats = GmresSolver::new(4, 1e-8, 10)
            .solve(&mut op, &SerialComm, &[0.0; 4], &mut x)
            .unwrap();
        assert_eq!(stats.iterations, 0);
        assert!(stats.converged);
        assert_eq!(x, vec![0.0; 4]);
    }

    #[test]
    fn exact_initial_guess_needs_no_iterations() {
        let (a, x_true, b) = system();
        let mut op = dense_op(a);
        let mut x = x_true.clone();
        let stats = GmresSolver::new(4, 1e-8, 10)
            .with_nonzero_guess(true)
            .solve(&mut op, &SerialComm, &b, &mut x)
            .unwrap();
        assert_eq!(stats.iterations, 0);
        assert!(stats.converged);
    }

    #[test]
    fn identity_breaks_down_happily() {
        let mut op = FnOperator::new(|x: &[f64], y: &mut [f64]| {
            y.copy_from_slice(x);
            Ok(())
        });
        let b = vec![1.0, -2.0, 0.5];
        let mut x = vec![0.0; 3];
        let stats = GmresSolver::new(10, 1e-300, 10).solve(&mut op, &SerialComm, &b, &mut x).unwrap();
        assert_eq!(stats.iterations, 1);
        assert!(stats.converged);
        for (xi, bi) in x.iter().zip(&b) {
            assert!((xi - bi).abs() < 1e-14);
        }
    }

    #[test]
    fn iteration_cap_is_not_an_error() {
        let (a, _, b) = system();
        let mut op = dense_op(a);
        let mut x = vec![0.0; 4];
        let stats = GmresSolver::new(4, 1e-14, 1).solve(&mut op, &SerialComm, &b, &mut x).unwrap();
        assert_eq!(stats.iterations, 1);
        assert!(!stats.converged);
        assert_eq!(stats.reason, ConvergedReason::MaxIterations);
    }
}
