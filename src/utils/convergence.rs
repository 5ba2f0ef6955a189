//! Convergence tracking & tolerance checks for iterative solvers.

use num_traits::Float;

/// Why an iterative solve stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvergedReason {
    /// Residual fell below `rtol * ||b||`.
    Rtol,
    /// Residual fell below the absolute floor (zero right-hand side).
    Atol,
    /// The Krylov space became invariant; the iterate is exact.
    HappyBreakdown,
    /// Iteration cap reached without meeting the tolerance.
    MaxIterations,
}

impl ConvergedReason {
    pub fn is_converged(self) -> bool {
        !matches!(self, ConvergedReason::MaxIterations)
    }
}

/// Stopping criteria.
#[derive(Clone, Debug)]
pub struct Convergence<T> {
    pub rtol: T,
    pub atol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
    pub reason: ConvergedReason,
    /// Residual norm before the first iteration and after each one.
    pub residual_history: Vec<T>,
}

impl<T: Float> SolveStats<T> {
    pub fn new(iterations: usize, final_residual: T, reason: ConvergedReason, residual_history: Vec<T>) -> Self {
        Self {
            iterations,
            final_residual,
            converged: reason.is_converged(),
            reason,
            residual_history,
        }
    }
}

impl<T: Float> Convergence<T> {
    pub fn new(rtol: T, max_iters: usize) -> Self {
        Self {
            rtol,
            atol: num_traits::cast::<f64, T>(1e-50).unwrap_or_else(T::min_positive_value),
            max_iters,
        }
    }

    /// Returns the stop reason, if any, given the current `res_norm`, the
    /// right-hand side norm `b_norm` and iteration count `i`.
    pub fn check(&self, res_norm: T, b_norm: T, i: usize) -> Option<ConvergedReason> {
        if b_norm > T::zero() && res_norm <= self.rtol * b_norm {
            Some(ConvergedReason::Rtol)
        } else if res_norm <= self.atol {
            Some(ConvergedReason::Atol)
        } else if i >= self.max_iters {
            Some(ConvergedReason::MaxIterations)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_test_uses_rhs_norm() {
        let conv = Convergence::new(1e-6, 10);
        assert_eq!(conv.check(1e-7, 1.0, 1), Some(ConvergedReason::Rtol));
        assert_eq!(conv.check(1e-5, 1.0, 1), None);
        assert_eq!(conv.check(1e-5, 1.0, 10), Some(ConvergedReason::MaxIterations));
    }

    #[test]
    fn zero_rhs_falls_back_to_absolute_floor() {
        let conv = Convergence::new(1e-6_f64, 10);
        assert_eq!(conv.check(0.0, 0.0, 0), Some(ConvergedReason::Atol));
        assert_eq!(conv.check(1e-3, 0.0, 0), None);
    }
}
