//! Core operator traits for schur-sweep.

use crate::error::SchurError;

/// Matrix-free linear (or affine) map: y ← A x.
///
/// Applying the operator may run sweeps and exchange data with other ranks, so
/// it takes `&mut self` and can fail. Distributed operators must be applied the
/// same number of times on every rank.
pub trait Operator {
    /// Compute y = A · x.
    fn apply(&mut self, x: &[f64], y: &mut [f64]) -> Result<(), SchurError>;
}

impl<O: Operator + ?Sized> Operator for &mut O {
    fn apply(&mut self, x: &[f64], y: &mut [f64]) -> Result<(), SchurError> {
        (**self).apply(x, y)
    }
}
