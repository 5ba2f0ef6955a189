//! Operator wrappers and dense assembly.
//!
//! - `faer::Mat<f64>` acts as an [`Operator`] (serial, `y = A x`).
//! - [`FnOperator`] turns a closure into an [`Operator`].
//! - [`assemble_dense`] applies a distributed operator to every global unit
//!   vector and returns the local block of rows, for diagnostics and tests.
//!
//! # References
//! - [faer crate documentation](https://docs.rs/faer)

use faer::Mat;

use crate::core::traits::Operator;
use crate::error::SchurError;
use crate::parallel::Comm;

impl Operator for Mat<f64> {
    fn apply(&mut self, x: &[f64], y: &mut [f64]) -> Result<(), SchurError> {
        if x.len() != self.ncols() {
            return Err(SchurError::VectorSize { expected: self.ncols(), actual: x.len() });
        }
        if y.len() != self.nrows() {
            return Err(SchurError::VectorSize { expected: self.nrows(), actual: y.len() });
        }
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = (0..self.ncols()).map(|j| self[(i, j)] * x[j]).sum();
        }
        Ok(())
    }
}

/// Closure-backed operator.
pub struct FnOperator<F> {
    f: F,
}

impl<F> FnOperator<F>
where
    F: FnMut(&[f64], &mut [f64]) -> Result<(), SchurError>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Operator for FnOperator<F>
where
    F: FnMut(&[f64], &mut [f64]) -> Result<(), SchurError>,
{
    fn apply(&mut self, x: &[f64], y: &mut [f64]) -> Result<(), SchurError> {
        (self.f)(x, y)
    }
}

/// Assemble the rows owned by this rank of a distributed square operator.
///
/// Collective: every rank must call it with its own `local_len`, and the
/// operator is applied once per global column on every rank.
pub fn assemble_dense<O, C>(op: &mut O, comm: &C, local_len: usize) -> Result<Mat<f64>, SchurError>
where
    O: Operator + ?Sized,
    C: Comm + ?Sized,
{
    let mut offset = 0;
    let mut global = 0;
    for r in 0..comm.size() {
        let len = comm.all_reduce_usize(if r == comm.rank() { local_len } else { 0 });
        if r < comm.rank() {
            offset += len;
        }
        global += len;
    }

    let mut a = Mat::<f64>::zeros(local_len, global);
    let mut e = vec![0.0; local_len];
    let mut col = vec![0.0; local_len];
    for j in 0..global {
        e.fill(0.0);
        if (offset..offset + local_len).contains(&j) {
            e[j - offset] = 1.0;
        }
        op.apply(&e, &mut col)?;
        for (i, &v) in col.iter().enumerate() {
            a[(i, j)] = v;
        }
    }
    Ok(a)
}
