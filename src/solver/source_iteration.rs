//! Volumetric source iteration: converge the scattering source around a
//! sweeper, by fixed point or with GMRES acceleration.

use log::{debug, warn};

use crate::config::{InnerMethod, SourceIterationOptions};
use crate::core::traits::Operator;
use crate::data::PsiData;
use crate::error::SchurError;
use crate::parallel::Comm;
use crate::solver::{GmresSolver, LinearSolver};
use crate::transport::{Sweeper, Transport};

#[derive(Debug, Clone)]
pub struct SourceIteration {
    opts: SourceIterationOptions,
}

impl SourceIteration {
    pub fn new(opts: &SourceIterationOptions) -> Self {
        Self { opts: opts.clone() }
    }

    /// Run the configured method. `psi` holds the starting iterate on entry
    /// and the converged flux on return. Returns the number of sweeps.
    pub fn iterate<S, T, C>(
        &self,
        sweeper: &mut S,
        transport: &T,
        comm: &C,
        psi: &mut PsiData,
        source: &PsiData,
    ) -> Result<usize, SchurError>
    where
        S: Sweeper,
        T: Transport,
        C: Comm,
    {
        match self.opts.method {
            InnerMethod::FixedPoint => self.fixed_point(sweeper, transport, comm, psi, source),
            InnerMethod::Krylov => self.krylov(sweeper, transport, comm, psi, source),
        }
    }

    /// `psi ← sweep(source + scatter(psi))` until the relative L1 change of
    /// `psi`, summed over all ranks, drops below the tolerance.
    pub fn fixed_point<S, T, C>(
        &self,
        sweeper: &mut S,
        transport: &T,
        comm: &C,
        psi: &mut PsiData,
        source: &PsiData,
    ) -> Result<usize, SchurError>
    where
        S: Sweeper,
        T: Transport,
        C: Comm,
    {
        let mut total = PsiData::zeros_like(source);
        let mut psi_old = psi.clone();
        for iter in 1..=self.opts.max_iters {
            transport.scattering_source(psi, source, &mut total);
            sweeper.sweep(psi, &total, false)?;

            let (diff, norm) = psi
                .as_slice()
                .iter()
                .zip(psi_old.as_slice())
                .fold((0.0, 0.0), |(d, n), (new, old)| (d + (new - old).abs(), n + new.abs()));
            let diff = comm.all_reduce(diff);
            let norm = comm.all_reduce(norm);
            let err = if norm > 0.0 { diff / norm } else { diff };
            if comm.rank() == 0 {
                debug!("source iteration {iter}: relative change {err:e}");
            }
            if err < self.opts.tol {
                return Ok(iter);
            }
            psi_old.as_mut_slice().copy_from_slice(psi.as_slice());
        }
        if comm.rank() == 0 {
            warn!("source iteration hit the cap of {} sweeps", self.opts.max_iters);
        }
        Ok(self.opts.max_iters)
    }

    /// Solve `(I − D⁻¹ S) psi = D⁻¹ q` with GMRES, where `D⁻¹` is a boundary-free
    /// sweep and `S` the scattering operator, then finish with one full sweep.
    ///
    /// Returns the GMRES iteration count plus the right-hand-side and final sweeps.
    pub fn krylov<S, T, C>(
        &self,
        sweeper: &mut S,
        transport: &T,
        comm: &C,
        psi: &mut PsiData,
        source: &PsiData,
    ) -> Result<usize, SchurError>
    where
        S: Sweeper,
        T: Transport,
        C: Comm,
    {
        let mut rhs = PsiData::zeros_like(psi);
        sweeper.sweep(&mut rhs, source, false)?;

        let mut x = psi.as_slice().to_vec();
        let stats = {
            let mut op = ScatterSweepOperator::new(sweeper, transport, psi);
            GmresSolver::new(self.opts.restart, self.opts.tol, self.opts.max_iters)
                .with_nonzero_guess(true)
                .solve(&mut op, comm, rhs.as_slice(), &mut x)?
        };
        if comm.rank() == 0 {
            debug!(
                "krylov source iteration: {} iterations, residual {:e}",
                stats.iterations, stats.final_residual
            );
            if !stats.converged {
                warn!("krylov source iteration stopped at the iteration cap");
            }
        }

        psi.as_mut_slice().copy_from_slice(&x);
        let mut total = PsiData::zeros_like(source);
        transport.scattering_source(psi, source, &mut total);
        sweeper.sweep(psi, &total, false)?;
        Ok(stats.iterations + 2)
    }
}

/// `v ↦ v − sweep₀(scatter(v))`, the linear part of one source iteration.
struct ScatterSweepOperator<'a, S, T> {
    sweeper: &'a mut S,
    transport: &'a T,
    v: PsiData,
    swept: PsiData,
    scatter: PsiData,
    zero: PsiData,
}

impl<'a, S: Sweeper, T: Transport> ScatterSweepOperator<'a, S, T> {
    fn new(sweeper: &'a mut S, transport: &'a T, like: &PsiData) -> Self {
        Self {
            sweeper,
            transport,
            v: PsiData::zeros_like(like),
            swept: PsiData::zeros_like(like),
            scatter: PsiData::zeros_like(like),
            zero: PsiData::zeros_like(like),
        }
    }
}

impl<S: Sweeper, T: Transport> Operator for ScatterSweepOperator<'_, S, T> {
    fn apply(&mut self, x: &[f64], y: &mut [f64]) -> Result<(), SchurError> {
        let n = self.v.as_slice().len();
        if x.len() != n || y.len() != n {
            return Err(SchurError::VectorSize { expected: n, actual: x.len().min(y.len()) });
        }
        self.v.as_mut_slice().copy_from_slice(x);
        self.transport.scattering_source(&self.v, &self.zero, &mut self.scatter);
        self.sweeper.sweep(&mut self.swept, &self.scatter, true)?;
        for ((yi, xi), si) in y.iter_mut().zip(x).zip(self.swept.as_slice()) {
            *yi = xi - si;
        }
        Ok(())
    }
}
