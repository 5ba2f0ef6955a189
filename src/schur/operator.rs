//! Matrix-free Schur-complement operators on the boundary unknowns.
//!
//! Both operators compute `y = x − S(x)`, where `S` reads the boundary guess
//! `x` into the side field, sweeps the partition, exchanges the outgoing side
//! flux with the neighbours and reads the new incoming flux back out. They
//! differ in the sweep: [`SchurOperator`] sweeps a fixed source once,
//! [`SchurOuterOperator`] re-converges the scattering source around the guess
//! with an inner source iteration.

use log::debug;

use super::boundary::BoundaryLayout;
use crate::core::traits::Operator;
use crate::data::{PsiBoundData, PsiData};
use crate::error::SchurError;
use crate::exchange::CommSides;
use crate::mesh::PartitionMesh;
use crate::parallel::{PointToPoint, SerialComm};
use crate::solver::SourceIteration;
use crate::transport::{BoundarySweep, Transport};

/// Borrowed collaborators shared by the operators and drivers.
pub struct Coupling<'a, M, T, C> {
    pub mesh: &'a M,
    pub transport: &'a T,
    pub comm: &'a C,
    pub comm_sides: &'a CommSides,
    pub layout: &'a BoundaryLayout,
}

impl<M, T, C> Clone for Coupling<'_, M, T, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M, T, C> Copy for Coupling<'_, M, T, C> {}

impl<M, T, C> Coupling<'_, M, T, C>
where
    M: PartitionMesh,
    T: Transport,
    C: PointToPoint,
{
    /// Exchange, extract `S(x)` into `y`, and form `y = x − S(x)`.
    fn finish(&self, psi: &PsiData, psi_bound: &mut PsiBoundData, x: &[f64], y: &mut [f64]) -> Result<(), SchurError> {
        self.comm_sides.comm_sides(self.mesh, self.comm, psi, psi_bound)?;
        self.layout.write_vector(psi_bound, y)?;
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi = xi - *yi;
        }
        Ok(())
    }
}

/// `x − exchange(sweep(source, x))` for a fixed volumetric source.
///
/// With a zero source and a side field whose domain-boundary entries are zero
/// the operator is linear.
pub struct SchurOperator<'a, M, T, C> {
    coupling: Coupling<'a, M, T, C>,
    source: &'a PsiData,
    psi: &'a mut PsiData,
    psi_bound: &'a mut PsiBoundData,
    applications: usize,
}

impl<'a, M, T, C> SchurOperator<'a, M, T, C> {
    pub fn new(
        coupling: Coupling<'a, M, T, C>,
        source: &'a PsiData,
        psi: &'a mut PsiData,
        psi_bound: &'a mut PsiBoundData,
    ) -> Self {
        Self { coupling, source, psi, psi_bound, applications: 0 }
    }

    pub fn applications(&self) -> usize {
        self.applications
    }
}

impl<M, T, C> Operator for SchurOperator<'_, M, T, C>
where
    M: PartitionMesh,
    T: Transport,
    C: PointToPoint,
{
    fn apply(&mut self, x: &[f64], y: &mut [f64]) -> Result<(), SchurError> {
        let c = self.coupling;
        c.layout.read_vector(x, self.psi_bound)?;
        c.transport.sweep(self.psi, self.source, self.psi_bound)?;
        c.finish(self.psi, self.psi_bound, x, y)?;
        self.applications += 1;
        Ok(())
    }
}

/// `x − exchange(source_iteration(x))` with a zero external source.
///
/// Each application resets the volumetric flux, converges the scattering
/// source against the boundary guess on this rank alone, and records the
/// number of inner sweeps.
pub struct SchurOuterOperator<'a, M, T, C> {
    coupling: Coupling<'a, M, T, C>,
    inner: &'a SourceIteration,
    psi: &'a mut PsiData,
    psi_bound: &'a mut PsiBoundData,
    zero_source: PsiData,
    inner_counts: Vec<usize>,
}

impl<'a, M, T, C> SchurOuterOperator<'a, M, T, C> {
    pub fn new(
        coupling: Coupling<'a, M, T, C>,
        inner: &'a SourceIteration,
        psi: &'a mut PsiData,
        psi_bound: &'a mut PsiBoundData,
    ) -> Self {
        let zero_source = PsiData::zeros_like(psi);
        Self { coupling, inner, psi, psi_bound, zero_source, inner_counts: Vec::new() }
    }

    /// Inner source iterations of every application so far.
    pub fn inner_counts(&self) -> &[usize] {
        &self.inner_counts
    }

    pub fn into_inner_counts(self) -> Vec<usize> {
        self.inner_counts
    }
}

impl<M, T, C> Operator for SchurOuterOperator<'_, M, T, C>
where
    M: PartitionMesh,
    T: Transport,
    C: PointToPoint,
{
    fn apply(&mut self, x: &[f64], y: &mut [f64]) -> Result<(), SchurError> {
        let c = self.coupling;
        c.layout.read_vector(x, self.psi_bound)?;
        self.psi.set_to_value(0.0);
        let its = {
            let mut sweeper = BoundarySweep::new(c.transport, &*self.psi_bound);
            self.inner
                .iterate(&mut sweeper, c.transport, &SerialComm, self.psi, &self.zero_source)?
        };
        debug!("rank {}: inner source iterations {its}", c.comm.rank());
        self.inner_counts.push(its);
        c.finish(self.psi, self.psi_bound, x, y)
    }
}
