//! Sweep kernels and the sweeper abstraction used by source iteration.

pub mod step;
pub use step::StepTransport;

use crate::data::{PsiBoundData, PsiData};
use crate::error::SchurError;
use crate::mesh::PartitionMesh;

/// Rank-local transport kernel.
pub trait Transport {
    fn n_groups(&self) -> usize;

    /// Invert the streaming-plus-collision operator on this partition.
    ///
    /// `psi_bound` supplies the incoming flux on every side; `psi` is
    /// overwritten.
    fn sweep(&self, psi: &mut PsiData, source: &PsiData, psi_bound: &PsiBoundData) -> Result<(), SchurError>;

    /// External source of the problem.
    fn problem_source(&self, source: &mut PsiData);

    /// `total = external + scattering(psi)`.
    fn scattering_source(&self, psi: &PsiData, external: &PsiData, total: &mut PsiData);

    /// Write the physical inflow onto domain-boundary sides. Partition sides
    /// are left alone.
    fn apply_inflow(&self, _psi_bound: &mut PsiBoundData) {}
}

impl<T: Transport + ?Sized> Transport for &T {
    fn n_groups(&self) -> usize {
        (**self).n_groups()
    }
    fn sweep(&self, psi: &mut PsiData, source: &PsiData, psi_bound: &PsiBoundData) -> Result<(), SchurError> {
        (**self).sweep(psi, source, psi_bound)
    }
    fn problem_source(&self, source: &mut PsiData) {
        (**self).problem_source(source)
    }
    fn scattering_source(&self, psi: &PsiData, external: &PsiData, total: &mut PsiData) {
        (**self).scattering_source(psi, external, total)
    }
    fn apply_inflow(&self, psi_bound: &mut PsiBoundData) {
        (**self).apply_inflow(psi_bound)
    }
}

/// Something source iteration can sweep with.
pub trait Sweeper {
    /// Sweep `source` into `psi`.
    ///
    /// With `homogeneous` set, every boundary contribution is dropped, leaving
    /// the part of the sweep that is linear in `source`.
    fn sweep(&mut self, psi: &mut PsiData, source: &PsiData, homogeneous: bool) -> Result<(), SchurError>;
}

/// Sweeper over a fixed boundary flux, no communication.
pub struct BoundarySweep<'a, T: Transport> {
    transport: &'a T,
    psi_bound: &'a PsiBoundData,
    zero_bound: PsiBoundData,
}

impl<'a, T: Transport> BoundarySweep<'a, T> {
    pub fn new(transport: &'a T, psi_bound: &'a PsiBoundData) -> Self {
        Self {
            transport,
            psi_bound,
            zero_bound: PsiBoundData::zeros_like(psi_bound),
        }
    }
}

impl<T: Transport> Sweeper for BoundarySweep<'_, T> {
    fn sweep(&mut self, psi: &mut PsiData, source: &PsiData, homogeneous: bool) -> Result<(), SchurError> {
        let bound = if homogeneous { &self.zero_bound } else { self.psi_bound };
        self.transport.sweep(psi, source, bound)
    }
}

/// Zeroed volumetric field sized for `mesh`.
pub fn new_psi(mesh: &impl PartitionMesh, n_groups: usize) -> PsiData {
    PsiData::new(mesh.n_vertices_per_cell(), mesh.n_angles(), mesh.n_cells(), n_groups)
}

/// Zeroed side field sized for `mesh`.
pub fn new_psi_bound(mesh: &impl PartitionMesh, n_groups: usize) -> PsiBoundData {
    PsiBoundData::new(n_groups, mesh.n_vertices_per_face(), mesh.n_angles(), mesh.n_sides())
}
