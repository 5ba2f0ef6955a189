//! Upwind step-characteristic sweep over [`CartesianMesh`].
//!
//! One flat value per cell, angle and group, copied to the four cell vertices.
//! Within-group isotropic scattering, isotropic external source and inflow.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::Transport;
use crate::data::{PsiBoundData, PsiData};
use crate::error::SchurError;
use crate::mesh::cartesian::{EAST, NORTH, SOUTH, WEST};
use crate::mesh::{CartesianMesh, FaceNeighbor, PartitionMesh};

#[derive(Debug, Clone)]
pub struct StepTransport {
    mesh: CartesianMesh,
    sigma_t: Vec<f64>,
    sigma_s: Vec<f64>,
    source: Vec<f64>,
    inflow: Vec<f64>,
}

impl StepTransport {
    /// Cross sections, source and inflow are given per group.
    pub fn new(
        mesh: CartesianMesh,
        sigma_t: Vec<f64>,
        sigma_s: Vec<f64>,
        source: Vec<f64>,
        inflow: Vec<f64>,
    ) -> Result<Self, SchurError> {
        let n = sigma_t.len();
        if n == 0 || sigma_s.len() != n || source.len() != n || inflow.len() != n {
            return Err(SchurError::Config(format!(
                "per-group data must share one non-zero length (sigma_t {}, sigma_s {}, source {}, inflow {})",
                sigma_t.len(),
                sigma_s.len(),
                source.len(),
                inflow.len()
            )));
        }
        if sigma_t.iter().zip(&sigma_s).any(|(&t, &s)| t < 0.0 || s < 0.0 || s > t) {
            return Err(SchurError::Config("need 0 <= sigma_s <= sigma_t in every group".into()));
        }
        Ok(Self { mesh, sigma_t, sigma_s, source, inflow })
    }

    /// One group, no scattering.
    pub fn single_group(mesh: CartesianMesh, sigma_t: f64, source: f64, inflow: f64) -> Result<Self, SchurError> {
        Self::new(mesh, vec![sigma_t], vec![0.0], vec![source], vec![inflow])
    }

    pub fn mesh(&self) -> &CartesianMesh {
        &self.mesh
    }

    fn side_average(&self, bound: &PsiBoundData, group: usize, angle: usize, side: usize) -> f64 {
        let nfv = bound.n_face_vertices();
        (0..nfv).map(|fv| bound[(group, fv, angle, side)]).sum::<f64>() / nfv as f64
    }

    /// Cell values for one angle, indexed `cell + n_cells * group`.
    fn sweep_angle(&self, angle: usize, source: &PsiData, bound: &PsiBoundData) -> Vec<f64> {
        let mesh = &self.mesh;
        let n_cells = mesh.n_cells();
        let (lnx, lny) = mesh.local_extent();
        let [mu, eta] = mesh.quadrature().direction(angle);
        let (cx, cy) = (mu.abs() / mesh.dx(), eta.abs() / mesh.dy());
        let x_face = if mu > 0.0 { WEST } else { EAST };
        let y_face = if eta > 0.0 { SOUTH } else { NORTH };

        let mut out = vec![0.0; n_cells * self.n_groups()];
        for group in 0..self.n_groups() {
            let values = &mut out[group * n_cells..(group + 1) * n_cells];
            for jj in 0..lny {
                let j = if eta > 0.0 { jj } else { lny - 1 - jj };
                for ii in 0..lnx {
                    let i = if mu > 0.0 { ii } else { lnx - 1 - ii };
                    let cell = mesh.cell_index(i, j);
                    let upwind = |face: usize, values: &[f64]| match mesh.neighbor(cell, face) {
                        FaceNeighbor::Cell(adj) => values[adj],
                        FaceNeighbor::Partition { side, .. } | FaceNeighbor::Domain { side } => {
                            self.side_average(bound, group, angle, side)
                        }
                    };
                    let psi_x = upwind(x_face, values);
                    let psi_y = upwind(y_face, values);
                    let q = source.vertices(angle, cell, group).iter().sum::<f64>()
                        / mesh.n_vertices_per_cell() as f64;
                    values[cell] = (q + cx * psi_x + cy * psi_y) / (self.sigma_t[group] + cx + cy);
                }
            }
        }
        out
    }

    fn check_shape(&self, psi: &PsiData) -> Result<(), SchurError> {
        let mesh = &self.mesh;
        if psi.n_cells() != mesh.n_cells()
            || psi.n_angles() != mesh.n_angles()
            || psi.n_groups() != self.n_groups()
            || psi.n_vertices() != mesh.n_vertices_per_cell()
        {
            return Err(SchurError::Mesh("flux field does not match the mesh".into()));
        }
        Ok(())
    }
}

impl Transport for StepTransport {
    fn n_groups(&self) -> usize {
        self.sigma_t.len()
    }

    fn sweep(&self, psi: &mut PsiData, source: &PsiData, psi_bound: &PsiBoundData) -> Result<(), SchurError> {
        self.check_shape(psi)?;
        self.check_shape(source)?;
        if psi_bound.n_sides() != self.mesh.n_sides() || psi_bound.n_groups() != self.n_groups() {
            return Err(SchurError::Mesh("side field does not match the mesh".into()));
        }

        let n_angles = self.mesh.n_angles();
        #[cfg(feature = "rayon")]
        let per_angle: Vec<Vec<f64>> = (0..n_angles)
            .into_par_iter()
            .map(|angle| self.sweep_angle(angle, source, psi_bound))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let per_angle: Vec<Vec<f64>> = (0..n_angles)
            .map(|angle| self.sweep_angle(angle, source, psi_bound))
            .collect();

        let n_cells = self.mesh.n_cells();
        for (angle, values) in per_angle.iter().enumerate() {
            for group in 0..self.n_groups() {
                for cell in 0..n_cells {
                    psi.vertices_mut(angle, cell, group).fill(values[cell + n_cells * group]);
                }
            }
        }
        Ok(())
    }

    fn problem_source(&self, source: &mut PsiData) {
        for group in 0..self.n_groups() {
            for cell in 0..source.n_cells() {
                for angle in 0..source.n_angles() {
                    source.vertices_mut(angle, cell, group).fill(self.source[group]);
                }
            }
        }
    }

    fn scattering_source(&self, psi: &PsiData, external: &PsiData, total: &mut PsiData) {
        let quad = self.mesh.quadrature();
        let nv = psi.n_vertices() as f64;
        for group in 0..self.n_groups() {
            for cell in 0..psi.n_cells() {
                let phi: f64 = (0..psi.n_angles())
                    .map(|a| quad.weight(a) * psi.vertices(a, cell, group).iter().sum::<f64>() / nv)
                    .sum();
                let scatter = self.sigma_s[group] * phi;
                for angle in 0..psi.n_angles() {
                    let ext = external.vertices(angle, cell, group);
                    for (t, &e) in total.vertices_mut(angle, cell, group).iter_mut().zip(ext) {
                        *t = e + scatter;
                    }
                }
            }
        }
    }

    fn apply_inflow(&self, psi_bound: &mut PsiBoundData) {
        let mesh = &self.mesh;
        for cell in 0..mesh.n_cells() {
            for face in 0..mesh.n_faces_per_cell() {
                let FaceNeighbor::Domain { side } = mesh.neighbor(cell, face) else {
                    continue;
                };
                for angle in 0..mesh.n_angles() {
                    if !mesh.is_incoming(angle, cell, face) {
                        continue;
                    }
                    for fv in 0..mesh.n_vertices_per_face() {
                        for group in 0..self.n_groups() {
                            psi_bound[(group, fv, angle, side)] = self.inflow[group];
                        }
                    }
                }
            }
        }
    }
}
