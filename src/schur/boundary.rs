//! Boundary vector layout: the incoming partition-side flux flattened into the
//! unknown vector of the boundary solve.
//!
//! Slots are enumerated angle, then cell, then group, then face, then face
//! vertex, keeping a `(cell, face)` only when the face is incoming for the
//! angle and the cell across it belongs to another rank. Domain-boundary faces
//! never carry unknowns.

use crate::data::PsiBoundData;
use crate::error::SchurError;
use crate::mesh::{FaceNeighbor, PartitionMesh};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundarySlot {
    pub angle: usize,
    pub cell: usize,
    pub group: usize,
    pub face: usize,
    pub fvrtx: usize,
    pub side: usize,
}

/// Side index of `(cell, face)` if it holds unknowns for `angle`.
fn unknown_side(mesh: &impl PartitionMesh, angle: usize, cell: usize, face: usize) -> Option<usize> {
    if !mesh.is_incoming(angle, cell, face) {
        return None;
    }
    match mesh.neighbor(cell, face) {
        FaceNeighbor::Partition { side, .. } => Some(side),
        _ => None,
    }
}

/// Number of unknowns on this rank.
pub fn vector_size(mesh: &impl PartitionMesh, n_groups: usize) -> usize {
    let mut faces = 0;
    for angle in 0..mesh.n_angles() {
        for cell in 0..mesh.n_cells() {
            for face in 0..mesh.n_faces_per_cell() {
                if unknown_side(mesh, angle, cell, face).is_some() {
                    faces += 1;
                }
            }
        }
    }
    faces * n_groups * mesh.n_vertices_per_face()
}

#[derive(Debug, Clone)]
pub struct BoundaryLayout {
    slots: Vec<BoundarySlot>,
}

impl BoundaryLayout {
    pub fn new(mesh: &impl PartitionMesh, n_groups: usize) -> Result<Self, SchurError> {
        let mut slots = Vec::new();
        for angle in 0..mesh.n_angles() {
            for cell in 0..mesh.n_cells() {
                for group in 0..n_groups {
                    for face in 0..mesh.n_faces_per_cell() {
                        let Some(side) = unknown_side(mesh, angle, cell, face) else {
                            continue;
                        };
                        for fvrtx in 0..mesh.n_vertices_per_face() {
                            slots.push(BoundarySlot { angle, cell, group, face, fvrtx, side });
                        }
                    }
                }
            }
        }
        let expected = vector_size(mesh, n_groups);
        if slots.len() != expected {
            return Err(SchurError::VectorSize { expected, actual: slots.len() });
        }
        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[BoundarySlot] {
        &self.slots
    }

    fn check_len(&self, actual: usize) -> Result<(), SchurError> {
        if actual != self.slots.len() {
            return Err(SchurError::VectorSize { expected: self.slots.len(), actual });
        }
        Ok(())
    }

    pub fn to_vector(&self, psi_bound: &PsiBoundData) -> Vec<f64> {
        self.slots
            .iter()
            .map(|s| psi_bound[(s.group, s.fvrtx, s.angle, s.side)])
            .collect()
    }

    pub fn write_vector(&self, psi_bound: &PsiBoundData, out: &mut [f64]) -> Result<(), SchurError> {
        self.check_len(out.len())?;
        for (o, s) in out.iter_mut().zip(&self.slots) {
            *o = psi_bound[(s.group, s.fvrtx, s.angle, s.side)];
        }
        Ok(())
    }

    /// Scatter `x` into the unknown slots of `psi_bound`; other entries are
    /// left untouched.
    pub fn read_vector(&self, x: &[f64], psi_bound: &mut PsiBoundData) -> Result<(), SchurError> {
        self.check_len(x.len())?;
        for (&v, s) in x.iter().zip(&self.slots) {
            psi_bound[(s.group, s.fvrtx, s.angle, s.side)] = v;
        }
        Ok(())
    }
}
