//! Rank-local view of a partitioned mesh.
//!
//! The boundary layer only needs adjacency: which faces lie on a partition
//! boundary, which rank owns the other side, which angles flow in through a
//! face, and a global name for every side so that packets can be routed.

pub mod cartesian;
pub use cartesian::{CartesianMesh, Quadrature};

/// What lies across a face of a local cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceNeighbor {
    /// Another cell of this partition.
    Cell(usize),
    /// A cell owned by `rank`; `side` is the local side index of the face.
    Partition { rank: usize, side: usize },
    /// The physical domain boundary.
    Domain { side: usize },
}

pub trait PartitionMesh {
    fn n_cells(&self) -> usize;
    fn n_faces_per_cell(&self) -> usize;
    fn n_vertices_per_cell(&self) -> usize;
    fn n_vertices_per_face(&self) -> usize;
    /// Number of local sides (partition and domain boundary faces).
    fn n_sides(&self) -> usize;
    fn n_angles(&self) -> usize;

    fn neighbor(&self, cell: usize, face: usize) -> FaceNeighbor;

    /// Flux in direction `angle` enters `cell` through `face`.
    fn is_incoming(&self, angle: usize, cell: usize, face: usize) -> bool;

    fn is_outgoing(&self, angle: usize, cell: usize, face: usize) -> bool {
        !self.is_incoming(angle, cell, face)
    }

    /// Cell-local vertex index of face vertex `fvrtx` of `face`.
    ///
    /// Both partitions sharing a face must enumerate its vertices in the same
    /// global order.
    fn face_vertex(&self, cell: usize, face: usize, fvrtx: usize) -> usize;

    /// Global identifier of a local side, agreed upon by both owners.
    fn global_side(&self, side: usize) -> u64;

    /// Local side index for a global side identifier, if this rank has it.
    fn local_side(&self, global: u64) -> Option<usize>;

    /// Ranks sharing at least one face with this partition, in order of first
    /// appearance over the `(cell, face)` scan.
    fn adjacent_ranks(&self) -> Vec<usize> {
        let mut ranks = Vec::new();
        for cell in 0..self.n_cells() {
            for face in 0..self.n_faces_per_cell() {
                if let FaceNeighbor::Partition { rank, .. } = self.neighbor(cell, face) {
                    if !ranks.contains(&rank) {
                        ranks.push(rank);
                    }
                }
            }
        }
        ranks
    }
}

impl<M: PartitionMesh + ?Sized> PartitionMesh for &M {
    fn n_cells(&self) -> usize {
        (**self).n_cells()
    }
    fn n_faces_per_cell(&self) -> usize {
        (**self).n_faces_per_cell()
    }
    fn n_vertices_per_cell(&self) -> usize {
        (**self).n_vertices_per_cell()
    }
    fn n_vertices_per_face(&self) -> usize {
        (**self).n_vertices_per_face()
    }
    fn n_sides(&self) -> usize {
        (**self).n_sides()
    }
    fn n_angles(&self) -> usize {
        (**self).n_angles()
    }
    fn neighbor(&self, cell: usize, face: usize) -> FaceNeighbor {
        (**self).neighbor(cell, face)
    }
    fn is_incoming(&self, angle: usize, cell: usize, face: usize) -> bool {
        (**self).is_incoming(angle, cell, face)
    }
    fn is_outgoing(&self, angle: usize, cell: usize, face: usize) -> bool {
        (**self).is_outgoing(angle, cell, face)
    }
    fn face_vertex(&self, cell: usize, face: usize, fvrtx: usize) -> usize {
        (**self).face_vertex(cell, face, fvrtx)
    }
    fn global_side(&self, side: usize) -> u64 {
        (**self).global_side(side)
    }
    fn local_side(&self, global: u64) -> Option<usize> {
        (**self).local_side(global)
    }
}
