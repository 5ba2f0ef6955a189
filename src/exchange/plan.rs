//! Per-neighbour send lists and receive counts, built once per mesh.

use crate::mesh::{FaceNeighbor, PartitionMesh};

use super::wire;

/// One outgoing packet: the flux leaving `cell` through `face` in `angle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaData {
    pub global_side: u64,
    pub angle: usize,
    pub cell: usize,
    pub face: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NeighborPlan {
    pub rank: usize,
    pub send: Vec<MetaData>,
    pub recv_count: usize,
    /// Incoming `(local side, angle)` slots this neighbour fills, sorted.
    pub recv: Vec<(usize, usize)>,
}

impl NeighborPlan {
    /// `(side, angle)` is a slot this neighbour is expected to fill.
    pub fn receives(&self, side: usize, angle: usize) -> bool {
        self.recv.binary_search(&(side, angle)).is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct ExchangePlan {
    neighbors: Vec<NeighborPlan>,
    block_len: usize,
}

impl ExchangePlan {
    /// Scan every partition face: outgoing angles go on the send list of the
    /// owning neighbour, incoming angles bump its receive count.
    pub fn build(mesh: &impl PartitionMesh, n_groups: usize) -> Self {
        let mut neighbors: Vec<NeighborPlan> = mesh
            .adjacent_ranks()
            .into_iter()
            .map(|rank| NeighborPlan { rank, ..Default::default() })
            .collect();
        for cell in 0..mesh.n_cells() {
            for face in 0..mesh.n_faces_per_cell() {
                let FaceNeighbor::Partition { rank, side } = mesh.neighbor(cell, face) else {
                    continue;
                };
                let Some(nb) = neighbors.iter_mut().find(|n| n.rank == rank) else {
                    continue;
                };
                let global_side = mesh.global_side(side);
                for angle in 0..mesh.n_angles() {
                    if mesh.is_outgoing(angle, cell, face) {
                        nb.send.push(MetaData { global_side, angle, cell, face });
                    } else {
                        nb.recv.push((side, angle));
                    }
                }
            }
        }
        for nb in &mut neighbors {
            nb.recv.sort_unstable();
            nb.recv_count = nb.recv.len();
        }
        Self {
            neighbors,
            block_len: n_groups * mesh.n_vertices_per_face(),
        }
    }

    pub fn neighbors(&self) -> &[NeighborPlan] {
        &self.neighbors
    }

    /// Values per packet payload.
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub fn packet_size(&self) -> usize {
        wire::packet_size(self.block_len)
    }
}
