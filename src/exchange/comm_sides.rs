//! Asynchronous side exchange between neighbouring partitions.

use log::{debug, trace};

use super::plan::{ExchangePlan, NeighborPlan};
use super::wire::{self, WireSideHeader};
use crate::data::{PsiBoundData, PsiData};
use crate::error::SchurError;
use crate::mesh::PartitionMesh;
use crate::parallel::PointToPoint;

/// Message tag used for side packets.
pub const SIDE_TAG: u16 = 0;

#[derive(Debug, Clone)]
pub struct CommSides {
    plan: ExchangePlan,
}

impl CommSides {
    pub fn new(mesh: &impl PartitionMesh, n_groups: usize) -> Self {
        Self {
            plan: ExchangePlan::build(mesh, n_groups),
        }
    }

    pub fn plan(&self) -> &ExchangePlan {
        &self.plan
    }

    /// Send the outgoing side flux of `psi` to every neighbour and store what
    /// they send back in `psi_bound`.
    ///
    /// Receives are drained in completion order. Sends are always waited on
    /// before returning, also when a receive fails.
    pub fn comm_sides<M, C>(
        &self,
        mesh: &M,
        comm: &C,
        psi: &PsiData,
        psi_bound: &mut PsiBoundData,
    ) -> Result<(), SchurError>
    where
        M: PartitionMesh,
        C: PointToPoint,
    {
        let packet_size = self.plan.packet_size();
        let mut pending = Vec::new();
        let mut slot_rank = Vec::new();
        for nb in self.plan.neighbors().iter().filter(|n| n.recv_count > 0) {
            pending.push(Some(comm.irecv(nb.rank, SIDE_TAG, nb.recv_count * packet_size)?));
            slot_rank.push(nb.rank);
        }

        let mut sends = Vec::new();
        let mut result = Ok(());
        for nb in self.plan.neighbors().iter().filter(|n| !n.send.is_empty()) {
            let buf = self.pack(mesh, nb, psi);
            trace!("rank {} -> {}: {} bytes", comm.rank(), nb.rank, buf.len());
            match comm.isend(nb.rank, SIDE_TAG, buf) {
                Ok(h) => sends.push(h),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        if result.is_ok() {
            result = self.drain(mesh, comm, &mut pending, &slot_rank, psi_bound);
        }
        let sent = comm.wait_all(sends);
        result?;
        sent?;
        debug!(
            "rank {} exchanged sides with {} neighbours",
            comm.rank(),
            self.plan.neighbors().len()
        );
        Ok(())
    }

    fn drain<M: PartitionMesh, C: PointToPoint>(
        &self,
        mesh: &M,
        comm: &C,
        pending: &mut [Option<C::RecvHandle>],
        slot_rank: &[usize],
        psi_bound: &mut PsiBoundData,
    ) -> Result<(), SchurError> {
        while let Some((slot, bytes)) = comm.wait_any(pending)? {
            let rank = slot_rank[slot];
            trace!("rank {} <- {}: {} bytes", comm.rank(), rank, bytes.len());
            self.unpack(mesh, rank, &bytes, psi_bound)?;
        }
        Ok(())
    }

    /// Serialize every packet bound for `nb`, in send-list order.
    ///
    /// Payload values run group fastest, then face vertex, matching one
    /// `(side, angle)` block of [`PsiBoundData`].
    pub fn pack(&self, mesh: &impl PartitionMesh, nb: &NeighborPlan, psi: &PsiData) -> Vec<u8> {
        let n_groups = psi.n_groups();
        let nfv = mesh.n_vertices_per_face();
        let mut buf = Vec::with_capacity(nb.send.len() * self.plan.packet_size());
        for md in &nb.send {
            let values = (0..nfv).flat_map(|fv| {
                let vertex = mesh.face_vertex(md.cell, md.face, fv);
                (0..n_groups).map(move |g| psi[(vertex, md.angle, md.cell, g)])
            });
            wire::write_packet(&mut buf, WireSideHeader::new(md.global_side, md.angle as u64), values);
        }
        buf
    }

    /// Scatter the packets received from `rank` into `psi_bound`.
    pub fn unpack(
        &self,
        mesh: &impl PartitionMesh,
        rank: usize,
        bytes: &[u8],
        psi_bound: &mut PsiBoundData,
    ) -> Result<(), SchurError> {
        let packet_size = self.plan.packet_size();
        let Some(nb) = self.plan.neighbors().iter().find(|n| n.rank == rank) else {
            return Err(SchurError::Packet {
                neighbor: rank,
                reason: "not a neighbour of this partition".into(),
            });
        };
        wire::expect_exact_len(bytes.len(), nb.recv_count * packet_size)
            .map_err(|reason| SchurError::Packet { neighbor: rank, reason })?;

        for packet in bytes.chunks_exact(packet_size) {
            let (header, values) = wire::read_packet(packet, self.plan.block_len())
                .map_err(|reason| SchurError::Packet { neighbor: rank, reason })?;
            let side = mesh.local_side(header.side()).ok_or_else(|| SchurError::Packet {
                neighbor: rank,
                reason: format!("unknown global side {}", header.side()),
            })?;
            let angle = usize::try_from(header.angle())
                .ok()
                .filter(|&a| a < mesh.n_angles())
                .ok_or_else(|| SchurError::Packet {
                    neighbor: rank,
                    reason: format!("angle {} out of range", header.angle()),
                })?;
            if !nb.receives(side, angle) {
                return Err(SchurError::Packet {
                    neighbor: rank,
                    reason: format!("side {} angle {angle} is not an incoming side shared with it", header.side()),
                });
            }
            psi_bound.side_data_mut(side, angle).copy_from_slice(&values);
        }
        Ok(())
    }
}
