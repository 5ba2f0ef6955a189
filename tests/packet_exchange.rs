//! Side exchange between neighbouring partitions: thread-backed ranks on a
//! 2x2 block decomposition, plus a scripted transport that controls the order
//! in which receives complete.

mod common;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use common::{block_mesh, run_ranks};
use schur_sweep::mesh::cartesian::{EAST, NORTH, SOUTH, WEST};
use schur_sweep::transport::{new_psi, new_psi_bound};
use schur_sweep::{
    CartesianMesh, Comm, CommSides, FaceNeighbor, PartitionMesh, PointToPoint, PsiBoundData, PsiData, SchurError,
};

const NX: usize = 4;
const NG: usize = 2;
const UNSET: f64 = -1.0;

/// Distinct value for every (global cell, angle, vertex, group).
fn encode(global_cell: usize, angle: usize, vertex: usize, group: usize) -> f64 {
    (global_cell * 1000 + angle * 100 + vertex * 10 + group) as f64
}

fn encoded_psi(mesh: &CartesianMesh, shift: f64) -> PsiData {
    let mut psi = new_psi(mesh, NG);
    for cell in 0..mesh.n_cells() {
        let gc = mesh.global_cell(cell);
        for angle in 0..mesh.n_angles() {
            for v in 0..mesh.n_vertices_per_cell() {
                for g in 0..NG {
                    psi[(v, angle, cell, g)] = encode(gc, angle, v, g) + shift;
                }
            }
        }
    }
    psi
}

fn across(mesh: &CartesianMesh, cell: usize, face: usize) -> (usize, usize) {
    let gc = mesh.global_cell(cell);
    match face {
        WEST => (gc - 1, EAST),
        EAST => (gc + 1, WEST),
        SOUTH => (gc - NX, NORTH),
        _ => (gc + NX, SOUTH),
    }
}

/// Every incoming partition slot holds the neighbour's outgoing value, and
/// nothing else was written.
fn check_received(mesh: &CartesianMesh, psi_bound: &PsiBoundData, shift: f64) {
    for cell in 0..mesh.n_cells() {
        for face in 0..mesh.n_faces_per_cell() {
            let (side, partition) = match mesh.neighbor(cell, face) {
                FaceNeighbor::Partition { side, .. } => (side, true),
                FaceNeighbor::Domain { side } => (side, false),
                FaceNeighbor::Cell(_) => continue,
            };
            for angle in 0..mesh.n_angles() {
                for fv in 0..mesh.n_vertices_per_face() {
                    for g in 0..NG {
                        let got = psi_bound[(g, fv, angle, side)];
                        if partition && mesh.is_incoming(angle, cell, face) {
                            let (gc, opposite) = across(mesh, cell, face);
                            let vertex = mesh.face_vertex(cell, opposite, fv);
                            assert_eq!(got, encode(gc, angle, vertex, g) + shift, "cell {cell} face {face} angle {angle}");
                        } else {
                            assert_eq!(got, UNSET, "cell {cell} face {face} angle {angle} was written");
                        }
                    }
                }
            }
        }
    }
}

/// Four thread ranks exchange their sides; each receives exactly its
/// neighbours' outgoing flux in the incoming slots.
#[test]
fn two_by_two_exchange_fills_incoming_slots() {
    run_ranks(4, |comm| {
        let mesh = block_mesh(NX, NX, 2, 2, comm.rank(), 1);
        let sides = CommSides::new(&mesh, NG);
        let psi = encoded_psi(&mesh, 0.0);
        let mut psi_bound = new_psi_bound(&mesh, NG);
        psi_bound.set_to_value(UNSET);
        sides.comm_sides(&mesh, &comm, &psi, &mut psi_bound).unwrap();
        check_received(&mesh, &psi_bound, 0.0);
    });
}

/// Repeated exchanges on the same ranks do not pick up stale packets.
#[test]
fn repeated_exchanges_stay_in_step() {
    run_ranks(4, |comm| {
        let mesh = block_mesh(NX, NX, 2, 2, comm.rank(), 1);
        let sides = CommSides::new(&mesh, NG);
        let mut psi_bound = new_psi_bound(&mesh, NG);
        for round in 0..3 {
            let shift = 1.0e6 * round as f64;
            let psi = encoded_psi(&mesh, shift);
            psi_bound.set_to_value(UNSET);
            sides.comm_sides(&mesh, &comm, &psi, &mut psi_bound).unwrap();
            check_received(&mesh, &psi_bound, shift);
        }
    });
}

/// Rank-0 view of a 2x2 decomposition with canned packets from ranks 1 and 2.
struct ScriptedComm {
    inbox: HashMap<usize, Vec<u8>>,
    reverse: bool,
    fail_receives: bool,
    sent_to: RefCell<Vec<usize>>,
    waited_sends: Cell<bool>,
}

impl ScriptedComm {
    fn new(inbox: HashMap<usize, Vec<u8>>) -> Self {
        Self {
            inbox,
            reverse: false,
            fail_receives: false,
            sent_to: RefCell::new(Vec::new()),
            waited_sends: Cell::new(false),
        }
    }
}

impl Comm for ScriptedComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        4
    }
    fn barrier(&self) {}
    fn all_reduce(&self, x: f64) -> f64 {
        x
    }
}

impl PointToPoint for ScriptedComm {
    type SendHandle = ();
    type RecvHandle = usize;

    fn isend(&self, peer: usize, _tag: u16, _buf: Vec<u8>) -> Result<(), SchurError> {
        self.sent_to.borrow_mut().push(peer);
        Ok(())
    }

    fn irecv(&self, peer: usize, _tag: u16, _len: usize) -> Result<usize, SchurError> {
        Ok(peer)
    }

    fn wait_any(&self, pending: &mut [Option<usize>]) -> Result<Option<(usize, Vec<u8>)>, SchurError> {
        let mut live = pending.iter().enumerate().filter(|(_, p)| p.is_some()).map(|(i, _)| i);
        let slot = if self.reverse { live.last() } else { live.next() };
        let Some(slot) = slot else {
            return Ok(None);
        };
        let peer = pending[slot].take().unwrap_or_default();
        if self.fail_receives {
            return Err(SchurError::Transport { neighbor: peer, reason: "connection reset".into() });
        }
        Ok(Some((slot, self.inbox[&peer].clone())))
    }

    fn wait_all(&self, _sends: Vec<()>) -> Result<(), SchurError> {
        self.waited_sends.set(true);
        Ok(())
    }
}

/// Packets the neighbours of rank 0 would send it.
fn packets_for_rank0() -> HashMap<usize, Vec<u8>> {
    [1, 2]
        .into_iter()
        .map(|r| {
            let mesh = block_mesh(NX, NX, 2, 2, r, 1);
            let sides = CommSides::new(&mesh, NG);
            let nb = sides.plan().neighbors().iter().find(|n| n.rank == 0).unwrap();
            (r, sides.pack(&mesh, nb, &encoded_psi(&mesh, 0.0)))
        })
        .collect()
}

fn exchange_rank0(comm: &ScriptedComm) -> Result<PsiBoundData, SchurError> {
    let mesh = block_mesh(NX, NX, 2, 2, 0, 1);
    let sides = CommSides::new(&mesh, NG);
    let mut psi_bound = new_psi_bound(&mesh, NG);
    psi_bound.set_to_value(UNSET);
    sides.comm_sides(&mesh, comm, &encoded_psi(&mesh, 0.0), &mut psi_bound)?;
    Ok(psi_bound)
}

/// The stored side flux does not depend on the order receives complete in.
#[test]
fn completion_order_does_not_matter() {
    let forward = ScriptedComm::new(packets_for_rank0());
    let mut backward = ScriptedComm::new(packets_for_rank0());
    backward.reverse = true;

    let a = exchange_rank0(&forward).unwrap();
    let b = exchange_rank0(&backward).unwrap();
    assert_eq!(a.as_slice(), b.as_slice());
    check_received(&block_mesh(NX, NX, 2, 2, 0, 1), &a, 0.0);

    let mut sent = forward.sent_to.borrow().clone();
    sent.sort_unstable();
    assert_eq!(sent, vec![1, 2]);
}

/// A failed receive surfaces as a transport fault after the sends are waited on.
#[test]
fn failed_receive_still_waits_for_sends() {
    let mut comm = ScriptedComm::new(packets_for_rank0());
    comm.fail_receives = true;
    let err = exchange_rank0(&comm).unwrap_err();
    assert!(err.is_transport(), "{err}");
    assert!(comm.waited_sends.get());
}

/// A truncated buffer from a neighbour is a packet error naming that neighbour.
#[test]
fn truncated_packet_is_rejected() {
    let mut inbox = packets_for_rank0();
    if let Some(bytes) = inbox.get_mut(&2) {
        bytes.truncate(bytes.len() - 8);
    }
    let comm = ScriptedComm::new(inbox);
    match exchange_rank0(&comm) {
        Err(SchurError::Packet { neighbor, .. }) => assert_eq!(neighbor, 2),
        other => panic!("expected a packet error, got {other:?}"),
    }
    assert!(comm.waited_sends.get());
}

/// A packet naming a side or angle that the sender does not feed is refused,
/// and the domain inflow stays as it was.
#[test]
fn packet_for_a_foreign_slot_is_rejected() {
    let mesh = block_mesh(NX, NX, 2, 2, 0, 1);
    let sides = CommSides::new(&mesh, NG);
    let FaceNeighbor::Domain { side: west } = mesh.neighbor(0, WEST) else {
        panic!("cell 0 should touch the west boundary");
    };
    let good = packets_for_rank0().remove(&1).unwrap();

    // header rewritten to a domain side of rank 0
    let mut domain_side = good.clone();
    domain_side[..8].copy_from_slice(&mesh.global_side(west).to_le_bytes());
    // header rewritten to an angle that leaves rank 0 through the shared face
    let mut outgoing_angle = good.clone();
    let leaving = (0..mesh.n_angles())
        .find(|&a| mesh.is_outgoing(a, mesh.cell_index(1, 0), EAST))
        .unwrap();
    outgoing_angle[8..16].copy_from_slice(&(leaving as u64).to_le_bytes());

    for bytes in [domain_side, outgoing_angle] {
        let mut psi_bound = new_psi_bound(&mesh, NG);
        psi_bound.set_to_value(UNSET);
        match sides.unpack(&mesh, 1, &bytes, &mut psi_bound) {
            Err(SchurError::Packet { neighbor, .. }) => assert_eq!(neighbor, 1),
            other => panic!("expected a packet error, got {other:?}"),
        }
        for angle in 0..mesh.n_angles() {
            assert!(psi_bound.side_data(west, angle).iter().all(|&v| v == UNSET));
        }
    }

    let mut psi_bound = new_psi_bound(&mesh, NG);
    sides.unpack(&mesh, 1, &good, &mut psi_bound).unwrap();
}

/// Packets from a rank that shares no face are refused.
#[test]
fn packet_from_a_non_neighbour_is_rejected() {
    let mesh = block_mesh(NX, NX, 2, 2, 0, 1);
    let sides = CommSides::new(&mesh, NG);
    let mut psi_bound = new_psi_bound(&mesh, NG);
    let err = sides.unpack(&mesh, 3, &[], &mut psi_bound).unwrap_err();
    assert!(matches!(err, SchurError::Packet { neighbor: 3, .. }));
}
