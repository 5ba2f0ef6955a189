//! MPI backend (feature `mpi`).
//!
//! One rank per MPI process on the world communicator. Sends are posted as
//! immediate sends whose buffers are leaked for the `'static` request scope and
//! reclaimed once the request has been waited on. `wait_any` polls, without
//! blocking, only the peers that still have a pending receive, so a packet is only
//! taken from a rank this exchange is waiting on; an early packet of the next
//! exchange stays queued in MPI.
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")] {
//! use schur_sweep::parallel::{Comm, MpiComm};
//! let comm = MpiComm::new().expect("MPI already initialized");
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! comm.barrier();
//! # }
//! ```

use mpi::collective::SystemOperation;
use mpi::environment::Universe;
use mpi::request::{Request, StaticScope};
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use super::{poll_any, Comm, PointToPoint};
use crate::error::SchurError;

pub struct MpiComm {
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    pub rank: usize,
    pub size: usize,
    // dropping the universe finalizes MPI, so it lives as long as the communicator
    _universe: Universe,
}

impl MpiComm {
    /// Initialize MPI and wrap the world communicator.
    ///
    /// Fails if MPI has already been initialized in this process.
    pub fn new() -> Result<Self, SchurError> {
        let universe = mpi::initialize().ok_or_else(|| SchurError::Transport {
            neighbor: 0,
            reason: "MPI already initialized".into(),
        })?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Ok(MpiComm { world, rank, size, _universe: universe })
    }
}

pub struct MpiSend {
    peer: usize,
    request: Request<'static, [u8], StaticScope>,
    buffer: *mut [u8],
}

#[derive(Debug)]
pub struct MpiRecv {
    peer: usize,
    tag: u16,
    len: usize,
}

impl Comm for MpiComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
    fn barrier(&self) {
        self.world.barrier();
    }
    fn all_reduce(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::sum());
        y
    }
}

impl PointToPoint for MpiComm {
    type SendHandle = MpiSend;
    type RecvHandle = MpiRecv;

    fn isend(&self, peer: usize, tag: u16, buf: Vec<u8>) -> Result<MpiSend, SchurError> {
        if peer >= self.size {
            return Err(SchurError::Transport {
                neighbor: peer,
                reason: format!("no rank {peer} in a world of {}", self.size),
            });
        }
        let leaked: &'static mut [u8] = Box::leak(buf.into_boxed_slice());
        let buffer: *mut [u8] = leaked;
        let request = self.world.process_at_rank(peer as i32).immediate_send_with_tag(
            StaticScope,
            &*leaked,
            i32::from(tag),
        );
        Ok(MpiSend { peer, request, buffer })
    }

    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Result<MpiRecv, SchurError> {
        if peer >= self.size {
            return Err(SchurError::Transport {
                neighbor: peer,
                reason: format!("no rank {peer} in a world of {}", self.size),
            });
        }
        Ok(MpiRecv { peer, tag, len })
    }

    fn wait_any(
        &self,
        pending: &mut [Option<MpiRecv>],
    ) -> Result<Option<(usize, Vec<u8>)>, SchurError> {
        poll_any(
            pending,
            |r| (r.peer, r.tag, r.len),
            |peer, tag| {
                let arrived = self
                    .world
                    .process_at_rank(peer as i32)
                    .immediate_matched_probe_with_tag(i32::from(tag));
                Ok(arrived.map(|(message, _status)| message.matched_receive_vec::<u8>().0))
            },
        )
    }

    fn wait_all(&self, sends: Vec<MpiSend>) -> Result<(), SchurError> {
        for send in sends {
            log::trace!("rank {} send to {} complete", self.rank, send.peer);
            send.request.wait();
            // SAFETY: the buffer was leaked in `isend` and the request that
            // borrowed it has completed.
            drop(unsafe { Box::from_raw(send.buffer) });
        }
        Ok(())
    }
}
