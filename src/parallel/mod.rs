//! Communication backends.
//!
//! [`Comm`] carries the collective operations the Krylov solver needs (global
//! sums for inner products). [`PointToPoint`] adds the non-blocking byte
//! transport used by the side exchange: post receives, post sends, drain the
//! receives in whatever order they complete, then wait for the sends.
//!
//! Backends:
//! - [`SerialComm`]: one rank, no peers.
//! - [`ThreadComm`]: every rank is a thread of the current process.
//! - `MpiComm` (feature `mpi`): one rank per MPI process.

use crate::error::SchurError;

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);
    /// Global sum. Every rank must receive the bit-identical result.
    fn all_reduce(&self, x: f64) -> f64;
    fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        // starts at +0.0 so an empty slice contributes +0.0
        let local = a.iter().zip(b).fold(0.0, |acc, (&x, &y)| acc + x * y);
        self.all_reduce(local)
    }
    fn norm(&self, a: &[f64]) -> f64 {
        self.dot(a, a).sqrt()
    }
    /// Global sum of a count.
    fn all_reduce_usize(&self, n: usize) -> usize {
        self.all_reduce(n as f64).round() as usize
    }
}

/// Non-blocking point-to-point byte transport.
pub trait PointToPoint: Comm {
    /// Handle returned by `isend`.
    type SendHandle;
    /// Handle returned by `irecv`.
    type RecvHandle;

    /// Start sending `buf` to `peer`. The transport owns the buffer until the
    /// handle is waited on.
    fn isend(&self, peer: usize, tag: u16, buf: Vec<u8>) -> Result<Self::SendHandle, SchurError>;

    /// Post a receive of at most `len` bytes from `peer`.
    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Result<Self::RecvHandle, SchurError>;

    /// Block until one of the posted receives completes.
    ///
    /// Returns the index of the completed slot together with its bytes and
    /// clears that slot. Returns `Ok(None)` when every slot is already empty.
    fn wait_any(
        &self,
        pending: &mut [Option<Self::RecvHandle>],
    ) -> Result<Option<(usize, Vec<u8>)>, SchurError>;

    /// Block until every send has completed.
    fn wait_all(&self, sends: Vec<Self::SendHandle>) -> Result<(), SchurError>;
}

impl<C: Comm + ?Sized> Comm for &C {
    fn rank(&self) -> usize {
        (**self).rank()
    }
    fn size(&self) -> usize {
        (**self).size()
    }
    fn barrier(&self) {
        (**self).barrier()
    }
    fn all_reduce(&self, x: f64) -> f64 {
        (**self).all_reduce(x)
    }
}

impl<P: PointToPoint + ?Sized> PointToPoint for &P {
    type SendHandle = P::SendHandle;
    type RecvHandle = P::RecvHandle;

    fn isend(&self, peer: usize, tag: u16, buf: Vec<u8>) -> Result<Self::SendHandle, SchurError> {
        (**self).isend(peer, tag, buf)
    }
    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Result<Self::RecvHandle, SchurError> {
        (**self).irecv(peer, tag, len)
    }
    fn wait_any(
        &self,
        pending: &mut [Option<Self::RecvHandle>],
    ) -> Result<Option<(usize, Vec<u8>)>, SchurError> {
        (**self).wait_any(pending)
    }
    fn wait_all(&self, sends: Vec<Self::SendHandle>) -> Result<(), SchurError> {
        (**self).wait_all(sends)
    }
}

/// Complete one pending receive by polling each live slot's peer.
///
/// `key` gives the `(peer, tag, max_len)` of a handle; `try_take(peer, tag)`
/// returns the next message from `peer` with `tag` if one has arrived. Only
/// peers with a live slot are polled, so a message from a rank whose slot is
/// already drained stays queued for the next exchange.
#[cfg_attr(not(feature = "mpi"), allow(dead_code))]
pub(crate) fn poll_any<H>(
    pending: &mut [Option<H>],
    key: impl Fn(&H) -> (usize, u16, usize),
    mut try_take: impl FnMut(usize, u16) -> Result<Option<Vec<u8>>, SchurError>,
) -> Result<Option<(usize, Vec<u8>)>, SchurError> {
    loop {
        let mut live = false;
        for index in 0..pending.len() {
            let Some((peer, tag, len)) = pending[index].as_ref().map(&key) else {
                continue;
            };
            live = true;
            let Some(data) = try_take(peer, tag)? else {
                continue;
            };
            pending[index] = None;
            if data.len() > len {
                return Err(SchurError::Transport {
                    neighbor: peer,
                    reason: format!("message of {} bytes truncated to {len}", data.len()),
                });
            }
            return Ok(Some((index, data)));
        }
        if !live {
            return Ok(None);
        }
        std::thread::yield_now();
    }
}

/// Single-rank communicator for serial runs and unit tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialComm;

impl Comm for SerialComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn barrier(&self) {}
    fn all_reduce(&self, x: f64) -> f64 {
        x
    }
}

impl PointToPoint for SerialComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, peer: usize, _tag: u16, _buf: Vec<u8>) -> Result<(), SchurError> {
        Err(SchurError::Transport {
            neighbor: peer,
            reason: "serial communicator has no peers".into(),
        })
    }

    fn irecv(&self, peer: usize, _tag: u16, _len: usize) -> Result<(), SchurError> {
        Err(SchurError::Transport {
            neighbor: peer,
            reason: "serial communicator has no peers".into(),
        })
    }

    fn wait_any(&self, pending: &mut [Option<()>]) -> Result<Option<(usize, Vec<u8>)>, SchurError> {
        match pending.iter().position(Option::is_some) {
            None => Ok(None),
            Some(_) => Err(SchurError::Transport {
                neighbor: 0,
                reason: "serial communicator cannot complete a receive".into(),
            }),
        }
    }

    fn wait_all(&self, _sends: Vec<()>) -> Result<(), SchurError> {
        Ok(())
    }
}

pub mod thread_comm;
pub use thread_comm::ThreadComm;

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;
