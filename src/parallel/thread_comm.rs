// thread-based rank simulation: one communicator per thread, std mpsc mailboxes

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use super::{Comm, PointToPoint};
use crate::error::SchurError;

/// Tag reserved for collective reductions.
const COLLECTIVE_TAG: u16 = u16::MAX;

/// A rank that stays silent this long is treated as dead.
const WATCHDOG: Duration = Duration::from_secs(120);

struct Envelope {
    src: usize,
    tag: u16,
    payload: Vec<u8>,
}

/// Communicator for ranks that live on threads of one process.
///
/// Build all ranks at once with [`ThreadComm::universe`] and move each into its
/// own thread. Messages between a pair of ranks are delivered in send order;
/// receives match on `(source, tag)` in arrival order.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    outboxes: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    unmatched: RefCell<VecDeque<Envelope>>,
    barrier: Arc<Barrier>,
}

/// Sends complete as soon as they are posted; the handle only records the peer.
#[derive(Debug)]
pub struct ThreadSend {
    pub peer: usize,
}

#[derive(Debug)]
pub struct ThreadRecv {
    peer: usize,
    tag: u16,
    len: usize,
}

impl ThreadComm {
    /// Create `size` connected communicators, indexed by rank.
    pub fn universe(size: usize) -> Vec<ThreadComm> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::channel()).unzip();
        let barrier = Arc::new(Barrier::new(size.max(1)));
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| ThreadComm {
                rank,
                size,
                outboxes: senders.clone(),
                inbox,
                unmatched: RefCell::new(VecDeque::new()),
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }

    fn post(&self, peer: usize, tag: u16, payload: Vec<u8>) -> Result<(), SchurError> {
        let outbox = self.outboxes.get(peer).ok_or_else(|| SchurError::Transport {
            neighbor: peer,
            reason: format!("no rank {peer} in a universe of {}", self.size),
        })?;
        outbox
            .send(Envelope { src: self.rank, tag, payload })
            .map_err(|_| SchurError::Transport {
                neighbor: peer,
                reason: "mailbox closed".into(),
            })
    }

    /// Remove the earliest message accepted by `accept`, pulling from the inbox
    /// until one shows up.
    fn take_matching(&self, mut accept: impl FnMut(&Envelope) -> bool) -> Result<Envelope, SchurError> {
        loop {
            {
                let mut stash = self.unmatched.borrow_mut();
                if let Some(pos) = stash.iter().position(&mut accept) {
                    if let Some(env) = stash.remove(pos) {
                        return Ok(env);
                    }
                }
            }
            let env = self.inbox.recv_timeout(WATCHDOG).map_err(|e| SchurError::Transport {
                neighbor: self.rank,
                reason: match e {
                    RecvTimeoutError::Timeout => format!("no message within {WATCHDOG:?}"),
                    RecvTimeoutError::Disconnected => "all peers hung up".into(),
                },
            })?;
            self.unmatched.borrow_mut().push_back(env);
        }
    }

    fn check_tag(&self, peer: usize, tag: u16) -> Result<(), SchurError> {
        if tag == COLLECTIVE_TAG {
            return Err(SchurError::Transport {
                neighbor: peer,
                reason: format!("tag {tag:#x} is reserved for collectives"),
            });
        }
        Ok(())
    }
}

impl Comm for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
    fn barrier(&self) {
        self.barrier.wait();
    }
    fn all_reduce(&self, x: f64) -> f64 {
        if self.size <= 1 {
            return x;
        }
        for peer in (0..self.size).filter(|&p| p != self.rank) {
            if let Err(e) = self.post(peer, COLLECTIVE_TAG, x.to_le_bytes().to_vec()) {
                panic!("all_reduce on rank {}: {e}", self.rank);
            }
        }
        let mut values = vec![0.0; self.size];
        values[self.rank] = x;
        for peer in (0..self.size).filter(|&p| p != self.rank) {
            let env = self
                .take_matching(|e| e.src == peer && e.tag == COLLECTIVE_TAG)
                .unwrap_or_else(|e| panic!("all_reduce on rank {}: {e}", self.rank));
            let bytes: [u8; 8] = env
                .payload
                .as_slice()
                .try_into()
                .unwrap_or_else(|_| panic!("all_reduce on rank {}: bad reduction payload from {peer}", self.rank));
            values[peer] = f64::from_le_bytes(bytes);
        }
        // rank order, so every rank gets the same bits
        values.iter().fold(0.0, |acc, v| acc + v)
    }
}

impl PointToPoint for ThreadComm {
    type SendHandle = ThreadSend;
    type RecvHandle = ThreadRecv;

    fn isend(&self, peer: usize, tag: u16, buf: Vec<u8>) -> Result<ThreadSend, SchurError> {
        self.check_tag(peer, tag)?;
        self.post(peer, tag, buf)?;
        Ok(ThreadSend { peer })
    }

    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Result<ThreadRecv, SchurError> {
        self.check_tag(peer, tag)?;
        if peer >= self.size {
            return Err(SchurError::Transport {
                neighbor: peer,
                reason: format!("no rank {peer} in a universe of {}", self.size),
            });
        }
        Ok(ThreadRecv { peer, tag, len })
    }

    fn wait_any(
        &self,
        pending: &mut [Option<ThreadRecv>],
    ) -> Result<Option<(usize, Vec<u8>)>, SchurError> {
        if pending.iter().all(Option::is_none) {
            return Ok(None);
        }
        let slot_for = |src: usize, tag: u16, pending: &[Option<ThreadRecv>]| {
            pending
                .iter()
                .position(|p| matches!(p, Some(r) if r.peer == src && r.tag == tag))
        };
        let env = self.take_matching(|e| slot_for(e.src, e.tag, &*pending).is_some())?;
        let Some(index) = slot_for(env.src, env.tag, pending) else {
            return Err(SchurError::Transport {
                neighbor: env.src,
                reason: "matched message lost its receive slot".into(),
            });
        };
        let Some(recv) = pending[index].take() else {
            return Err(SchurError::Transport {
                neighbor: env.src,
                reason: "receive slot already drained".into(),
            });
        };
        if env.payload.len() > recv.len {
            return Err(SchurError::Transport {
                neighbor: env.src,
                reason: format!("message of {} bytes truncated to {}", env.payload.len(), recv.len),
            });
        }
        Ok(Some((index, env.payload)))
    }

    fn wait_all(&self, _sends: Vec<ThreadSend>) -> Result<(), SchurError> {
        Ok(())
    }
}
