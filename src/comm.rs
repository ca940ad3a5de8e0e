//! Transport seam for the process group.
//!
//! The solver only needs three primitives from its transport: a paired
//! boundary-row exchange with a neighbor, a group-wide max reduction,
//! and a barrier. All three are blocking and group-synchronizing, a
//! rank must not proceed past them until its peers have matched the
//! call. `LocalGroup` maps the group onto OS threads with per-pair
//! channels, which is what the tests and single-machine runs use; an
//! MPI-backed implementation would slot in behind the same trait.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommError {
    #[error("rank {rank}: peer {peer} left the group mid-collective")]
    Disconnected { rank: usize, peer: usize },

    #[error("rank {rank}: no peer {peer} in a group of {size}")]
    NoSuchPeer { rank: usize, peer: usize, size: usize },
}

pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Blocking paired exchange with `peer`: send `send`, fill `recv`
    /// with the peer's counterpart message. Both sides must call this
    /// with mirrored arguments.
    fn sendrecv(&mut self, peer: usize, send: &[f64], recv: &mut [f64])
        -> Result<(), CommError>;

    /// Group-wide max reduction. Every rank receives the result.
    fn allreduce_max(&mut self, value: f64) -> Result<f64, CommError>;

    fn barrier(&self);
}

/// In-process group member. One per rank, connected to every other rank
/// by a dedicated channel pair, so messages between two ranks stay FIFO
/// and never interleave with third parties.
pub struct LocalGroup {
    rank: usize,
    size: usize,
    senders: Vec<Option<Sender<Vec<f64>>>>,
    receivers: Vec<Option<Receiver<Vec<f64>>>>,
    barrier: Arc<Barrier>,
}

impl LocalGroup {
    /// Creates a fully connected group of `size` members, one to move
    /// onto each rank's thread.
    pub fn split(size: usize) -> Vec<LocalGroup> {
        assert!(size > 0);
        let barrier = Arc::new(Barrier::new(size));

        let mut senders: Vec<Vec<Option<Sender<Vec<f64>>>>> = (0..size)
            .map(|_| (0..size).map(|_| None).collect())
            .collect();
        let mut receivers: Vec<Vec<Option<Receiver<Vec<f64>>>>> = (0..size)
            .map(|_| (0..size).map(|_| None).collect())
            .collect();
        for from in 0..size {
            for to in 0..size {
                if from == to {
                    continue;
                }
                let (tx, rx) = channel();
                senders[from][to] = Some(tx);
                receivers[to][from] = Some(rx);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| LocalGroup {
                rank,
                size,
                senders,
                receivers,
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }

    fn check_peer(&self, peer: usize) -> Result<(), CommError> {
        if peer >= self.size || peer == self.rank {
            return Err(CommError::NoSuchPeer {
                rank: self.rank,
                peer,
                size: self.size,
            });
        }
        Ok(())
    }

    fn send_to(&self, peer: usize, payload: Vec<f64>) -> Result<(), CommError> {
        self.senders[peer]
            .as_ref()
            .expect("channel to peer")
            .send(payload)
            .map_err(|_| CommError::Disconnected {
                rank: self.rank,
                peer,
            })
    }

    fn recv_from(&self, peer: usize) -> Result<Vec<f64>, CommError> {
        self.receivers[peer]
            .as_ref()
            .expect("channel from peer")
            .recv()
            .map_err(|_| CommError::Disconnected {
                rank: self.rank,
                peer,
            })
    }
}

impl Communicator for LocalGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn sendrecv(
        &mut self,
        peer: usize,
        send: &[f64],
        recv: &mut [f64],
    ) -> Result<(), CommError> {
        self.check_peer(peer)?;
        self.send_to(peer, send.to_vec())?;
        let payload = self.recv_from(peer)?;
        debug_assert_eq!(payload.len(), recv.len());
        recv.copy_from_slice(&payload);
        Ok(())
    }

    fn allreduce_max(&mut self, value: f64) -> Result<f64, CommError> {
        if self.size == 1 {
            return Ok(value);
        }
        if self.rank == 0 {
            let mut result = value;
            for peer in 1..self.size {
                let payload = self.recv_from(peer)?;
                result = result.max(payload[0]);
            }
            for peer in 1..self.size {
                self.send_to(peer, vec![result])?;
            }
            Ok(result)
        } else {
            self.send_to(0, vec![value])?;
            let payload = self.recv_from(0)?;
            Ok(payload[0])
        }
    }

    fn barrier(&self) {
        self.barrier.wait();
    }
}
