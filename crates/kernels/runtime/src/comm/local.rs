//! In-process rank group.
//!
//! Each [`LocalRank`] stands in for one worker process. Ranks exchange
//! byte payloads over channels and synchronize on a shared barrier, so a
//! multi-rank run can execute on threads of a single process.
//!
//! Messages between a pair of ranks arrive in send order. A rank may
//! receive a peer's payload for a later collective before it finishes the
//! current one; such payloads are parked per source until needed.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Barrier, Mutex};

use super::Communicator;
use crate::error::{Error, Result};

struct Envelope {
    from: usize,
    payload: Vec<u8>,
}

struct Inbox {
    receiver: Receiver<Envelope>,
    parked: Vec<VecDeque<Vec<u8>>>,
}

/// One rank of a [`LocalGroup`].
pub struct LocalRank {
    rank: usize,
    size: usize,
    peers: Vec<Sender<Envelope>>,
    inbox: Mutex<Inbox>,
    barrier: Arc<Barrier>,
}

impl LocalRank {
    fn send(&self, to: usize, payload: Vec<u8>) -> Result<()> {
        self.peers[to]
            .send(Envelope {
                from: self.rank,
                payload,
            })
            .map_err(|_| Error::Communication(format!("rank {to} disconnected")))
    }

    fn receive_from(&self, from: usize) -> Result<Vec<u8>> {
        let mut inbox = self
            .inbox
            .lock()
            .map_err(|_| Error::Communication("inbox lock poisoned".to_string()))?;
        loop {
            if let Some(payload) = inbox.parked[from].pop_front() {
                return Ok(payload);
            }
            let envelope = inbox
                .receiver
                .recv()
                .map_err(|_| Error::Communication(format!("rank {from} disconnected")))?;
            inbox.parked[envelope.from].push_back(envelope.payload);
        }
    }
}

impl Communicator for LocalRank {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> Result<()> {
        self.barrier.wait();
        Ok(())
    }

    fn gather(&self, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>> {
        let root = self.root();
        if self.rank != root {
            self.send(root, payload)?;
            return Ok(None);
        }
        let mut all = Vec::with_capacity(self.size);
        let mut own = Some(payload);
        for r in 0..self.size {
            if r == root {
                all.push(own.take().unwrap_or_default());
            } else {
                all.push(self.receive_from(r)?);
            }
        }
        Ok(Some(all))
    }

    fn broadcast(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        let root = self.root();
        if self.rank != root {
            return self.receive_from(root);
        }
        for r in (0..self.size).filter(|r| *r != root) {
            self.send(r, payload.clone())?;
        }
        Ok(payload)
    }
}

/// Factory for a set of connected [`LocalRank`]s.
pub struct LocalGroup;

impl LocalGroup {
    /// Create `size` connected ranks, ordered by rank id.
    pub fn create(size: usize) -> Vec<LocalRank> {
        let size = size.max(1);
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| channel()).unzip();
        let barrier = Arc::new(Barrier::new(size));
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| LocalRank {
                rank,
                size,
                peers: senders.clone(),
                inbox: Mutex::new(Inbox {
                    receiver,
                    parked: vec![VecDeque::new(); size],
                }),
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }

    /// Run `work` on `size` ranks, one thread each, and collect the
    /// results in rank order.
    pub fn run<T, F>(size: usize, work: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(LocalRank) -> T + Sync,
    {
        let ranks = Self::create(size);
        let work = &work;
        std::thread::scope(|scope| {
            let handles: Vec<_> = ranks
                .into_iter()
                .map(|rank| scope.spawn(move || work(rank)))
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(r, h)| {
                    h.join()
                        .map_err(|_| Error::Communication(format!("rank {r} panicked")))
                })
                .collect()
        })
    }
}
