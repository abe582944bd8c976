//! Thread-backed rank runtime.
//!
//! One OS thread per rank inside a single process, which also makes the
//! process one "node": the node-local group is the whole set of ranks
//! and the shared dataset copy is an `Arc`. Collectives are built from a
//! barrier plus shared slots; the round structure guarantees all ranks
//! enter the same collective in the same order, so one accumulator and
//! one broadcast slot suffice.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use crate::dist::Communicator;
use crate::run::PreparedDataset;

/// State shared by all ranks of one node.
#[derive(Debug)]
pub struct ThreadCommCore {
    size: usize,
    barrier: Barrier,
    reduce_slot: Mutex<Vec<u64>>,
    best_slot: AtomicI64,
    dataset_slot: Mutex<Option<Arc<PreparedDataset>>>,
}

impl ThreadCommCore {
    /// Shared core for `size` ranks.
    pub fn new(size: usize) -> Arc<Self> {
        assert!(size >= 1, "rank group needs at least one rank");
        Arc::new(Self {
            size,
            barrier: Barrier::new(size),
            reduce_slot: Mutex::new(Vec::new()),
            best_slot: AtomicI64::new(0),
            dataset_slot: Mutex::new(None),
        })
    }
}

/// One rank's handle onto the shared runtime.
#[derive(Debug, Clone)]
pub struct ThreadComm {
    core: Arc<ThreadCommCore>,
    rank: usize,
}

impl ThreadComm {
    pub fn new(core: Arc<ThreadCommCore>, rank: usize) -> Self {
        assert!(rank < core.size);
        Self { core, rank }
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.core.size
    }

    fn node_rank(&self) -> usize {
        self.rank
    }

    fn node_size(&self) -> usize {
        self.core.size
    }

    fn reduce_sum(&self, local: &[u64], global: Option<&mut [u64]>) {
        {
            let mut acc = self.core.reduce_slot.lock().unwrap();
            if acc.len() != local.len() {
                acc.clear();
                acc.resize(local.len(), 0);
            }
            for (a, &v) in acc.iter_mut().zip(local) {
                *a += v;
            }
        }

        self.core.barrier.wait();

        if let Some(global) = global {
            let mut acc = self.core.reduce_slot.lock().unwrap();
            global.copy_from_slice(&acc);
            acc.clear();
        }

        self.core.barrier.wait();
    }

    fn broadcast_best(&self, value: i64) -> i64 {
        if self.rank == 0 {
            self.core.best_slot.store(value, Ordering::SeqCst);
        }
        self.core.barrier.wait();
        let value = self.core.best_slot.load(Ordering::SeqCst);
        self.core.barrier.wait();
        value
    }

    fn barrier(&self) {
        self.core.barrier.wait();
    }

    fn share_dataset(&self, prepared: Option<PreparedDataset>) -> Option<Arc<PreparedDataset>> {
        if self.is_node_root() {
            *self.core.dataset_slot.lock().unwrap() = prepared.map(Arc::new);
        }
        self.core.barrier.wait();
        let shared = self.core.dataset_slot.lock().unwrap().clone();
        self.core.barrier.wait();
        shared
    }
}
