//! Chain status adapter
//!
//! Atomic flags and counters the host updates as the chain progresses.

use crate::ports::ChainStatus;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Thread-safe chain status shared between the host and consensus.
#[derive(Default)]
pub struct SharedChainStatus {
    module_ready: AtomicBool,
    height_synced: AtomicBool,
    subnet_ready: AtomicBool,
    best_height: AtomicU64,
    last_confirmed_slot: RwLock<(u64, u32)>,
}

impl SharedChainStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ready, synced and connected at `best_height`.
    pub fn synced_at(best_height: u64) -> Self {
        let status = Self::new();
        status.set_module_ready(true);
        status.set_height_synced(true);
        status.set_subnet_ready(true);
        status.set_best_height(best_height);
        status
    }

    pub fn set_module_ready(&self, ready: bool) {
        self.module_ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_height_synced(&self, synced: bool) {
        self.height_synced.store(synced, Ordering::SeqCst);
    }

    pub fn set_subnet_ready(&self, ready: bool) {
        self.subnet_ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_best_height(&self, height: u64) {
        self.best_height.store(height, Ordering::SeqCst);
    }

    /// Record the block confirmed at `height` in the given slot.
    pub fn confirm(&self, height: u64, round_index: u64, packing_index: u32) {
        *self.last_confirmed_slot.write() = (round_index, packing_index);
        self.best_height.fetch_max(height, Ordering::SeqCst);
    }
}

impl ChainStatus for SharedChainStatus {
    fn is_module_ready(&self) -> bool {
        self.module_ready.load(Ordering::SeqCst)
    }

    fn is_height_synced(&self) -> bool {
        self.height_synced.load(Ordering::SeqCst)
    }

    fn is_subnet_ready(&self) -> bool {
        self.subnet_ready.load(Ordering::SeqCst)
    }

    fn best_height(&self) -> u64 {
        self.best_height.load(Ordering::SeqCst)
    }

    fn last_confirmed_slot(&self) -> (u64, u32) {
        *self.last_confirmed_slot.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_moves_height_forward_only() {
        let status = SharedChainStatus::synced_at(10);
        status.confirm(11, 3, 2);
        assert_eq!(status.best_height(), 11);
        assert_eq!(status.last_confirmed_slot(), (3, 2));

        status.confirm(9, 3, 3);
        assert_eq!(status.best_height(), 11);
    }
}
