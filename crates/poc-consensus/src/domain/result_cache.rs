//! Recently verified results, kept to answer `getVoteResult` requests.

use super::message::ResultMessage;
use parking_lot::Mutex;
use shared_crypto::Hash;
use std::collections::{HashMap, VecDeque};

/// FIFO-bounded map from block hash to its verified result.
pub struct ResultCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    order: VecDeque<Hash>,
    entries: HashMap<Hash, ResultMessage>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Store a result, evicting the oldest entry when full.
    pub fn insert(&self, result: ResultMessage) {
        let hash = result.block_hash();
        let mut inner = self.inner.lock();
        if inner.entries.insert(hash, result).is_some() {
            return;
        }
        inner.order.push_back(hash);
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    pub fn get(&self, block_hash: &Hash) -> Option<ResultMessage> {
        self.inner.lock().entries.get(block_hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
