//! Bounded duplicate detection with two generations.
//!
//! Keys are inserted into the hot set. Once the hot set is 90% full, new
//! keys are mirrored into the warm set as well. When the hot set overflows
//! it is replaced by the warm set, so the most recent keys survive the
//! rotation while everything older is forgotten at once.
//!
//! A key is reported as a duplicate until the next rotation. Only keys
//! inserted after the hot set reached 90% (roughly the newest tenth)
//! outlive a rotation.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::hash::Hash;

/// Thread-safe two-generation set with bounded memory.
pub struct DuplicateGuard<K> {
    max_size: usize,
    mirror_threshold: usize,
    generations: Mutex<Generations<K>>,
}

struct Generations<K> {
    hot: HashSet<K>,
    warm: HashSet<K>,
}

impl<K: Eq + Hash + Clone> DuplicateGuard<K> {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            max_size,
            mirror_threshold: max_size * 9 / 10,
            generations: Mutex::new(Generations {
                hot: HashSet::new(),
                warm: HashSet::new(),
            }),
        }
    }

    /// Record `key`. Returns `true` if it was not already present.
    pub fn insert_and_check(&self, key: K) -> bool {
        let mut gens = self.generations.lock();
        if gens.hot.contains(&key) {
            return false;
        }

        gens.hot.insert(key.clone());
        if gens.hot.len() > self.max_size {
            gens.hot = std::mem::take(&mut gens.warm);
            gens.hot.insert(key);
        } else if gens.hot.len() >= self.mirror_threshold {
            gens.warm.insert(key);
        }
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.generations.lock().hot.contains(key)
    }

    /// Forget `key` in both generations.
    pub fn remove(&self, key: &K) -> bool {
        let mut gens = self.generations.lock();
        gens.warm.remove(key);
        gens.hot.remove(key)
    }

    pub fn len(&self) -> usize {
        self.generations.lock().hot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
