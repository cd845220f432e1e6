//! Deduplication of repeated strings (author names)

use std::sync::Arc;

use rustc_hash::FxHashSet;

/// Default number of distinct strings kept for sharing
pub const DEFAULT_INTERN_CAPACITY: usize = 1 << 20;

/// Shares one allocation between equal strings.
///
/// The table stops growing at `capacity`; strings seen after that are still
/// returned, just not shared. A disabled interner allocates every time.
#[derive(Debug)]
pub struct Interner {
    table: FxHashSet<Arc<str>>,
    capacity: usize,
    enabled: bool,
    hits: u64,
}

impl Interner {
    pub fn new(capacity: usize) -> Self {
        Self {
            table: FxHashSet::default(),
            capacity,
            enabled: true,
            hits: 0,
        }
    }

    pub fn disabled() -> Self {
        Self {
            table: FxHashSet::default(),
            capacity: 0,
            enabled: false,
            hits: 0,
        }
    }

    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if !self.enabled {
            return Arc::from(s);
        }
        if let Some(shared) = self.table.get(s) {
            self.hits += 1;
            return Arc::clone(shared);
        }
        let value: Arc<str> = Arc::from(s);
        if self.table.len() < self.capacity {
            self.table.insert(Arc::clone(&value));
        }
        value
    }

    /// Distinct strings held.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Lookups answered from the table.
    pub fn hits(&self) -> u64 {
        self.hits
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new(DEFAULT_INTERN_CAPACITY)
    }
}
