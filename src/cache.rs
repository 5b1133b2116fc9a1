/// Single-entry sort cache.
///
/// Remembers the row order produced by the most recent completed sort,
/// keyed by the canonical serialized SortSpec. Filter-only changes reuse it
/// without re-sorting. The entry describes positions in one RowStore
/// snapshot and must be invalidated whenever that snapshot is replaced.
use std::sync::Arc;

#[derive(Debug, Clone)]
struct CachedOrder {
    key: String,
    order: Arc<[usize]>,
}

#[derive(Debug, Default)]
pub struct SortCache {
    entry: Option<CachedOrder>,
}

impl SortCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached order if `key` matches exactly.
    pub fn get(&self, key: &str) -> Option<Arc<[usize]>> {
        self.entry
            .as_ref()
            .filter(|entry| entry.key == key)
            .map(|entry| Arc::clone(&entry.order))
    }

    /// Replaces the entry.
    pub fn insert(&mut self, key: String, order: Arc<[usize]>) {
        self.entry = Some(CachedOrder { key, order });
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn key(&self) -> Option<&str> {
        self.entry.as_ref().map(|entry| entry.key.as_str())
    }
}
