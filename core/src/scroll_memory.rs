//! Per-route scroll offsets, so navigating back lands where the reader left off.

use std::collections::VecDeque;

use lokitos_types::Route;

pub const DEFAULT_CAPACITY: usize = 32;

/// Least-recently-used map from route to scroll offset.
#[derive(Debug, Clone)]
pub struct ScrollMemory {
    // Most recently used at the back.
    entries: VecDeque<(String, f64)>,
    capacity: usize,
}

impl Default for ScrollMemory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ScrollMemory {
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remember `offset` for `route`. Negative or non-finite offsets are stored as 0.
    pub fn save(&mut self, route: &Route, offset: f64) {
        let key = route.to_string();
        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        self.take(&key);
        if self.entries.len() == self.capacity {
            if let Some((evicted, _)) = self.entries.pop_front() {
                tracing::trace!(route = %evicted, "Forgetting scroll position");
            }
        }
        self.entries.push_back((key, offset));
    }

    /// Saved offset for `route`, marking it recently used.
    pub fn restore(&mut self, route: &Route) -> Option<f64> {
        let key = route.to_string();
        let offset = self.take(&key)?;
        self.entries.push_back((key, offset));
        Some(offset)
    }

    pub fn forget(&mut self, route: &Route) -> Option<f64> {
        self.take(&route.to_string())
    }

    fn take(&mut self, key: &str) -> Option<f64> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        self.entries.remove(pos).map(|(_, offset)| offset)
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_CAPACITY, ScrollMemory};
    use lokitos_types::{ItemId, Route};

    fn post(id: &str) -> Route {
        Route::Post(ItemId::new(id))
    }

    #[test]
    fn saves_and_restores() {
        let mut memory = ScrollMemory::default();
        assert_eq!(memory.capacity(), DEFAULT_CAPACITY);
        memory.save(&Route::ForYou, 1200.0);
        assert_eq!(memory.restore(&Route::ForYou), Some(1200.0));
        assert_eq!(memory.restore(&post("p1")), None);
    }

    #[test]
    fn saving_again_overwrites() {
        let mut memory = ScrollMemory::new(4);
        memory.save(&Route::ForYou, 10.0);
        memory.save(&Route::ForYou, 20.0);
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.restore(&Route::ForYou), Some(20.0));
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut memory = ScrollMemory::new(2);
        memory.save(&post("a"), 1.0);
        memory.save(&post("b"), 2.0);
        // Touch "a" so "b" becomes the oldest.
        assert_eq!(memory.restore(&post("a")), Some(1.0));
        memory.save(&post("c"), 3.0);

        assert_eq!(memory.restore(&post("b")), None);
        assert_eq!(memory.restore(&post("a")), Some(1.0));
        assert_eq!(memory.restore(&post("c")), Some(3.0));
    }

    #[test]
    fn invalid_offsets_become_zero() {
        let mut memory = ScrollMemory::new(0);
        assert_eq!(memory.capacity(), 1);
        memory.save(&Route::Auth, f64::NAN);
        assert_eq!(memory.restore(&Route::Auth), Some(0.0));
        memory.save(&Route::Auth, -5.0);
        assert_eq!(memory.forget(&Route::Auth), Some(0.0));
        assert!(memory.is_empty());
    }
}
