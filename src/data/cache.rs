//! Time-based value cache.

use std::time::Duration;
use tokio::time::Instant;

/// A single cached value and the moment it was stored.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    entry: Option<(T, Instant)>,
}

impl<T> Cached<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self { entry: None }
    }

    /// The cached value, if one is stored and no older than `ttl`.
    pub fn fresh(&self, ttl: Duration) -> Option<&T> {
        self.entry
            .as_ref()
            .filter(|(_, stored_at)| stored_at.elapsed() <= ttl)
            .map(|(value, _)| value)
    }

    /// The cached value regardless of age.
    pub fn get(&self) -> Option<&T> {
        self.entry.as_ref().map(|(value, _)| value)
    }

    /// Time since the value was stored.
    pub fn age(&self) -> Option<Duration> {
        self.entry.as_ref().map(|(_, stored_at)| stored_at.elapsed())
    }

    /// Store a value, stamping it with the current time.
    pub fn store(&mut self, value: T) {
        self.entry = Some((value, Instant::now()));
    }

    /// Drop the cached value.
    pub fn clear(&mut self) {
        self.entry = None;
    }

    /// Check if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_until_ttl() {
        let ttl = Duration::from_secs(60);
        let mut cache = Cached::new();
        assert!(cache.is_empty());
        assert_eq!(cache.fresh(ttl), None);

        cache.store(21.5);
        assert_eq!(cache.fresh(ttl), Some(&21.5));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.fresh(ttl), Some(&21.5));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.fresh(ttl), None);
        assert_eq!(cache.get(), Some(&21.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_resets_age() {
        let mut cache = Cached::new();
        cache.store(1);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.age(), Some(Duration::from_secs(30)));

        cache.store(2);
        assert_eq!(cache.age(), Some(Duration::ZERO));
    }

    #[test]
    fn test_clear() {
        let mut cache = Cached::new();
        cache.store("x");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(), None);
        assert_eq!(cache.age(), None);
    }
}
