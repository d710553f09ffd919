//! Processed-Event Storage
//!
//! Receive-side dedup set. A retry redelivers an event with the same id;
//! marking an id here lets the consumer recognize and ignore it. Entries
//! carry a sliding TTL: re-marking an id resets its clock, so a hot id
//! survives as long as it keeps recurring and only expires after a quiet
//! period. Eviction is lazy and opportunistic; there is no background
//! sweep.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Marks purged inline once this many have accumulated.
const PURGE_EVERY_MARKS: usize = 64;

/// TTL-bounded set of recently seen event ids.
pub struct ProcessedEventStorage {
    seen: HashMap<i64, Instant>,
    max_ttl: Duration,
    marks_since_purge: usize,
}

impl ProcessedEventStorage {
    /// Create a storage with the given sliding TTL.
    pub fn new(max_ttl: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            max_ttl,
            marks_since_purge: 0,
        }
    }

    /// Whether this event id was marked within the TTL. Expired entries
    /// are evicted on lookup.
    pub fn event_already_processed(&mut self, event_id: i64) -> bool {
        self.event_already_processed_at(event_id, Instant::now())
    }

    /// Record an event id, resetting its TTL clock if already present.
    pub fn mark_event_processed(&mut self, event_id: i64) {
        self.mark_event_processed_at(event_id, Instant::now());
    }

    /// Lookup against an explicit clock.
    pub fn event_already_processed_at(&mut self, event_id: i64, now: Instant) -> bool {
        match self.seen.get(&event_id) {
            Some(marked_at) if now.duration_since(*marked_at) < self.max_ttl => true,
            Some(_) => {
                self.seen.remove(&event_id);
                false
            }
            None => false,
        }
    }

    /// Mark against an explicit clock.
    pub fn mark_event_processed_at(&mut self, event_id: i64, now: Instant) {
        self.seen.insert(event_id, now);
        self.marks_since_purge += 1;
        if self.marks_since_purge >= PURGE_EVERY_MARKS {
            self.marks_since_purge = 0;
            let ttl = self.max_ttl;
            self.seen
                .retain(|_, marked_at| now.duration_since(*marked_at) < ttl);
        }
    }

    /// Ids currently tracked (expired entries may still be counted until
    /// they are touched or a purge runs).
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_millis(100);

    #[test]
    fn test_mark_then_hit() {
        let mut storage = ProcessedEventStorage::new(TTL);
        let t0 = Instant::now();

        storage.mark_event_processed_at(42, t0);
        assert!(storage.event_already_processed_at(42, t0));
        assert!(storage.event_already_processed_at(42, t0 + Duration::from_millis(99)));
    }

    #[test]
    fn test_expires_after_quiet_period() {
        let mut storage = ProcessedEventStorage::new(TTL);
        let t0 = Instant::now();

        storage.mark_event_processed_at(42, t0);
        assert!(!storage.event_already_processed_at(42, t0 + TTL));
        // Evicted on that lookup
        assert!(storage.is_empty());
    }

    #[test]
    fn test_remark_extends_lifetime() {
        let mut storage = ProcessedEventStorage::new(TTL);
        let t0 = Instant::now();

        storage.mark_event_processed_at(42, t0);
        storage.mark_event_processed_at(42, t0 + Duration::from_millis(80));

        // Past the original deadline but within the extended one
        assert!(storage.event_already_processed_at(42, t0 + Duration::from_millis(150)));
        assert!(!storage.event_already_processed_at(42, t0 + Duration::from_millis(181)));
    }

    #[test]
    fn test_mark_twice_same_as_once() {
        let mut storage = ProcessedEventStorage::new(TTL);
        let t0 = Instant::now();

        storage.mark_event_processed_at(7, t0);
        storage.mark_event_processed_at(7, t0);
        assert_eq!(storage.len(), 1);
        assert!(storage.event_already_processed_at(7, t0));
    }

    #[test]
    fn test_unknown_id() {
        let mut storage = ProcessedEventStorage::new(TTL);
        assert!(!storage.event_already_processed(123));
    }

    #[test]
    fn test_inline_purge_drops_stale_ids() {
        let mut storage = ProcessedEventStorage::new(TTL);
        let t0 = Instant::now();

        storage.mark_event_processed_at(1, t0);
        let late = t0 + TTL + Duration::from_millis(1);
        // Enough fresh marks to trigger the inline purge
        for id in 2..(2 + PURGE_EVERY_MARKS as i64) {
            storage.mark_event_processed_at(id, late);
        }
        assert!(!storage.seen.contains_key(&1));
    }
}
