//! Shared Sequence Generator
//!
//! Monotonic, wall-clock-independent sequence numbers assigned to decoded
//! commands before they are routed to a room. One generator is shared by
//! every connection of the process.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Monotonic sequence number source.
///
/// Cheap to clone; all clones share the same counter.
#[derive(Clone, Debug, Default)]
pub struct SequenceGenerator {
    next: Arc<AtomicI64>,
}

impl SequenceGenerator {
    /// Create a generator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the next sequence number. Strictly increasing across all clones.
    pub fn next(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
