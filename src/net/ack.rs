//! Ack-Required Event Storage
//!
//! Outbound events whose delivery must be confirmed are parked here, keyed
//! by sequence id, until the recipient acks them. The storage is bounded:
//! exceeding the bound is an explicit backpressure error, never a silent
//! drop. The caller decides what to do with a slow consumer (shed load or
//! disconnect); nothing here retries.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::game::events::GameEvent;

/// Decides which events need delivery confirmation.
pub trait AckEventValidator<T>: Send + Sync {
    /// Whether losing this event would corrupt the observer's state.
    fn is_ack_required(&self, event: &T) -> bool;
}

/// Default policy: everything except moves. A lost move is superseded by
/// the next broadcast tick anyway.
pub struct StateChangesRequireAck;

impl AckEventValidator<GameEvent> for StateChangesRequireAck {
    fn is_ack_required(&self, event: &GameEvent) -> bool {
        !matches!(event, GameEvent::Move(_))
    }
}

/// Errors of the delivery layer.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The pending-ack bound was hit. Backpressure signal.
    #[error("Too many ack-required events: {pending} pending, capacity {capacity}")]
    TooManyPendingAcks {
        /// Events currently awaiting an ack.
        pending: usize,
        /// Configured bound.
        capacity: usize,
    },
}

/// Bounded `sequence id -> event` map of unacknowledged events.
pub struct AckRequiredEventStorage<T> {
    events: BTreeMap<i64, T>,
    max_elements: usize,
    validator: Arc<dyn AckEventValidator<T>>,
}

impl<T> AckRequiredEventStorage<T> {
    /// Create a storage with the given bound and ack policy.
    pub fn new(max_elements: usize, validator: Arc<dyn AckEventValidator<T>>) -> Self {
        Self {
            events: BTreeMap::new(),
            max_elements,
            validator,
        }
    }

    /// Park an event until it is acked. Events the validator exempts are
    /// accepted without being stored.
    pub fn require_ack(&mut self, sequence_id: i64, event: T) -> Result<(), DeliveryError> {
        if !self.validator.is_ack_required(&event) {
            return Ok(());
        }
        if self.events.len() >= self.max_elements && !self.events.contains_key(&sequence_id) {
            return Err(DeliveryError::TooManyPendingAcks {
                pending: self.events.len(),
                capacity: self.max_elements,
            });
        }
        self.events.insert(sequence_id, event);
        Ok(())
    }

    /// Confirm delivery. Acking an unknown or already-acked sequence id is
    /// a no-op.
    pub fn ack_received(&mut self, sequence_id: i64) -> Option<T> {
        self.events.remove(&sequence_id)
    }

    /// Bulk-remove events that no longer need confirmation (e.g. events
    /// about a player who just disconnected). Returns how many were
    /// removed.
    pub fn ack_not_required(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.events.len();
        self.events.retain(|_, event| !predicate(event));
        before - self.events.len()
    }

    /// Events currently awaiting an ack.
    pub fn pending(&self) -> usize {
        self.events.len()
    }
}
