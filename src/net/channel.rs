//! Connection Channels
//!
//! A [`ConnectionChannel`] is the room's handle to one client socket: an
//! mpsc sender owned by the transport layer, the peer address, and a
//! per-recipient ordering counter. A [`PlayerConnection`] bundles the
//! primary channel, any merged secondary channels, and the per-connection
//! reliable-delivery storages.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::game::events::{GameEvent, SequencedEvent};
use crate::net::ack::{
    AckEventValidator, AckRequiredEventStorage, DeliveryError, StateChangesRequireAck,
};
use crate::net::dedup::ProcessedEventStorage;

/// Channel capacity per connection. A consumer this far behind is shed by
/// the backpressure path, not buffered further.
pub const CHANNEL_CAPACITY: usize = 64;

/// Event id stamped on events that are never ack-tracked. Room-wide ids
/// start at zero, so no real event carries it.
pub const NO_ACK_EVENT_ID: i64 = -1;

/// One delivery path to a client.
pub struct ConnectionChannel {
    /// Channel identity.
    pub id: Uuid,
    /// Peer address, recorded at accept time.
    pub peer_addr: SocketAddr,
    sender: mpsc::Sender<SequencedEvent>,
    next_order: AtomicU64,
}

impl ConnectionChannel {
    /// Create a channel and hand back the receiver for the transport's
    /// writer task.
    pub fn new(peer_addr: SocketAddr) -> (Self, mpsc::Receiver<SequencedEvent>) {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        (
            Self {
                id: Uuid::new_v4(),
                peer_addr,
                sender,
                next_order: AtomicU64::new(0),
            },
            receiver,
        )
    }

    /// Stamp the event with the room-wide event id and this recipient's
    /// next ordering number, then send it. Errors (receiver gone) are the
    /// transport's problem, not the room's.
    pub async fn send(&self, event_id: i64, event: GameEvent) {
        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .sender
            .send(SequencedEvent {
                event_id,
                order,
                event,
            })
            .await;
    }

    /// Best-effort synchronous notification, used where awaiting is not an
    /// option (room close runs inside the lock).
    pub fn try_send(&self, event_id: i64, event: GameEvent) {
        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        let _ = self.sender.try_send(SequencedEvent {
            event_id,
            order,
            event,
        });
    }

    /// Whether the transport side is still listening.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// All delivery state of one logical player.
pub struct PlayerConnection {
    /// The channel the player joined with.
    pub primary: ConnectionChannel,
    /// Additional channels bound via `merge_connection`.
    pub secondaries: Vec<ConnectionChannel>,
    /// Outbound events awaiting confirmation.
    pub acks: AckRequiredEventStorage<GameEvent>,
    /// Receive-side dedup of redelivered command ids.
    pub processed: ProcessedEventStorage,
}

impl PlayerConnection {
    /// Wrap a primary channel with the default ack policy.
    pub fn new(primary: ConnectionChannel, ack_capacity: usize, dedup_ttl: Duration) -> Self {
        Self::with_validator(
            primary,
            ack_capacity,
            dedup_ttl,
            Arc::new(StateChangesRequireAck),
        )
    }

    /// Wrap a primary channel with a custom ack policy.
    pub fn with_validator(
        primary: ConnectionChannel,
        ack_capacity: usize,
        dedup_ttl: Duration,
        validator: Arc<dyn AckEventValidator<GameEvent>>,
    ) -> Self {
        Self {
            primary,
            secondaries: Vec::new(),
            acks: AckRequiredEventStorage::new(ack_capacity, validator),
            processed: ProcessedEventStorage::new(dedup_ttl),
        }
    }

    /// Whether a secondary channel may be merged: it must come from the
    /// same peer as the primary.
    pub fn accepts_merge(&self, channel: &ConnectionChannel) -> bool {
        channel.peer_addr.ip() == self.primary.peer_addr.ip()
    }

    /// Bind an additional delivery path.
    pub fn merge(&mut self, channel: ConnectionChannel) {
        self.secondaries.push(channel);
    }

    /// All delivery paths, primary first.
    pub fn channels(&self) -> impl Iterator<Item = &ConnectionChannel> {
        std::iter::once(&self.primary).chain(self.secondaries.iter())
    }

    /// Deliver one event on every path, parking it for acknowledgement
    /// first when the policy requires it. `event_id` is the room-wide
    /// sequence number the client confirms with; it rides along in every
    /// `SequencedEvent`.
    pub fn deliver(&mut self, event_id: i64, event: &GameEvent) -> Result<(), DeliveryError> {
        self.acks.require_ack(event_id, event.clone())?;
        for channel in self.channels() {
            channel.try_send(event_id, event.clone());
        }
        Ok(())
    }

    /// Best-effort disconnect notification on every path. Never
    /// ack-tracked, so it carries no real event id.
    pub fn notify_disconnect(&self) {
        for channel in self.channels() {
            channel.try_send(NO_ACK_EVENT_ID, GameEvent::Disconnect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last_octet: u8) -> SocketAddr {
        format!("10.0.0.{last_octet}:4000").parse().unwrap()
    }

    #[tokio::test]
    async fn test_ordering_numbers_are_per_recipient() {
        let (channel, mut receiver) = ConnectionChannel::new(addr(1));

        channel.send(7, GameEvent::Disconnect).await;
        channel.send(8, GameEvent::Disconnect).await;

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.order, 0);
        assert_eq!(first.event_id, 7);
        let second = receiver.recv().await.unwrap();
        assert_eq!(second.order, 1);
        assert_eq!(second.event_id, 8);
    }

    #[tokio::test]
    async fn test_merge_requires_same_peer() {
        let (primary, _rx1) = ConnectionChannel::new(addr(1));
        let connection = PlayerConnection::new(primary, 16, Duration::from_secs(1));

        let (same_peer, _rx2) = ConnectionChannel::new(addr(1));
        let (other_peer, _rx3) = ConnectionChannel::new(addr(2));

        assert!(connection.accepts_merge(&same_peer));
        assert!(!connection.accepts_merge(&other_peer));
    }

    #[tokio::test]
    async fn test_merged_channels_are_listed() {
        let (primary, _rx1) = ConnectionChannel::new(addr(1));
        let mut connection = PlayerConnection::new(primary, 16, Duration::from_secs(1));

        let (secondary, _rx2) = ConnectionChannel::new(addr(1));
        connection.merge(secondary);

        assert_eq!(connection.channels().count(), 2);
    }

    #[tokio::test]
    async fn test_fan_out_reaches_every_path() {
        let (primary, mut rx1) = ConnectionChannel::new(addr(1));
        let mut connection = PlayerConnection::new(primary, 16, Duration::from_secs(1));
        let (secondary, mut rx2) = ConnectionChannel::new(addr(1));
        connection.merge(secondary);

        for channel in connection.channels() {
            channel.send(0, GameEvent::Disconnect).await;
        }

        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
    }
}
