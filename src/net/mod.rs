//! Delivery and Room Management
//!
//! Everything between the simulation and the transport: per-connection
//! channels, reliable-delivery bookkeeping (acks and dedup), and the
//! manager that owns rooms and their background cadences.

pub mod ack;
pub mod channel;
pub mod dedup;
pub mod rooms;

pub use ack::{AckEventValidator, AckRequiredEventStorage, DeliveryError};
pub use channel::{ConnectionChannel, PlayerConnection};
pub use dedup::ProcessedEventStorage;
pub use rooms::{RoomHandle, RoomManager};
