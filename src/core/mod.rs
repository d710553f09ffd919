//! Core Primitives
//!
//! Geometry and sequencing primitives shared by the game and delivery
//! layers. No game rules live here.

pub mod geom;
pub mod sequence;

pub use geom::{Coordinates, Rect, Vec2};
pub use sequence::SequenceGenerator;
