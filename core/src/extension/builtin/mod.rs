//! Extensions shipped with tickreel
//!
//! These cover the common needs of a TAS session (credits, start position,
//! per-tick labels and desync detection) and double as reference
//! implementations of each capability.

mod credits;
mod desync;
mod label;
mod start_position;

pub use credits::CreditsExtension;
pub use desync::{Desync, DesyncMonitorExtension};
pub use label::LabelExtension;
pub use start_position::StartPositionExtension;

use bitcode::{Decode, Encode};

/// A world position plus view angles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Encode, Decode)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pitch: f32,
    pub yaw: f32,
}

impl Position {
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Reads the controlled entity's position from the live simulation.
pub trait PositionProbe: Send + Sync {
    fn position(&self) -> Position;
}

impl<F> PositionProbe for F
where
    F: Fn() -> Position + Send + Sync,
{
    fn position(&self) -> Position {
        self()
    }
}
