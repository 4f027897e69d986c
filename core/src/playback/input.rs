//! Per-tick input snapshots

use bitcode::{Decode, Encode};
use tickreel_shared::TickIndex;

/// Mouse state for one tick.
#[derive(Debug, Clone, Default, PartialEq, Encode, Decode)]
pub struct MouseState {
    /// Held buttons, by name (`LC`, `RC`, `MC`, ...)
    pub buttons: Vec<String>,
    pub dx: i32,
    pub dy: i32,
    pub scroll: i32,
}

/// Camera orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Encode, Decode)]
pub struct CameraAngle {
    pub pitch: f32,
    pub yaw: f32,
}

/// Everything the player did during one tick.
///
/// The core never interprets the contents; it only stores, serializes and
/// hands them back during playback.
#[derive(Debug, Clone, Default, PartialEq, Encode, Decode)]
pub struct TickInputContainer {
    /// Held keys, by name (`W`, `LSHIFT`, ...)
    pub keyboard: Vec<String>,
    pub mouse: MouseState,
    pub camera: CameraAngle,
}

impl TickInputContainer {
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keyboard = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_camera(mut self, pitch: f32, yaw: f32) -> Self {
        self.camera = CameraAngle { pitch, yaw };
        self
    }
}

/// Live input, sampled once per recorded tick.
pub trait InputSource {
    fn sample(&mut self, tick: TickIndex) -> TickInputContainer;
}

impl<F> InputSource for F
where
    F: FnMut(TickIndex) -> TickInputContainer,
{
    fn sample(&mut self, tick: TickIndex) -> TickInputContainer {
        self(tick)
    }
}
