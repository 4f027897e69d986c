//! Recording and playback of per-tick input

mod controller;
mod input;
mod log;

pub use controller::{PlaybackController, PlaybackState, StateError, StateListener, TickOutcome};
pub use input::{CameraAngle, InputSource, MouseState, TickInputContainer};
pub use log::TickLog;
