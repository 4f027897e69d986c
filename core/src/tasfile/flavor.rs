//! Input encodings
//!
//! A flavor is a versioned encoding of [`TickInputContainer`] into the text
//! after `<tick>|` on each tick line. The file header names the flavor it was
//! written with, so older encodings can keep loading after a new one becomes
//! the default.

use tickreel_shared::TickIndex;

use crate::extension::Extension;
use crate::playback::{CameraAngle, MouseState, TickInputContainer};

use super::SerializationError;

pub trait SerialiserFlavor: Extension {
    fn encode_input(
        &self,
        tick: TickIndex,
        input: &TickInputContainer,
    ) -> Result<String, SerializationError>;

    /// Decode one tick's input. The error is a human readable detail; the
    /// caller adds the line number.
    fn decode_input(&self, encoded: &str) -> Result<TickInputContainer, String>;
}

/// `<keys>;<mouse buttons>;<dx>,<dy>,<scroll>;<pitch>,<yaw>`
///
/// Keys and buttons are comma separated names without spaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct V1Flavor;

impl V1Flavor {
    pub const NAME: &'static str = "v1";
}

impl Extension for V1Flavor {
    fn name(&self) -> &str {
        Self::NAME
    }
}

impl SerialiserFlavor for V1Flavor {
    fn encode_input(
        &self,
        tick: TickIndex,
        input: &TickInputContainer,
    ) -> Result<String, SerializationError> {
        for name in input.keyboard.iter().chain(&input.mouse.buttons) {
            if !is_valid_input_name(name) {
                return Err(SerializationError::InvalidInput {
                    tick,
                    reason: format!("cannot encode input name {name:?}"),
                });
            }
        }

        let mouse = &input.mouse;
        Ok(format!(
            "{};{};{},{},{};{:?},{:?}",
            input.keyboard.join(","),
            mouse.buttons.join(","),
            mouse.dx,
            mouse.dy,
            mouse.scroll,
            input.camera.pitch,
            input.camera.yaw,
        ))
    }

    fn decode_input(&self, encoded: &str) -> Result<TickInputContainer, String> {
        let fields: Vec<&str> = encoded.split(';').collect();
        let [keys, buttons, mouse, camera] = fields.as_slice() else {
            return Err(format!(
                "expected 4 ';' separated fields, found {}",
                fields.len()
            ));
        };

        let (dx, dy, scroll) = match mouse.split(',').collect::<Vec<_>>().as_slice() {
            [dx, dy, scroll] => (number(dx)?, number(dy)?, number(scroll)?),
            _ => return Err(format!("expected dx,dy,scroll, found {mouse:?}")),
        };
        let (pitch, yaw) = match camera.split_once(',') {
            Some((pitch, yaw)) => (number(pitch)?, number(yaw)?),
            None => return Err(format!("expected pitch,yaw, found {camera:?}")),
        };

        Ok(TickInputContainer {
            keyboard: names(keys)?,
            mouse: MouseState {
                buttons: names(buttons)?,
                dx,
                dy,
                scroll,
            },
            camera: CameraAngle { pitch, yaw },
        })
    }
}

fn is_valid_input_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | ';' | '|' | '/'))
}

fn names(field: &str) -> Result<Vec<String>, String> {
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field
        .split(',')
        .map(|name| {
            if is_valid_input_name(name) {
                Ok(name.to_string())
            } else {
                Err(format!("invalid input name {name:?}"))
            }
        })
        .collect()
}

fn number<T>(raw: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| format!("{raw:?}: {e}"))
}
