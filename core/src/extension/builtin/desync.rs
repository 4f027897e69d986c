use std::collections::BTreeMap;
use std::sync::Arc;

use tickreel_shared::TickIndex;

use crate::extension::{Extension, FileCommandExtension, OnClear, OnPlayback, OnRecord};
use crate::playback::TickInputContainer;
use crate::tasfile::{FileCommand, LoadError};

use super::{Position, PositionProbe};

const DESYNC: &str = "desync";

/// Default distance, in world units, tolerated before a tick counts as a desync.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// A replayed tick whose position drifted from the recorded one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Desync {
    pub tick: TickIndex,
    pub expected: Position,
    pub actual: Position,
}

/// Records the controlled entity's position every tick and reports ticks
/// where playback ends up somewhere else.
///
/// Positions are stored as endline `$desync x,y,z;` commands.
pub struct DesyncMonitorExtension {
    probe: Arc<dyn PositionProbe>,
    tolerance: f64,
    recorded: BTreeMap<TickIndex, Position>,
    desyncs: Vec<Desync>,
}

impl DesyncMonitorExtension {
    pub const NAME: &'static str = "DesyncMonitor";

    pub fn new(probe: Arc<dyn PositionProbe>) -> Self {
        Self {
            probe,
            tolerance: DEFAULT_TOLERANCE,
            recorded: BTreeMap::new(),
            desyncs: Vec::new(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn recorded_at(&self, tick: TickIndex) -> Option<Position> {
        self.recorded.get(&tick).copied()
    }

    /// Desyncs seen since the last clear, in tick order.
    pub fn desyncs(&self) -> &[Desync] {
        &self.desyncs
    }
}

impl Extension for DesyncMonitorExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn as_on_record(&mut self) -> Option<&mut dyn OnRecord> {
        Some(self)
    }

    fn as_on_playback(&mut self) -> Option<&mut dyn OnPlayback> {
        Some(self)
    }

    fn as_on_clear(&mut self) -> Option<&mut dyn OnClear> {
        Some(self)
    }
}

impl OnRecord for DesyncMonitorExtension {
    fn on_record(&mut self, tick: TickIndex, _input: &TickInputContainer) {
        self.recorded.insert(tick, self.probe.position());
    }
}

impl OnPlayback for DesyncMonitorExtension {
    fn on_playback(&mut self, tick: TickIndex, _input: &TickInputContainer) {
        let Some(expected) = self.recorded.get(&tick).copied() else {
            return;
        };

        let actual = self.probe.position();
        let distance = expected.distance_to(&actual);
        if distance > self.tolerance {
            tracing::warn!(
                tick = tick.0,
                distance,
                expected = ?(expected.x, expected.y, expected.z),
                actual = ?(actual.x, actual.y, actual.z),
                "Playback desynced"
            );
            self.desyncs.push(Desync {
                tick,
                expected,
                actual,
            });
        }
    }
}

impl OnClear for DesyncMonitorExtension {
    fn on_clear(&mut self) {
        self.recorded.clear();
        self.desyncs.clear();
    }
}

impl FileCommandExtension for DesyncMonitorExtension {
    fn command_names(&self) -> &[&'static str] {
        &[DESYNC]
    }

    fn on_serialise_endline(&self, tick: TickIndex) -> Vec<FileCommand> {
        match self.recorded.get(&tick) {
            Some(p) => vec![FileCommand::new(
                DESYNC,
                [p.x.to_string(), p.y.to_string(), p.z.to_string()],
            )],
            None => Vec::new(),
        }
    }

    fn on_deserialise_endline(
        &mut self,
        tick: TickIndex,
        commands: Vec<FileCommand>,
    ) -> Result<(), LoadError> {
        let corrupt = |detail: String| LoadError::CorruptCommand {
            extension: Self::NAME.to_string(),
            tick,
            detail,
        };

        // Only the last command of a tick counts
        let Some(command) = commands.last() else {
            return Ok(());
        };
        let [x, y, z] = command.args.as_slice() else {
            return Err(corrupt(format!(
                "desync takes x,y,z, got {} arguments",
                command.args.len()
            )));
        };

        let mut coords = [0f64; 3];
        for (slot, raw) in coords.iter_mut().zip([x, y, z]) {
            *slot = raw
                .parse()
                .map_err(|e| corrupt(format!("{raw:?}: {e}")))?;
        }

        let [x, y, z] = coords;
        self.recorded.insert(
            tick,
            Position {
                x,
                y,
                z,
                ..Position::default()
            },
        );
        Ok(())
    }
}
