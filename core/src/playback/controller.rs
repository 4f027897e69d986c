//! Playback controller
//!
//! State machine over idle, recording and playback. Recording and playback
//! are only reachable from idle.

use bitcode::{Decode, Encode};
use tickreel_shared::TickIndex;

use crate::extension::{Extensions, StateChange};
use crate::tasfile::PlaybackMetadata;

use super::{InputSource, TickInputContainer, TickLog};

/// Controller state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Encode, Decode)]
pub enum PlaybackState {
    #[default]
    Idle,
    Recording,
    Playback,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Recording => write!(f, "recording"),
            PlaybackState::Playback => write!(f, "playback"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("cannot go from {from} to {to} directly")]
    InvalidTransition {
        from: PlaybackState,
        to: PlaybackState,
    },
    #[error("operation requires the idle state, controller is {0}")]
    NotIdle(PlaybackState),
}

/// What one call to [`PlaybackController::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing to do
    Idle,
    /// Live input was sampled and appended at this tick
    Recorded(TickIndex),
    /// This recorded input replaces live input for the tick
    Replayed(TickIndex, TickInputContainer),
    /// The log ran out; the controller is idle again
    PlaybackFinished,
}

/// Called with `(from, to)` before the controller enters `to`.
pub type StateListener = Box<dyn FnMut(PlaybackState, PlaybackState) + Send>;

/// Drives recording and playback of the tick log.
///
/// The log is owned by the host thread; nothing here locks.
pub struct PlaybackController {
    state: PlaybackState,
    log: TickLog,
    /// Next tick to record or replay
    index: usize,
    listeners: Vec<StateListener>,
    /// Header blocks of the last loaded file
    metadata: Vec<PlaybackMetadata>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            log: TickLog::new(),
            index: 0,
            listeners: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn log(&self) -> &TickLog {
        &self.log
    }

    /// Next tick to be recorded or replayed
    pub fn current_tick(&self) -> TickIndex {
        TickIndex(self.index as u64)
    }

    /// Header blocks cached from the last load
    pub fn metadata(&self) -> &[PlaybackMetadata] {
        &self.metadata
    }

    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: FnMut(PlaybackState, PlaybackState) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Request a state change.
    ///
    /// Recording resumes at the end of the log; playback starts at tick 0.
    /// Requesting the current state does nothing.
    pub fn set_state(
        &mut self,
        next: PlaybackState,
        extensions: &mut Extensions,
    ) -> Result<(), StateError> {
        use PlaybackState::*;

        match (self.state, next) {
            (from, to) if from == to => Ok(()),
            (Idle, Recording) | (Idle, Playback) | (Recording, Idle) | (Playback, Idle) => {
                self.transition(next, extensions);
                Ok(())
            }
            (from, to) => Err(StateError::InvalidTransition { from, to }),
        }
    }

    /// Advance one tick.
    pub fn tick(&mut self, source: &mut dyn InputSource, extensions: &mut Extensions) -> TickOutcome {
        match self.state {
            PlaybackState::Idle => TickOutcome::Idle,
            PlaybackState::Recording => {
                let tick = self.current_tick();
                self.log.push(source.sample(tick));
                self.index += 1;
                if let Some(input) = self.log.get(tick) {
                    extensions.on_record(tick, input);
                }
                tracing::trace!(tick = tick.0, "Recorded tick");
                TickOutcome::Recorded(tick)
            }
            PlaybackState::Playback => {
                let tick = self.current_tick();
                let Some(input) = self.log.get(tick).cloned() else {
                    tracing::info!(ticks = self.log.len(), "Playback finished");
                    self.transition(PlaybackState::Idle, extensions);
                    return TickOutcome::PlaybackFinished;
                };
                extensions.on_playback(tick, &input);
                self.index += 1;
                tracing::trace!(tick = tick.0, "Replayed tick");
                TickOutcome::Replayed(tick, input)
            }
        }
    }

    /// Wipe the log and all derived extension state.
    ///
    /// Leaves recording or playback first. Every registered extension is
    /// cleared, enabled or not.
    pub fn clear(&mut self, extensions: &mut Extensions) {
        if self.state != PlaybackState::Idle {
            self.transition(PlaybackState::Idle, extensions);
        }
        self.log.clear();
        self.index = 0;
        self.metadata.clear();
        extensions.on_clear();
        tracing::debug!("Cleared playback log");
    }

    /// Install a freshly loaded log.
    pub fn replace_log(
        &mut self,
        log: TickLog,
        metadata: Vec<PlaybackMetadata>,
    ) -> Result<(), StateError> {
        if self.state != PlaybackState::Idle {
            return Err(StateError::NotIdle(self.state));
        }
        self.log = log;
        self.index = 0;
        self.metadata = metadata;
        Ok(())
    }

    fn transition(&mut self, next: PlaybackState, extensions: &mut Extensions) {
        let from = self.state;

        for listener in &mut self.listeners {
            listener(from, next);
        }
        extensions.on_state_change(StateChange {
            from,
            to: next,
            log_len: self.log.len(),
        });

        self.state = next;
        match next {
            PlaybackState::Recording => self.index = self.log.len(),
            PlaybackState::Playback => self.index = 0,
            PlaybackState::Idle => {}
        }

        tracing::info!(%from, to = %next, ticks = self.log.len(), "Playback state changed");
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}
