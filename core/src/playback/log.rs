//! Append-only tick log

use tickreel_shared::TickIndex;

use super::TickInputContainer;

/// Recorded inputs, addressed by tick.
///
/// Entries are contiguous from tick 0: the only way to grow the log is
/// [`TickLog::push`], which always appends at the next index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickLog {
    ticks: Vec<TickInputContainer>,
}

impl TickLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input and return the tick it was stored at.
    pub fn push(&mut self, input: TickInputContainer) -> TickIndex {
        let tick = TickIndex(self.ticks.len() as u64);
        self.ticks.push(input);
        tick
    }

    pub fn get(&self, tick: TickIndex) -> Option<&TickInputContainer> {
        self.ticks.get(tick.as_usize())
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (TickIndex, &TickInputContainer)> + '_ {
        self.ticks
            .iter()
            .enumerate()
            .map(|(i, input)| (TickIndex(i as u64), input))
    }
}

impl From<Vec<TickInputContainer>> for TickLog {
    fn from(ticks: Vec<TickInputContainer>) -> Self {
        Self { ticks }
    }
}

impl FromIterator<TickInputContainer> for TickLog {
    fn from_iter<I: IntoIterator<Item = TickInputContainer>>(iter: I) -> Self {
        Self {
            ticks: iter.into_iter().collect(),
        }
    }
}
