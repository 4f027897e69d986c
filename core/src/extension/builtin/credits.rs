use tickreel_shared::TickIndex;

use crate::extension::{
    Extension, MetadataExtension, OnClear, OnRecord, OnStateChange, StateChange,
};
use crate::playback::{PlaybackState, TickInputContainer};
use crate::tasfile::{LoadError, PlaybackMetadata, SerializationError};

/// Simulation rate the playing time is derived from.
pub const TICKS_PER_SECOND: u64 = 20;
const MILLIS_PER_TICK: u64 = 1000 / TICKS_PER_SECOND;

const AUTHOR: &str = "Author";
const TITLE: &str = "Title";
const PLAYING_TIME: &str = "Playing Time";
const RERECORDS: &str = "Rerecords";

/// Who made the recording, and how long it took.
///
/// Playing time grows by one tick per recorded tick. A rerecord is counted
/// each time recording resumes on a non-empty log.
#[derive(Debug, Clone)]
pub struct CreditsExtension {
    default_author: String,
    author: String,
    title: String,
    playing_ticks: u64,
    rerecords: u32,
}

impl CreditsExtension {
    pub const NAME: &'static str = "Credits";

    pub fn new(author: impl Into<String>) -> Self {
        let author = author.into();
        Self {
            default_author: author.clone(),
            author,
            title: String::new(),
            playing_ticks: 0,
            rerecords: 0,
        }
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = author.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn playing_ticks(&self) -> u64 {
        self.playing_ticks
    }

    pub fn rerecords(&self) -> u32 {
        self.rerecords
    }

    pub fn note_rerecord(&mut self) {
        self.rerecords = self.rerecords.saturating_add(1);
    }
}

impl Default for CreditsExtension {
    fn default() -> Self {
        Self::new("Unknown")
    }
}

impl Extension for CreditsExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn as_on_record(&mut self) -> Option<&mut dyn OnRecord> {
        Some(self)
    }

    fn as_on_clear(&mut self) -> Option<&mut dyn OnClear> {
        Some(self)
    }

    fn as_on_state_change(&mut self) -> Option<&mut dyn OnStateChange> {
        Some(self)
    }
}

impl OnRecord for CreditsExtension {
    fn on_record(&mut self, _tick: TickIndex, _input: &TickInputContainer) {
        self.playing_ticks += 1;
    }
}

impl OnStateChange for CreditsExtension {
    fn on_state_change(&mut self, change: StateChange) {
        if change.to == PlaybackState::Recording && change.log_len > 0 {
            self.note_rerecord();
        }
    }
}

impl OnClear for CreditsExtension {
    fn on_clear(&mut self) {
        self.author = self.default_author.clone();
        self.title.clear();
        self.playing_ticks = 0;
        self.rerecords = 0;
    }
}

impl MetadataExtension for CreditsExtension {
    fn on_store(&mut self) -> Result<PlaybackMetadata, SerializationError> {
        let mut metadata = PlaybackMetadata::new(Self::NAME);
        metadata.set_value(AUTHOR, self.author.as_str())?;
        metadata.set_value(TITLE, self.title.as_str())?;
        metadata.set_value(PLAYING_TIME, format_playing_time(self.playing_ticks))?;
        metadata.set_value(RERECORDS, self.rerecords.to_string())?;
        Ok(metadata)
    }

    fn on_load(&mut self, metadata: &PlaybackMetadata) -> Result<(), LoadError> {
        let corrupt = |key: &str, detail: String| LoadError::CorruptMetadata {
            block: Self::NAME.to_string(),
            key: key.to_string(),
            detail,
        };

        let playing_ticks = match metadata.get_value(PLAYING_TIME) {
            Some(value) => parse_playing_time(value).map_err(|e| corrupt(PLAYING_TIME, e))?,
            None => 0,
        };
        let rerecords = match metadata.get_value(RERECORDS) {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .map_err(|e| corrupt(RERECORDS, e.to_string()))?,
            None => 0,
        };

        self.author = metadata
            .get_value(AUTHOR)
            .map_or_else(|| self.default_author.clone(), str::to_string);
        self.title = metadata.get_value(TITLE).unwrap_or_default().to_string();
        self.playing_ticks = playing_ticks;
        self.rerecords = rerecords;
        Ok(())
    }
}

/// `HH:MM:SS.mmm`
fn format_playing_time(ticks: u64) -> String {
    let millis = ticks.saturating_mul(MILLIS_PER_TICK);
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        millis / 3_600_000,
        (millis / 60_000) % 60,
        (millis / 1000) % 60,
        millis % 1000
    )
}

fn parse_playing_time(value: &str) -> Result<u64, String> {
    let invalid = || format!("expected HH:MM:SS.mmm, got {value:?}");

    let mut parts = value.trim().split(':');
    let (Some(hours), Some(minutes), Some(rest), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    let (seconds, millis) = rest.split_once('.').ok_or_else(invalid)?;

    let mut total: u64 = 0;
    for (field, scale) in [(hours, 3_600_000), (minutes, 60_000), (seconds, 1000), (millis, 1)] {
        let n = field.parse::<u64>().map_err(|_| invalid())?;
        total = n
            .checked_mul(scale)
            .and_then(|ms| total.checked_add(ms))
            .ok_or_else(invalid)?;
    }

    Ok(total / MILLIS_PER_TICK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(from: PlaybackState, to: PlaybackState, log_len: usize) -> StateChange {
        StateChange { from, to, log_len }
    }

    #[test]
    fn test_playing_time_format() {
        assert_eq!(format_playing_time(0), "00:00:00.000");
        assert_eq!(format_playing_time(1), "00:00:00.050");
        assert_eq!(format_playing_time(20 * 3661 + 3), "01:01:01.150");
        assert_eq!(parse_playing_time("01:01:01.150"), Ok(20 * 3661 + 3));
        assert!(parse_playing_time("1:2").is_err());
        assert!(parse_playing_time("aa:00:00.000").is_err());
    }

    #[test]
    fn test_rerecords_count_resumed_recordings() {
        let mut credits = CreditsExtension::new("Alice");
        credits.on_state_change(change(PlaybackState::Idle, PlaybackState::Recording, 0));
        assert_eq!(credits.rerecords(), 0);

        credits.on_state_change(change(PlaybackState::Idle, PlaybackState::Recording, 12));
        credits.on_state_change(change(PlaybackState::Idle, PlaybackState::Playback, 12));
        assert_eq!(credits.rerecords(), 1);
    }

    #[test]
    fn test_store_load_round_trip() {
        let mut credits = CreditsExtension::new("Alice");
        credits.set_title("Any%");
        for i in 0..45 {
            credits.on_record(TickIndex(i), &TickInputContainer::default());
        }
        credits.note_rerecord();

        let stored = credits.on_store().unwrap();
        assert_eq!(stored.get_value(PLAYING_TIME), Some("00:00:02.250"));

        let mut restored = CreditsExtension::new("Bob");
        restored.on_load(&stored).unwrap();
        assert_eq!(restored.author(), "Alice");
        assert_eq!(restored.title(), "Any%");
        assert_eq!(restored.playing_ticks(), 45);
        assert_eq!(restored.rerecords(), 1);
    }

    #[test]
    fn test_corrupt_number_leaves_state_untouched() {
        let mut credits = CreditsExtension::new("Alice");
        credits.set_title("Kept");
        credits.note_rerecord();

        let mut metadata = PlaybackMetadata::new(CreditsExtension::NAME);
        metadata.set_value(AUTHOR, "Mallory").unwrap();
        metadata.set_value(RERECORDS, "many").unwrap();

        let err = credits.on_load(&metadata).unwrap_err();
        assert!(matches!(err, LoadError::CorruptMetadata { ref key, .. } if key == RERECORDS));
        assert_eq!(credits.author(), "Alice");
        assert_eq!(credits.title(), "Kept");
        assert_eq!(credits.rerecords(), 1);
    }

    #[test]
    fn test_oversized_playing_time_is_corrupt() {
        let mut credits = CreditsExtension::new("Alice");
        let mut metadata = PlaybackMetadata::new(CreditsExtension::NAME);
        metadata
            .set_value(PLAYING_TIME, "99999999999999:00:00.000")
            .unwrap();

        let err = credits.on_load(&metadata).unwrap_err();
        assert!(matches!(err, LoadError::CorruptMetadata { ref key, .. } if key == PLAYING_TIME));
        assert_eq!(credits.playing_ticks(), 0);
        assert!(parse_playing_time("0:0:18446744073709551.615").is_err());
    }

    #[test]
    fn test_clear_restores_defaults() {
        let mut credits = CreditsExtension::new("Alice");
        credits.set_author("Someone");
        credits.set_title("Run");
        credits.on_record(TickIndex(0), &TickInputContainer::default());
        credits.note_rerecord();

        credits.on_clear();
        assert_eq!(credits.author(), "Alice");
        assert_eq!(credits.title(), "");
        assert_eq!(credits.playing_ticks(), 0);
        assert_eq!(credits.rerecords(), 0);
    }
}
