use std::collections::BTreeMap;

use tickreel_shared::TickIndex;

use crate::extension::{Extension, FileCommandExtension, OnClear, OnPlayback};
use crate::playback::TickInputContainer;
use crate::tasfile::{FileCommand, LoadError};

const LABEL: &str = "label";

/// Free-form annotations attached to ticks, written as inline `$label` lines.
#[derive(Debug, Default)]
pub struct LabelExtension {
    labels: BTreeMap<TickIndex, Vec<String>>,
}

impl LabelExtension {
    pub const NAME: &'static str = "Labels";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_label(&mut self, tick: TickIndex, text: impl Into<String>) {
        self.labels.entry(tick).or_default().push(text.into());
    }

    pub fn labels_at(&self, tick: TickIndex) -> &[String] {
        self.labels.get(&tick).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of labels across all ticks.
    pub fn len(&self) -> usize {
        self.labels.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Extension for LabelExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn as_on_playback(&mut self) -> Option<&mut dyn OnPlayback> {
        Some(self)
    }

    fn as_on_clear(&mut self) -> Option<&mut dyn OnClear> {
        Some(self)
    }
}

impl OnPlayback for LabelExtension {
    fn on_playback(&mut self, tick: TickIndex, _input: &TickInputContainer) {
        for label in self.labels_at(tick) {
            tracing::info!(tick = tick.0, label = %label, "Reached label");
        }
    }
}

impl OnClear for LabelExtension {
    fn on_clear(&mut self) {
        self.labels.clear();
    }
}

impl FileCommandExtension for LabelExtension {
    fn command_names(&self) -> &[&'static str] {
        &[LABEL]
    }

    fn on_serialise_inline(&self, tick: TickIndex) -> Vec<FileCommand> {
        self.labels_at(tick)
            .iter()
            .map(|text| FileCommand::new(LABEL, [text.as_str()]))
            .collect()
    }

    fn on_deserialise_inline(
        &mut self,
        tick: TickIndex,
        commands: Vec<FileCommand>,
    ) -> Result<(), LoadError> {
        let mut texts = Vec::with_capacity(commands.len());
        for command in commands {
            let [text] = <[String; 1]>::try_from(command.args.into_vec()).map_err(|args| {
                LoadError::CorruptCommand {
                    extension: Self::NAME.to_string(),
                    tick,
                    detail: format!("label takes exactly one argument, got {}", args.len()),
                }
            })?;
            texts.push(text);
        }

        self.labels.entry(tick).or_default().extend(texts);
        Ok(())
    }
}
