//! Header block contents

use super::SerializationError;

/// Separator between key and value in header lines.
pub const DEFAULT_SEPARATOR: char = ':';

/// Check that `separator` cannot be confused with the rest of the format.
pub fn validate_separator(separator: char) -> Result<(), SerializationError> {
    if separator.is_whitespace() || matches!(separator, '[' | ']' | '#' | '$' | '|') {
        return Err(SerializationError::InvalidSeparator(separator));
    }
    Ok(())
}

/// Ordered key/value pairs owned by one metadata extension.
///
/// Keys are validated on insertion: a key that could not be read back
/// unambiguously is rejected and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackMetadata {
    extension_name: String,
    separator: char,
    data: Vec<(String, String)>,
}

impl PlaybackMetadata {
    pub fn new(extension_name: impl Into<String>) -> Self {
        Self::with_separator(extension_name, DEFAULT_SEPARATOR)
    }

    pub fn with_separator(extension_name: impl Into<String>, separator: char) -> Self {
        Self {
            extension_name: extension_name.into(),
            separator,
            data: Vec::new(),
        }
    }

    pub fn extension_name(&self) -> &str {
        &self.extension_name
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Insert or replace a value. Replacing keeps the key's original position.
    pub fn set_value(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), SerializationError> {
        let key = key.into();
        let value = value.into();
        self.validate_key(&key)?;
        if value.contains(['\n', '\r']) {
            return Err(SerializationError::LineBreak { key });
        }

        match self.data.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.data.push((key, value)),
        }
        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check every key against another separator, for writing with a
    /// separator other than the one the block was built with.
    pub(crate) fn check_separator(&self, separator: char) -> Result<(), SerializationError> {
        match self.data.iter().find(|(k, _)| k.contains(separator)) {
            Some((key, _)) => Err(SerializationError::KeyContainsSeparator {
                key: key.clone(),
                separator,
            }),
            None => Ok(()),
        }
    }

    fn validate_key(&self, key: &str) -> Result<(), SerializationError> {
        let invalid = |reason| SerializationError::InvalidKey {
            key: key.to_string(),
            reason,
        };

        if key.is_empty() {
            return Err(invalid("key is empty"));
        }
        if key.contains(self.separator) {
            return Err(SerializationError::KeyContainsSeparator {
                key: key.to_string(),
                separator: self.separator,
            });
        }
        if key.contains(['\n', '\r']) {
            return Err(invalid("key contains a line break"));
        }
        if key.starts_with(['#', '[']) {
            return Err(invalid("key starts with a reserved character"));
        }
        Ok(())
    }
}
