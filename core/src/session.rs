//! Session root
//!
//! [`TasSession`] owns everything one recording needs: the controller and its
//! log, the extension registries, the flavor registry and the codec
//! settings. Hosts drive it once per tick; tools use it to save and load
//! TASfiles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{
    ConfigError, ConfigStore, PLAYBACK_NOTIFY_STATE, TASFILE_DIRECTORY, TASFILE_FLAVOR,
    TASFILE_SEPARATOR, TICKSYNC_ENABLED,
};
use crate::extension::{ExtensionRegistry, Extensions};
use crate::net::packets::{PLAYBACK_STATE, PlaybackStateChange, encode_packet};
use crate::net::{PacketSink, TickSyncServer};
use crate::playback::{InputSource, PlaybackController, PlaybackState, StateError, TickOutcome};
use crate::tasfile::{
    DEFAULT_SEPARATOR, LoadError, SerialiserFlavor, SerializationError, TASFILE_EXTENSION,
    TasFileCodec, V1Flavor,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("failed to save TASfile: {0}")]
    Save(#[from] SerializationError),
    #[error("failed to load TASfile: {0}")]
    Load(#[from] LoadError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// True for failures that leave the session as it was, such as loading
    /// a file that does not exist.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Load(e) if e.is_recoverable())
    }
}

/// How a session is set up. [`Default`] matches the config defaults.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub directory: PathBuf,
    pub separator: char,
    pub flavor: String,
    pub tick_sync: bool,
    pub notify_state: bool,
}

impl SessionSettings {
    pub fn from_config(config: &ConfigStore) -> Result<Self, ConfigError> {
        Ok(Self {
            directory: PathBuf::from(config.get(&TASFILE_DIRECTORY)),
            separator: config.get_char(&TASFILE_SEPARATOR)?,
            flavor: config.get(&TASFILE_FLAVOR).to_string(),
            tick_sync: config.get_bool(&TICKSYNC_ENABLED)?,
            notify_state: config.get_bool(&PLAYBACK_NOTIFY_STATE)?,
        })
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(TASFILE_DIRECTORY.default),
            separator: DEFAULT_SEPARATOR,
            flavor: V1Flavor::NAME.to_string(),
            tick_sync: true,
            notify_state: true,
        }
    }
}

pub struct TasSession {
    controller: PlaybackController,
    extensions: Extensions,
    flavors: ExtensionRegistry<dyn SerialiserFlavor>,
    codec: TasFileCodec,
    /// Relative file names are resolved against this
    directory: PathBuf,
    tick_sync: Option<Arc<TickSyncServer>>,
    sink: Option<Arc<dyn PacketSink>>,
    notify_state: bool,
}

impl TasSession {
    pub fn new() -> Self {
        Self::build(TasFileCodec::default(), SessionSettings::default())
    }

    pub fn with_settings(settings: SessionSettings) -> Result<Self, SessionError> {
        let codec = TasFileCodec::new(settings.separator, settings.flavor.clone())?;
        Ok(Self::build(codec, settings))
    }

    pub fn from_config(config: &ConfigStore) -> Result<Self, SessionError> {
        Self::with_settings(SessionSettings::from_config(config)?)
    }

    fn build(codec: TasFileCodec, settings: SessionSettings) -> Self {
        let mut flavors: ExtensionRegistry<dyn SerialiserFlavor> = ExtensionRegistry::new("flavor");
        flavors.register(Box::new(V1Flavor));

        Self {
            controller: PlaybackController::new(),
            extensions: Extensions::new(),
            flavors,
            codec,
            directory: settings.directory,
            tick_sync: settings.tick_sync.then(|| Arc::new(TickSyncServer::new())),
            sink: None,
            notify_state: settings.notify_state,
        }
    }

    /// Send packets to peers through `sink`.
    ///
    /// Unless disabled in the settings, every controller transition is
    /// broadcast as a [`PLAYBACK_STATE`] packet.
    pub fn with_packet_sink(mut self, sink: Arc<dyn PacketSink>) -> Self {
        if self.notify_state {
            let peers = Arc::clone(&sink);
            self.controller.add_listener(move |from, to| {
                let frame = encode_packet(PLAYBACK_STATE, &PlaybackStateChange { from, to });
                if let Err(e) = peers.broadcast(frame) {
                    tracing::warn!(error = %e, %from, %to, "Playback state not delivered to every peer");
                }
            });
        }
        self.sink = Some(sink);
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn flavors_mut(&mut self) -> &mut ExtensionRegistry<dyn SerialiserFlavor> {
        &mut self.flavors
    }

    pub fn codec(&self) -> &TasFileCodec {
        &self.codec
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Barrier gating [`Self::step`], if tick sync is enabled.
    pub fn tick_sync(&self) -> Option<&Arc<TickSyncServer>> {
        self.tick_sync.as_ref()
    }

    pub fn set_state(&mut self, state: PlaybackState) -> Result<(), SessionError> {
        self.controller.set_state(state, &mut self.extensions)?;
        Ok(())
    }

    /// Run one tick of the controller.
    pub fn tick(&mut self, source: &mut dyn InputSource) -> TickOutcome {
        self.controller.tick(source, &mut self.extensions)
    }

    /// Run one tick once every peer acknowledged the previous one.
    ///
    /// Returns `None` while the barrier is still waiting. Without tick sync,
    /// or without a packet sink to announce the advance, this is [`Self::tick`].
    pub fn step(&mut self, source: &mut dyn InputSource) -> Option<TickOutcome> {
        if let (Some(barrier), Some(sink)) = (&self.tick_sync, &self.sink) {
            barrier.try_advance(sink.as_ref())?;
        }
        Some(self.tick(source))
    }

    /// Drop the log and every extension's derived state.
    pub fn clear(&mut self) {
        self.controller.clear(&mut self.extensions);
    }

    /// Where `name` is stored: relative names live in the session directory
    /// and get the `.tas` extension if they have none.
    pub fn resolve_path(&self, name: impl AsRef<Path>) -> PathBuf {
        let mut path = self.directory.join(name);
        if path.extension().is_none() {
            path.set_extension(TASFILE_EXTENSION);
        }
        path
    }

    /// Render the current log and extension state as TASfile text.
    pub fn save_to_string(&mut self) -> Result<String, SessionError> {
        let text = self
            .codec
            .save(&self.flavors, &mut self.extensions, self.controller.log())?;
        Ok(text)
    }

    /// Save to `name` (see [`Self::resolve_path`]) and return the full path.
    pub fn save(&mut self, name: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
        let path = self.resolve_path(name);
        let text = self.save_to_string()?;

        let io_err = |source| SessionError::Io {
            path: path.clone(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        std::fs::write(&path, text).map_err(io_err)?;

        tracing::info!(
            path = %path.display(),
            ticks = self.controller.log().len(),
            "Saved TASfile"
        );
        Ok(path)
    }

    /// Load `name` (see [`Self::resolve_path`]), replacing the log and every
    /// extension's state.
    ///
    /// A missing file is reported as a recoverable error and leaves the
    /// session untouched.
    pub fn load(&mut self, name: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = self.resolve_path(name);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "TASfile not found, keeping current session");
                return Err(LoadError::NotFound(path).into());
            }
            Err(e) => return Err(LoadError::Io(e).into()),
        };

        self.load_from_str(&text)?;
        tracing::info!(
            path = %path.display(),
            ticks = self.controller.log().len(),
            "Loaded TASfile"
        );
        Ok(())
    }

    /// Load TASfile text.
    ///
    /// A file that does not parse leaves the session untouched. Once parsed,
    /// the session is cleared and rebuilt from the file; if an extension
    /// rejects its data the session is cleared again, so it never keeps a
    /// half-loaded state.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), SessionError> {
        let parsed = self.codec.parse(text, &self.flavors)?;

        self.controller.clear(&mut self.extensions);
        match self.codec.apply(parsed, &mut self.extensions) {
            Ok((log, metadata)) => {
                self.controller.replace_log(log, metadata)?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rejected TASfile, clearing session");
                self.controller.clear(&mut self.extensions);
                Err(e.into())
            }
        }
    }
}

impl Default for TasSession {
    fn default() -> Self {
        Self::new()
    }
}
