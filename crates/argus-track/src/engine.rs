//! Handle to the engine's tracking module.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use argus_core::backend::{BestShotCandidate, TrackObserver, TrackingBackend};
use argus_core::{
    BackendError, Edition, EngineError, FaceEngine, SettingsError, SettingsProvider,
};

use crate::observer::CallbackBuffer;
use crate::stream::Stream;

#[derive(Error, Debug)]
pub enum TrackError {
    /// The tracking configuration document could not be loaded.
    #[error("tracking configuration: {0}")]
    Config(#[from] SettingsError),
    /// The face engine refused the tracking module.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The engine refused to open a stream.
    #[error("stream acquisition: {0}")]
    Stream(BackendError),
}

/// Tracking module handle.
///
/// Exists only after the configuration loaded and the engine granted
/// the module, so every stream comes from a working handle. Holds its
/// `FaceEngine` alive for as long as any clone of this handle lives.
#[derive(Clone)]
pub struct TrackEngine {
    engine: Arc<FaceEngine>,
    backend: Arc<dyn TrackingBackend>,
    settings: SettingsProvider,
}

impl TrackEngine {
    /// Build the tracking module from the settings document at
    /// `config_path`. A missing or unparsable document fails here, as
    /// does a backend refusal.
    pub fn new(engine: Arc<FaceEngine>, config_path: &Path) -> Result<Self, TrackError> {
        let settings = SettingsProvider::load(config_path)?;
        Self::with_settings(engine, settings)
    }

    /// Build from an in-memory settings provider.
    pub fn with_settings(
        engine: Arc<FaceEngine>,
        settings: SettingsProvider,
    ) -> Result<Self, TrackError> {
        let backend = Arc::from(engine.create_tracking(&settings)?);
        tracing::info!(edition = %engine.edition(), "tracking engine ready");
        Ok(Self {
            engine,
            backend,
            settings,
        })
    }

    /// Open a stream with a fresh callback buffer as its observer.
    pub fn create_stream(&self) -> Result<Stream, TrackError> {
        self.open_with_buffer(CallbackBuffer::new())
    }

    /// Open a stream whose buffer consults `policy` before accepting a
    /// best-shot candidate.
    pub fn create_stream_with_policy(
        &self,
        policy: impl Fn(&BestShotCandidate) -> bool + Send + Sync + 'static,
    ) -> Result<Stream, TrackError> {
        self.open_with_buffer(CallbackBuffer::with_policy(policy))
    }

    fn open_with_buffer(&self, buffer: CallbackBuffer) -> Result<Stream, TrackError> {
        let buffer = Arc::new(buffer);
        let observer: Arc<dyn TrackObserver> = buffer.clone();
        let backend = self
            .backend
            .create_stream(observer)
            .map_err(TrackError::Stream)?;
        Ok(Stream::new(backend, buffer))
    }

    /// Capability tier of the engine this module was built from.
    pub fn edition(&self) -> Edition {
        self.engine.edition()
    }

    /// The tracking configuration this module runs with.
    pub fn settings(&self) -> &SettingsProvider {
        &self.settings
    }
}

impl fmt::Debug for TrackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackEngine")
            .field("edition", &self.edition())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_sim::{Script, SimEngineBackend};
    use std::path::PathBuf;

    fn sim_engine() -> Arc<FaceEngine> {
        Arc::new(FaceEngine::new(Arc::new(SimEngineBackend::new(
            Edition::FrontEnd,
            Script::demo(),
        ))))
    }

    #[test]
    fn test_missing_config_fails_construction() {
        let path = PathBuf::from("/nonexistent/tracking.toml");
        let err = TrackEngine::new(sim_engine(), &path).unwrap_err();
        assert!(matches!(
            err,
            TrackError::Config(SettingsError::NotFound(_))
        ));
    }

    #[test]
    fn test_unparsable_config_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.toml");
        std::fs::write(&path, "= not toml at all").unwrap();

        let err = TrackEngine::new(sim_engine(), &path).unwrap_err();
        assert!(matches!(err, TrackError::Config(SettingsError::Parse(_))));
    }

    #[test]
    fn test_config_on_disk_reaches_the_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.toml");
        std::fs::write(&path, "[sim]\nsynchronous = true\n").unwrap();

        let engine = TrackEngine::new(sim_engine(), &path).unwrap();
        assert_eq!(engine.edition(), Edition::FrontEnd);
        assert!(engine.settings().bool_of("sim", "synchronous", false));
        assert!(engine.create_stream().is_ok());
    }

    #[test]
    fn test_stream_refusal_is_distinguishable() {
        let mut settings = SettingsProvider::new();
        settings.set("sim", "fail-stream-create", true);

        let engine = TrackEngine::with_settings(sim_engine(), settings).unwrap();
        match engine.create_stream() {
            Err(TrackError::Stream(err)) => {
                assert_eq!(
                    err.code,
                    argus_core::ResultCode::ResourceUnavailable
                );
            }
            other => panic!("expected stream refusal, got {other:?}"),
        }
    }

    #[test]
    fn test_clones_share_the_module() {
        let mut settings = SettingsProvider::new();
        settings.set("sim", "synchronous", true);
        let engine = TrackEngine::with_settings(sim_engine(), settings).unwrap();

        let clone = engine.clone();
        assert!(engine.create_stream().is_ok());
        assert!(clone.create_stream().is_ok());
    }
}
