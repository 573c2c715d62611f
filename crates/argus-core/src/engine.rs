//! User-facing engine handle and its typed facades.
//!
//! `FaceEngine` owns the backend and the installed settings provider.
//! Dependent handles (tracking, liveness) are built from an
//! `Arc<FaceEngine>` clone, so they cannot outlive the engine. Edition
//! restrictions are enforced here before a creation call ever reaches
//! the backend, so a `FrontEnd` engine fails descriptor work with a
//! clear error instead of a vendor code.

use std::sync::Arc;

use thiserror::Error;

use crate::backend::{
    DetectorBackend, EngineBackend, ExtractorBackend, IndexBackend, QualityBackend,
    TrackingBackend,
};
use crate::error::BackendError;
use crate::image::Image;
use crate::liveness::{LivenessAlgorithm, LivenessSession};
use crate::settings::SettingsProvider;
use crate::types::{Descriptor, DescriptorId, Detection, Edition, Neighbor, Rect};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{operation} requires the {needed} edition, engine is {actual}")]
    EditionRestricted {
        operation: &'static str,
        needed: Edition,
        actual: Edition,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Handle to a face engine. Share it as `Arc<FaceEngine>`; dependent
/// engines hold a clone of that `Arc`.
pub struct FaceEngine {
    backend: Arc<dyn EngineBackend>,
    settings: SettingsProvider,
}

impl FaceEngine {
    /// Wrap a backend with an empty settings provider.
    pub fn new(backend: Arc<dyn EngineBackend>) -> Self {
        tracing::info!(edition = %backend.edition(), "face engine ready");
        Self {
            backend,
            settings: SettingsProvider::new(),
        }
    }

    /// Install the engine-wide settings provider. Dependent sessions
    /// created afterwards read from it.
    pub fn set_settings_provider(&mut self, settings: SettingsProvider) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &SettingsProvider {
        &self.settings
    }

    pub fn edition(&self) -> Edition {
        self.backend.edition()
    }

    pub fn create_detector(&self) -> Result<Detector, EngineError> {
        Ok(Detector {
            backend: self.backend.create_detector()?,
        })
    }

    pub fn create_quality_estimator(&self) -> Result<QualityEstimator, EngineError> {
        Ok(QualityEstimator {
            backend: self.backend.create_quality_estimator()?,
        })
    }

    /// `Complete` edition only; fails before touching the backend.
    pub fn create_descriptor_extractor(&self) -> Result<DescriptorExtractor, EngineError> {
        self.require_complete("descriptor extraction")?;
        Ok(DescriptorExtractor {
            backend: self.backend.create_descriptor_extractor()?,
        })
    }

    /// `Complete` edition only; fails before touching the backend.
    pub fn create_dense_index(&self, capacity: usize) -> Result<DenseIndex, EngineError> {
        self.require_complete("descriptor indexing")?;
        Ok(DenseIndex {
            backend: self.backend.create_dense_index(capacity)?,
        })
    }

    /// Instantiate the tracking module. Called by the track-engine
    /// handle; the settings come from its own configuration document,
    /// not from the provider installed here.
    pub fn create_tracking(
        &self,
        settings: &SettingsProvider,
    ) -> Result<Box<dyn TrackingBackend>, EngineError> {
        Ok(self.backend.create_tracking(settings)?)
    }

    /// Start a liveness session running the given check, configured by
    /// the installed settings provider.
    pub fn create_liveness_session(
        &self,
        algorithm: LivenessAlgorithm,
    ) -> Result<LivenessSession, EngineError> {
        let backend = self.backend.create_liveness(algorithm, &self.settings)?;
        Ok(LivenessSession::new(backend, algorithm))
    }

    fn require_complete(&self, operation: &'static str) -> Result<(), EngineError> {
        let actual = self.backend.edition();
        if actual != Edition::Complete {
            return Err(EngineError::EditionRestricted {
                operation,
                needed: Edition::Complete,
                actual,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for FaceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceEngine")
            .field("edition", &self.backend.edition())
            .finish()
    }
}

/// Face detector. Per-call errors are the vendor triple, unmodified.
pub struct Detector {
    backend: Box<dyn DetectorBackend>,
}

impl Detector {
    /// Detect up to `limit` faces, best score first.
    pub fn detect(&self, frame: &Image, limit: usize) -> Result<Vec<Detection>, BackendError> {
        self.backend.detect(frame, limit)
    }

    /// The single best detection, if any face is present.
    pub fn detect_one(&self, frame: &Image) -> Result<Option<Detection>, BackendError> {
        Ok(self.backend.detect(frame, 1)?.into_iter().next())
    }
}

/// Best-shot quality estimator.
pub struct QualityEstimator {
    backend: Box<dyn QualityBackend>,
}

impl QualityEstimator {
    /// Quality of the face under `rect`, in [0, 1].
    pub fn estimate(&self, frame: &Image, rect: &Rect) -> Result<f32, BackendError> {
        self.backend.estimate(frame, rect)
    }
}

/// Descriptor extractor. Exists only on `Complete` engines.
pub struct DescriptorExtractor {
    backend: Box<dyn ExtractorBackend>,
}

impl DescriptorExtractor {
    pub fn extract(
        &self,
        frame: &Image,
        detection: &Detection,
    ) -> Result<Descriptor, BackendError> {
        self.backend.extract(frame, detection)
    }
}

impl std::fmt::Debug for DescriptorExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorExtractor").finish()
    }
}

/// Nearest-neighbor index over face descriptors. Exists only on
/// `Complete` engines.
pub struct DenseIndex {
    backend: Box<dyn IndexBackend>,
}

impl DenseIndex {
    pub fn append(&mut self, descriptor: &Descriptor) -> Result<DescriptorId, BackendError> {
        self.backend.append(descriptor)
    }

    pub fn remove(&mut self, id: DescriptorId) -> Result<(), BackendError> {
        self.backend.remove(id)
    }

    /// The `k` most similar entries, highest similarity first.
    pub fn search(&self, probe: &Descriptor, k: usize) -> Result<Vec<Neighbor>, BackendError> {
        self.backend.search(probe, k)
    }

    /// The single closest entry, if the index is non-empty.
    pub fn best_match(&self, probe: &Descriptor) -> Result<Option<Neighbor>, BackendError> {
        Ok(self.backend.search(probe, 1)?.into_iter().next())
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }
}
