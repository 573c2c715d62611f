//! Contracts a face engine backend must satisfy.
//!
//! The binding never talks to vendor code directly; it talks to these
//! traits. Each `create_*` call models the vendor's handle acquisition:
//! a refusal is an `Err`, never a wrapped null, so a facade that exists
//! always has a live resource behind it. A backend is free to run its
//! own threads, so the tracking contracts spell out which calls may
//! arrive from a backend-owned context and what must hold after a
//! detach.

use std::sync::Arc;

use crate::error::BackendError;
use crate::image::Image;
use crate::liveness::{LivenessAlgorithm, LivenessUpdate};
use crate::settings::SettingsProvider;
use crate::types::{
    Descriptor, DescriptorId, Detection, Edition, FrameId, Neighbor, Rect, TrackId,
    TrackedDetection,
};

/// Candidate the tracking engine proposes before committing a best shot.
///
/// Passed to [`TrackObserver::check_best_shot`]; the candidate's quality
/// is its detection score.
#[derive(Debug, Clone)]
pub struct BestShotCandidate {
    pub frame_id: FrameId,
    pub image: Image,
    pub detection: TrackedDetection,
}

impl BestShotCandidate {
    pub fn track_id(&self) -> TrackId {
        self.detection.track_id
    }
}

/// Receiver for tracking callbacks.
///
/// The engine invokes these from its own worker context, possibly a
/// dedicated thread. Implementations must not block for long and must
/// not call back into the stream that delivered the callback.
pub trait TrackObserver: Send + Sync {
    /// A candidate became, or replaced, the current best shot of its
    /// track.
    fn best_shot(&self, frame_id: FrameId, image: &Image, detection: &TrackedDetection);

    /// Per-frame visual data: the processed frame and every subject
    /// currently tracked in it, in engine order.
    fn visual(&self, frame_id: FrameId, image: &Image, detections: &[TrackedDetection]);

    /// A track ended. Carries the track id and nothing else.
    fn track_end(&self, track_id: TrackId);

    /// Synchronous predicate consulted before a candidate may become a
    /// best shot. Returning `false` rejects this candidate only; later
    /// candidates of the same track are offered again. Accepts
    /// unconditionally unless overridden.
    fn check_best_shot(&self, candidate: &BestShotCandidate) -> bool {
        let _ = candidate;
        true
    }
}

/// Root contract of a face engine backend.
///
/// Shared behind an `Arc`, so creation calls take `&self` and must be
/// safe to invoke concurrently.
pub trait EngineBackend: Send + Sync {
    /// Capability tier this backend was licensed with.
    fn edition(&self) -> Edition;

    fn create_detector(&self) -> Result<Box<dyn DetectorBackend>, BackendError>;

    fn create_quality_estimator(&self) -> Result<Box<dyn QualityBackend>, BackendError>;

    /// Descriptor extraction requires the `Complete` edition; `FrontEnd`
    /// backends fail with
    /// [`ResultCode::LicenseRestricted`](crate::error::ResultCode).
    fn create_descriptor_extractor(&self) -> Result<Box<dyn ExtractorBackend>, BackendError>;

    /// Create an empty index sized for `capacity` descriptors. Requires
    /// the `Complete` edition.
    fn create_dense_index(&self, capacity: usize) -> Result<Box<dyn IndexBackend>, BackendError>;

    /// Instantiate the tracking module with the given settings.
    fn create_tracking(
        &self,
        settings: &SettingsProvider,
    ) -> Result<Box<dyn TrackingBackend>, BackendError>;

    /// Start a liveness session running the given check.
    fn create_liveness(
        &self,
        algorithm: LivenessAlgorithm,
        settings: &SettingsProvider,
    ) -> Result<Box<dyn LivenessBackend>, BackendError>;
}

/// Face detection over single frames.
pub trait DetectorBackend: Send {
    /// Detect up to `limit` faces, best score first.
    fn detect(&self, frame: &Image, limit: usize) -> Result<Vec<Detection>, BackendError>;
}

/// Best-shot quality estimation.
pub trait QualityBackend: Send {
    /// Quality of the face under `rect`, in [0, 1].
    fn estimate(&self, frame: &Image, rect: &Rect) -> Result<f32, BackendError>;
}

/// Descriptor extraction for matching.
pub trait ExtractorBackend: Send {
    fn extract(&self, frame: &Image, detection: &Detection)
        -> Result<Descriptor, BackendError>;
}

impl std::fmt::Debug for dyn ExtractorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ExtractorBackend")
    }
}

/// Nearest-neighbor store over descriptors.
pub trait IndexBackend: Send {
    /// Append a descriptor; ids are assigned in insertion order and
    /// never reused.
    fn append(&mut self, descriptor: &Descriptor) -> Result<DescriptorId, BackendError>;

    /// Remove a descriptor. Unknown ids are an `InvalidInput` error.
    fn remove(&mut self, id: DescriptorId) -> Result<(), BackendError>;

    /// The `k` most similar entries to `probe`, highest similarity
    /// first. Fewer than `k` results when the index is smaller.
    fn search(&self, probe: &Descriptor, k: usize) -> Result<Vec<Neighbor>, BackendError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for dyn IndexBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn IndexBackend")
    }
}

/// Backend side of one liveness session.
pub trait LivenessBackend: Send {
    /// Feed one frame. The backend finds the face itself and decides
    /// when the session reaches a terminal status.
    fn update(&mut self, frame: &Image) -> Result<LivenessUpdate, BackendError>;

    /// Discard accumulated session state.
    fn reset(&mut self);
}

/// The tracking module: a stream factory.
pub trait TrackingBackend: Send + Sync {
    /// Open a processing stream delivering callbacks to `observer`.
    ///
    /// Exactly one observer per stream, registered here, never changed
    /// afterward. The engine holds it until [`StreamBackend::close`]
    /// returns.
    fn create_stream(
        &self,
        observer: Arc<dyn TrackObserver>,
    ) -> Result<Box<dyn StreamBackend>, BackendError>;
}

impl std::fmt::Debug for dyn TrackingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn TrackingBackend")
    }
}

/// Engine side of one tracking stream.
pub trait StreamBackend: Send {
    /// Hand a frame over for asynchronous processing. Fire-and-forget:
    /// must not wait for processing, reports nothing. Engine-side
    /// failures surface only as absent callbacks.
    fn push_frame(&self, image: Image, frame_id: FrameId);

    /// Detach the observer and stop processing.
    ///
    /// Synchronous: when this returns, no observer method is executing
    /// and none will be invoked again. Idempotent.
    fn close(&mut self);
}

impl std::fmt::Debug for dyn StreamBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn StreamBackend")
    }
}
