//! argus-core — object model and backend contracts for the Argus face
//! engine binding.
//!
//! This crate defines what a face engine backend must provide (the
//! [`backend`] traits), the shared value types the contracts exchange,
//! and the user-facing handles built on top of them: [`FaceEngine`] with
//! its typed facades, and [`LivenessSession`]. The frame-tracking stream
//! layer lives in `argus-track`; a deterministic in-process backend
//! lives in `argus-sim`.

pub mod backend;
pub mod engine;
pub mod error;
pub mod image;
pub mod liveness;
pub mod settings;
pub mod types;

pub use engine::{
    DenseIndex, DescriptorExtractor, Detector, EngineError, FaceEngine, QualityEstimator,
};
pub use error::{BackendError, ResultCode};
pub use image::{Image, ImageError};
pub use liveness::{LivenessAlgorithm, LivenessSession, LivenessStatus, LivenessUpdate};
pub use settings::{SettingsError, SettingsProvider, SettingsValue};
pub use types::{
    Descriptor, DescriptorId, Detection, Edition, FrameId, HeadAngles, Landmarks, Neighbor, Rect,
    TrackId, TrackedDetection,
};
