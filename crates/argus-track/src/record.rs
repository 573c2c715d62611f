//! Records captured from tracking callbacks.

use std::fmt;

use serde::Serialize;

use argus_core::{FrameId, Image, Rect, TrackId, TrackedDetection};

/// One tracking event, buffered until the host drains it.
///
/// The variants carry exactly what the engine delivered. A track-end
/// event has no frame, image, or geometry, and the shape makes reading
/// them impossible rather than yielding placeholders.
#[derive(Debug, Clone)]
pub enum CallbackRecord {
    /// One subject's appearance in a processed frame.
    Visual {
        frame_id: FrameId,
        image: Image,
        detection: TrackedDetection,
    },
    /// The best shot of a track improved at this frame.
    BestShot {
        frame_id: FrameId,
        image: Image,
        detection: TrackedDetection,
    },
    /// A track ended.
    TrackEnd { track_id: TrackId },
}

/// Discriminant of a [`CallbackRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    Visual,
    BestShot,
    TrackEnd,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Visual => "visual",
            RecordKind::BestShot => "best-shot",
            RecordKind::TrackEnd => "track-end",
        };
        f.write_str(name)
    }
}

impl CallbackRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            CallbackRecord::Visual { .. } => RecordKind::Visual,
            CallbackRecord::BestShot { .. } => RecordKind::BestShot,
            CallbackRecord::TrackEnd { .. } => RecordKind::TrackEnd,
        }
    }

    /// The subject this record belongs to. Total: every record kind
    /// names its track.
    pub fn track_id(&self) -> TrackId {
        match self {
            CallbackRecord::Visual { detection, .. }
            | CallbackRecord::BestShot { detection, .. } => detection.track_id,
            CallbackRecord::TrackEnd { track_id } => *track_id,
        }
    }

    /// The frame this record was produced from. Track ends are not tied
    /// to a frame.
    pub fn frame_id(&self) -> Option<FrameId> {
        match self {
            CallbackRecord::Visual { frame_id, .. }
            | CallbackRecord::BestShot { frame_id, .. } => Some(*frame_id),
            CallbackRecord::TrackEnd { .. } => None,
        }
    }

    /// The frame image, when the record carries one.
    pub fn image(&self) -> Option<&Image> {
        match self {
            CallbackRecord::Visual { image, .. } | CallbackRecord::BestShot { image, .. } => {
                Some(image)
            }
            CallbackRecord::TrackEnd { .. } => None,
        }
    }

    pub fn detection(&self) -> Option<&TrackedDetection> {
        match self {
            CallbackRecord::Visual { detection, .. }
            | CallbackRecord::BestShot { detection, .. } => Some(detection),
            CallbackRecord::TrackEnd { .. } => None,
        }
    }

    /// Flattened, pixel-free view for reporting.
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            kind: self.kind(),
            track_id: self.track_id(),
            frame_id: self.frame_id(),
            rect: self.detection().map(|d| d.rect),
            score: self.detection().map(|d| d.score),
        }
    }
}

/// Serializable record view without the frame pixels.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub kind: RecordKind,
    pub track_id: TrackId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}
