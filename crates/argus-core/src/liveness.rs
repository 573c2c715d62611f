//! Interactive liveness sessions.
//!
//! A session drives one opaque liveness check frame by frame and caches
//! the most recent update, so the host can read the latest detection,
//! landmarks, head angles or score without re-driving the backend.

use serde::{Deserialize, Serialize};

use crate::backend::LivenessBackend;
use crate::error::BackendError;
use crate::image::Image;
use crate::types::{Detection, HeadAngles, Landmarks};

/// Which liveness check a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivenessAlgorithm {
    /// Natural landmark motion between consecutive frames.
    Motion,
    /// Subject turns their head left.
    HeadLeft,
    /// Subject turns their head right.
    HeadRight,
    /// Subject nods.
    Nod,
}

impl std::fmt::Display for LivenessAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LivenessAlgorithm::Motion => "motion",
            LivenessAlgorithm::HeadLeft => "head-left",
            LivenessAlgorithm::HeadRight => "head-right",
            LivenessAlgorithm::Nod => "nod",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivenessStatus {
    /// The check needs more frames.
    InProgress,
    /// The check ran to completion; `is_live` carries the verdict.
    Success,
    /// The check could not complete (no face, aborted motion).
    Failed,
}

impl LivenessStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LivenessStatus::InProgress)
    }
}

impl std::fmt::Display for LivenessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LivenessStatus::InProgress => "in progress",
            LivenessStatus::Success => "success",
            LivenessStatus::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Result of feeding one frame into a session. Fields the backend did
/// not measure on this frame stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessUpdate {
    pub status: LivenessStatus,
    /// Verdict; `Some` only once `status` is `Success`.
    pub is_live: Option<bool>,
    /// Face the backend worked on in this frame.
    pub detection: Option<Detection>,
    pub landmarks: Option<Landmarks>,
    pub angles: Option<HeadAngles>,
    /// Algorithm-specific progress or confidence, in [0, 1].
    pub score: Option<f32>,
}

impl LivenessUpdate {
    pub fn in_progress() -> Self {
        Self {
            status: LivenessStatus::InProgress,
            is_live: None,
            detection: None,
            landmarks: None,
            angles: None,
            score: None,
        }
    }

    pub fn success(is_live: bool) -> Self {
        Self {
            status: LivenessStatus::Success,
            is_live: Some(is_live),
            ..Self::in_progress()
        }
    }

    pub fn failed() -> Self {
        Self {
            status: LivenessStatus::Failed,
            ..Self::in_progress()
        }
    }
}

/// One liveness check over a frame sequence.
pub struct LivenessSession {
    backend: Box<dyn LivenessBackend>,
    algorithm: LivenessAlgorithm,
    last: Option<LivenessUpdate>,
}

impl LivenessSession {
    pub(crate) fn new(backend: Box<dyn LivenessBackend>, algorithm: LivenessAlgorithm) -> Self {
        Self {
            backend,
            algorithm,
            last: None,
        }
    }

    pub fn algorithm(&self) -> LivenessAlgorithm {
        self.algorithm
    }

    /// Latest status; `InProgress` before the first update.
    pub fn status(&self) -> LivenessStatus {
        self.last
            .as_ref()
            .map(|u| u.status)
            .unwrap_or(LivenessStatus::InProgress)
    }

    /// Feed one frame and cache the resulting update. A backend error
    /// leaves the cache untouched.
    pub fn update(&mut self, frame: &Image) -> Result<LivenessUpdate, BackendError> {
        let update = self.backend.update(frame)?;
        if update.status.is_terminal() && self.status() == LivenessStatus::InProgress {
            tracing::debug!(
                algorithm = %self.algorithm,
                status = %update.status,
                is_live = ?update.is_live,
                "liveness session concluded"
            );
        }
        self.last = Some(update.clone());
        Ok(update)
    }

    /// Start over: clears the cache and the backend's session state.
    pub fn reset(&mut self) {
        self.backend.reset();
        self.last = None;
    }

    pub fn last_update(&self) -> Option<&LivenessUpdate> {
        self.last.as_ref()
    }

    pub fn last_detection(&self) -> Option<&Detection> {
        self.last.as_ref()?.detection.as_ref()
    }

    pub fn last_landmarks(&self) -> Option<Landmarks> {
        self.last.as_ref()?.landmarks
    }

    pub fn last_angles(&self) -> Option<HeadAngles> {
        self.last.as_ref()?.angles
    }

    pub fn last_score(&self) -> Option<f32> {
        self.last.as_ref()?.score
    }

    /// Verdict of the latest update, if it reached one.
    pub fn is_live(&self) -> Option<bool> {
        self.last.as_ref()?.is_live
    }
}
