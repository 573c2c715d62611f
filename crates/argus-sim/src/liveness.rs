//! Scripted liveness checks.
//!
//! Head pose comes from the five scripted landmarks with plain
//! geometry, so a script author can stage a head turn by nudging the
//! nose point. The verdict is evaluated once, after a configurable
//! number of frames, and latched.

use std::sync::Arc;

use argus_core::backend::LivenessBackend;
use argus_core::{
    BackendError, Detection, HeadAngles, Image, Landmarks, LivenessAlgorithm, LivenessStatus,
    LivenessUpdate, SettingsProvider,
};

use crate::engine::DARK_FRAME_THRESHOLD;
use crate::script::Script;

const DEFAULT_MIN_EYE_DISPLACEMENT: f64 = 0.8;
const DEFAULT_FRAMES_REQUIRED: i64 = 8;
const DEFAULT_HEAD_TURN_ANGLE: f64 = 20.0;
const DEFAULT_NOD_ANGLE: f64 = 15.0;

pub(crate) struct SimLiveness {
    algorithm: LivenessAlgorithm,
    script: Arc<Script>,
    min_eye_displacement: f32,
    frames_required: usize,
    head_turn_angle: f32,
    nod_angle: f32,

    cursor: usize,
    frames_seen: usize,
    frames_with_face: usize,
    displacement: f32,
    displacement_samples: usize,
    last_eye_mid: Option<(f32, f32)>,
    min_yaw: f32,
    max_yaw: f32,
    min_pitch: f32,
    max_pitch: f32,
    verdict: Option<LivenessUpdate>,
}

impl SimLiveness {
    pub(crate) fn new(
        algorithm: LivenessAlgorithm,
        script: Arc<Script>,
        settings: &SettingsProvider,
    ) -> Self {
        Self {
            algorithm,
            script,
            min_eye_displacement: settings.float_of(
                "liveness",
                "min-eye-displacement",
                DEFAULT_MIN_EYE_DISPLACEMENT,
            ) as f32,
            frames_required: settings
                .int_of("liveness", "frames-required", DEFAULT_FRAMES_REQUIRED)
                .max(1) as usize,
            head_turn_angle: settings.float_of(
                "liveness",
                "head-turn-angle",
                DEFAULT_HEAD_TURN_ANGLE,
            ) as f32,
            nod_angle: settings.float_of("liveness", "nod-angle", DEFAULT_NOD_ANGLE) as f32,
            cursor: 0,
            frames_seen: 0,
            frames_with_face: 0,
            displacement: 0.0,
            displacement_samples: 0,
            last_eye_mid: None,
            min_yaw: f32::INFINITY,
            max_yaw: f32::NEG_INFINITY,
            min_pitch: f32::INFINITY,
            max_pitch: f32::NEG_INFINITY,
            verdict: None,
        }
    }

    fn evaluate(&self) -> bool {
        match self.algorithm {
            LivenessAlgorithm::Motion => {
                let samples = self.displacement_samples.max(1) as f32;
                self.displacement / samples >= self.min_eye_displacement
            }
            LivenessAlgorithm::HeadLeft => self.min_yaw <= -self.head_turn_angle,
            LivenessAlgorithm::HeadRight => self.max_yaw >= self.head_turn_angle,
            LivenessAlgorithm::Nod => self.max_pitch - self.min_pitch >= self.nod_angle,
        }
    }
}

impl LivenessBackend for SimLiveness {
    fn update(&mut self, frame: &Image) -> Result<LivenessUpdate, BackendError> {
        if let Some(verdict) = &self.verdict {
            return Ok(verdict.clone());
        }

        let index = self.cursor;
        self.cursor += 1;
        self.frames_seen += 1;

        let scripted = if frame.is_dark(DARK_FRAME_THRESHOLD) {
            None
        } else {
            self.script.detections_at(index).first().cloned()
        };

        let mut detection = None;
        let mut landmarks = None;
        let mut angles = None;
        if let Some(tracked) = scripted {
            self.frames_with_face += 1;

            let pose = head_angles(&tracked.landmarks);
            self.min_yaw = self.min_yaw.min(pose.yaw);
            self.max_yaw = self.max_yaw.max(pose.yaw);
            self.min_pitch = self.min_pitch.min(pose.pitch);
            self.max_pitch = self.max_pitch.max(pose.pitch);

            let (lx, ly) = tracked.landmarks.left_eye();
            let (rx, ry) = tracked.landmarks.right_eye();
            let mid = ((lx + rx) / 2.0, (ly + ry) / 2.0);
            if let Some((px, py)) = self.last_eye_mid {
                self.displacement += ((mid.0 - px).powi(2) + (mid.1 - py).powi(2)).sqrt();
                self.displacement_samples += 1;
            }
            self.last_eye_mid = Some(mid);

            detection = Some(Detection {
                rect: tracked.rect,
                landmarks: Some(tracked.landmarks),
                score: tracked.score,
            });
            landmarks = Some(tracked.landmarks);
            angles = Some(pose);
        }

        let mut update = if self.frames_seen < self.frames_required {
            let mut u = LivenessUpdate::in_progress();
            u.score = Some(self.frames_seen as f32 / self.frames_required as f32);
            u
        } else if self.frames_with_face * 2 < self.frames_required {
            LivenessUpdate::failed()
        } else {
            let mut u = LivenessUpdate::success(self.evaluate());
            u.score = Some(1.0);
            u
        };
        update.detection = detection;
        update.landmarks = landmarks;
        update.angles = angles;

        if update.status != LivenessStatus::InProgress {
            tracing::debug!(
                algorithm = %self.algorithm,
                status = %update.status,
                is_live = ?update.is_live,
                "liveness verdict"
            );
            self.verdict = Some(update.clone());
        }
        Ok(update)
    }

    fn reset(&mut self) {
        self.cursor = 0;
        self.frames_seen = 0;
        self.frames_with_face = 0;
        self.displacement = 0.0;
        self.displacement_samples = 0;
        self.last_eye_mid = None;
        self.min_yaw = f32::INFINITY;
        self.max_yaw = f32::NEG_INFINITY;
        self.min_pitch = f32::INFINITY;
        self.max_pitch = f32::NEG_INFINITY;
        self.verdict = None;
    }
}

/// Head pose from the five-point layout. Yaw is positive when the nose
/// sits right of the eye midpoint, pitch positive when it sits below
/// the eye-to-mouth midline, roll positive when the right eye is lower.
fn head_angles(landmarks: &Landmarks) -> HeadAngles {
    let (lx, ly) = landmarks.left_eye();
    let (rx, ry) = landmarks.right_eye();
    let (nx, ny) = landmarks.nose();
    let (_, mly) = landmarks.mouth_left();
    let (_, mry) = landmarks.mouth_right();

    let eye_dx = rx - lx;
    let eye_dy = ry - ly;
    let eye_dist = (eye_dx * eye_dx + eye_dy * eye_dy).sqrt();
    if eye_dist <= f32::EPSILON {
        return HeadAngles { yaw: 0.0, pitch: 0.0, roll: 0.0 };
    }

    let eye_mid_x = (lx + rx) / 2.0;
    let eye_mid_y = (ly + ry) / 2.0;
    let mouth_mid_y = (mly + mry) / 2.0;

    let yaw = (nx - eye_mid_x) / eye_dist * 90.0;
    let face_height = mouth_mid_y - eye_mid_y;
    let pitch = if face_height.abs() <= f32::EPSILON {
        0.0
    } else {
        ((ny - eye_mid_y) / face_height - 0.5) * 90.0
    };
    let roll = (eye_dy / eye_dist).asin().to_degrees();

    HeadAngles { yaw, pitch, roll }
}
