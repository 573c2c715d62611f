//! Scripted ground truth for the simulation backends.
//!
//! A script lists, per frame index, the subjects present in that frame.
//! The tracking backend replays it against pushed frames; the detector
//! and liveness backends replay it as a cursor over calls.

use argus_core::{Landmarks, Rect, TrackId, TrackedDetection};

/// Build a tracked subject with landmarks placed at canonical positions
/// inside its rectangle (neutral pose).
pub fn subject(track_id: TrackId, x: f32, y: f32, width: f32, height: f32, score: f32) -> TrackedDetection {
    let landmarks = Landmarks([
        (x + 0.30 * width, y + 0.35 * height),
        (x + 0.70 * width, y + 0.35 * height),
        (x + 0.50 * width, y + 0.55 * height),
        (x + 0.35 * width, y + 0.75 * height),
        (x + 0.65 * width, y + 0.75 * height),
    ]);
    TrackedDetection {
        track_id,
        rect: Rect::new(x, y, width, height),
        landmarks,
        score,
    }
}

/// Per-frame scripted ground truth.
#[derive(Debug, Clone, Default)]
pub struct Script {
    frames: Vec<Vec<TrackedDetection>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frames(frames: Vec<Vec<TrackedDetection>>) -> Self {
        Self { frames }
    }

    /// Append one frame's worth of subjects, in engine order.
    pub fn push_frame(&mut self, detections: Vec<TrackedDetection>) {
        self.frames.push(detections);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Vec<TrackedDetection>] {
        &self.frames
    }

    /// Subjects present in `frame`; empty past the end of the script.
    pub fn detections_at(&self, frame: usize) -> &[TrackedDetection] {
        self.frames.get(frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Demo scenario: subject 1 crosses the frame left to right over ten
    /// frames with quality peaking mid-crossing; subject 2 appears at
    /// frame 4, overlaps subject 1, and leaves after frame 7. A final
    /// empty frame lets every track end on script.
    pub fn demo() -> Self {
        let mut frames = Vec::new();
        for i in 0..10 {
            let step = i as f32;
            let mut dets = Vec::new();

            let score = 0.55 + 0.07 * (5.0 - (step - 5.0).abs());
            dets.push(subject(1, 20.0 + step * 25.0, 60.0, 48.0, 48.0, score));

            if (4..8).contains(&i) {
                let entry = step - 4.0;
                dets.push(subject(2, 180.0 - 15.0 * entry, 70.0, 44.0, 44.0, 0.60 + 0.05 * entry));
            }

            frames.push(dets);
        }
        frames.push(Vec::new());
        Self { frames }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_shape() {
        let script = Script::demo();
        assert_eq!(script.len(), 11);

        // Subject 1 is present in every non-empty frame.
        for i in 0..10 {
            assert!(script.detections_at(i).iter().any(|d| d.track_id == 1));
        }
        // Subject 2 only mid-sequence.
        assert!(!script.detections_at(3).iter().any(|d| d.track_id == 2));
        assert!(script.detections_at(4).iter().any(|d| d.track_id == 2));
        assert!(script.detections_at(7).iter().any(|d| d.track_id == 2));
        assert!(!script.detections_at(8).iter().any(|d| d.track_id == 2));
        // Last frame is empty so both tracks end on script.
        assert!(script.detections_at(10).is_empty());
    }

    #[test]
    fn test_demo_quality_peaks_mid_crossing() {
        let script = Script::demo();
        let score_at = |i: usize| {
            script.detections_at(i)
                .iter()
                .find(|d| d.track_id == 1)
                .map(|d| d.score)
                .unwrap()
        };
        assert!(score_at(5) > score_at(0));
        assert!(score_at(5) > score_at(9));
    }

    #[test]
    fn test_detections_past_end_are_empty() {
        let script = Script::demo();
        assert!(script.detections_at(9999).is_empty());
    }

    #[test]
    fn test_subject_landmarks_inside_rect() {
        let det = subject(3, 10.0, 20.0, 40.0, 50.0, 0.9);
        for &(px, py) in det.landmarks.points() {
            assert!(px > det.rect.x && px < det.rect.x + det.rect.width);
            assert!(py > det.rect.y && py < det.rect.y + det.rect.height);
        }
    }
}
