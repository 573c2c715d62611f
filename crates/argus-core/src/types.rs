use serde::{Deserialize, Serialize};

/// Sequence number a stream assigns to a pushed frame. Starts at 0 per
/// stream, strictly increasing, never reused.
pub type FrameId = u64;

/// Identifier of one tracked subject; stable for the lifetime of the track.
pub type TrackId = u64;

/// Identifier assigned by a descriptor index on append.
pub type DescriptorId = u64;

/// Axis-aligned rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.width * self.height
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Clamp this rectangle to an image of the given dimensions.
    ///
    /// Returns `None` when the intersection with the image is empty.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let x1 = self.x.max(0.0);
        let y1 = self.y.max(0.0);
        let x2 = (self.x + self.width).min(width as f32);
        let y2 = (self.y + self.height).min(height as f32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
    }
}

/// Five-point facial landmark set:
/// `[left_eye, right_eye, nose, mouth_left, mouth_right]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmarks(pub [(f32, f32); 5]);

impl Landmarks {
    pub fn left_eye(&self) -> (f32, f32) {
        self.0[0]
    }

    pub fn right_eye(&self) -> (f32, f32) {
        self.0[1]
    }

    pub fn nose(&self) -> (f32, f32) {
        self.0[2]
    }

    pub fn mouth_left(&self) -> (f32, f32) {
        self.0[3]
    }

    pub fn mouth_right(&self) -> (f32, f32) {
        self.0[4]
    }

    pub fn points(&self) -> &[(f32, f32); 5] {
        &self.0
    }

    /// Translate all five points by `(dx, dy)`.
    pub fn translated(&self, dx: f32, dy: f32) -> Landmarks {
        let mut pts = self.0;
        for p in &mut pts {
            p.0 += dx;
            p.1 += dy;
        }
        Landmarks(pts)
    }
}

/// Capability tier the underlying engine was built with.
///
/// `Complete` unlocks descriptor extraction, matching and index search;
/// `FrontEnd` covers detection, estimation and tracking only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edition {
    FrontEnd,
    Complete,
}

impl std::fmt::Display for Edition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edition::FrontEnd => write!(f, "FrontEnd"),
            Edition::Complete => write!(f, "Complete"),
        }
    }
}

/// Head pose in degrees. All zeros is a frontal face looking straight
/// into the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadAngles {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl HeadAngles {
    /// Whether every axis is within `tolerance` degrees of frontal.
    pub fn is_frontal(&self, tolerance: f32) -> bool {
        self.yaw.abs() <= tolerance && self.pitch.abs() <= tolerance && self.roll.abs() <= tolerance
    }
}

/// One detected face, as reported by the detection engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub rect: Rect,
    pub landmarks: Option<Landmarks>,
    /// Detection confidence in [0, 1].
    pub score: f32,
}

/// One subject the tracking engine reports within a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedDetection {
    pub track_id: TrackId,
    pub rect: Rect,
    pub landmarks: Landmarks,
    /// Detection confidence in [0, 1].
    pub score: f32,
}

/// Face descriptor: a fixed-length embedding produced by the extraction
/// engine, used for similarity matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub values: Vec<f32>,
    /// Model version that produced this descriptor (e.g., "cnn_59m").
    pub model_version: Option<String>,
}

impl Descriptor {
    /// Cosine similarity between two descriptors, in [-1, 1].
    ///
    /// Always processes all dimensions; no early exit on mismatched
    /// prefixes, so comparison time does not leak match position.
    pub fn similarity(&self, other: &Descriptor) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }
}

/// One nearest-neighbor result from an index search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: DescriptorId,
    /// Cosine similarity to the probe, in [-1, 1].
    pub similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_area() {
        assert_eq!(Rect::new(0.0, 0.0, 10.0, 4.0).area(), 40.0);
        assert_eq!(Rect::new(5.0, 5.0, 0.0, 4.0).area(), 0.0);
        assert_eq!(Rect::new(5.0, 5.0, -3.0, 4.0).area(), 0.0);
    }

    #[test]
    fn test_rect_clamp_inside() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        let clamped = r.clamp_to(100, 100).unwrap();
        assert_eq!(clamped, r);
    }

    #[test]
    fn test_rect_clamp_partial() {
        let r = Rect::new(-5.0, 90.0, 20.0, 20.0);
        let clamped = r.clamp_to(100, 100).unwrap();
        assert_eq!(clamped, Rect::new(0.0, 90.0, 15.0, 10.0));
    }

    #[test]
    fn test_rect_clamp_outside() {
        let r = Rect::new(200.0, 200.0, 20.0, 20.0);
        assert!(r.clamp_to(100, 100).is_none());
    }

    #[test]
    fn test_landmark_accessors() {
        let lm = Landmarks([(1.0, 2.0), (3.0, 4.0), (5.0, 6.0), (7.0, 8.0), (9.0, 10.0)]);
        assert_eq!(lm.left_eye(), (1.0, 2.0));
        assert_eq!(lm.right_eye(), (3.0, 4.0));
        assert_eq!(lm.nose(), (5.0, 6.0));
        assert_eq!(lm.mouth_left(), (7.0, 8.0));
        assert_eq!(lm.mouth_right(), (9.0, 10.0));
    }

    #[test]
    fn test_landmarks_translated() {
        let lm = Landmarks([(1.0, 1.0); 5]).translated(2.0, -1.0);
        assert_eq!(lm.left_eye(), (3.0, 0.0));
        assert_eq!(lm.mouth_right(), (3.0, 0.0));
    }

    #[test]
    fn test_descriptor_similarity_identical() {
        let a = Descriptor { values: vec![1.0, 0.0, 0.0], model_version: None };
        let b = Descriptor { values: vec![1.0, 0.0, 0.0], model_version: None };
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_descriptor_similarity_orthogonal() {
        let a = Descriptor { values: vec![1.0, 0.0], model_version: None };
        let b = Descriptor { values: vec![0.0, 1.0], model_version: None };
        assert!(a.similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn test_descriptor_similarity_opposite() {
        let a = Descriptor { values: vec![1.0, 0.0], model_version: None };
        let b = Descriptor { values: vec![-1.0, 0.0], model_version: None };
        assert!((a.similarity(&b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_descriptor_similarity_zero_vector() {
        let a = Descriptor { values: vec![0.0, 0.0], model_version: None };
        let b = Descriptor { values: vec![1.0, 0.0], model_version: None };
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_edition_display() {
        assert_eq!(Edition::FrontEnd.to_string(), "FrontEnd");
        assert_eq!(Edition::Complete.to_string(), "Complete");
    }

    #[test]
    fn test_head_angles_frontal() {
        let frontal = HeadAngles { yaw: 3.0, pitch: -2.0, roll: 1.0 };
        assert!(frontal.is_frontal(5.0));
        let turned = HeadAngles { yaw: 40.0, pitch: 0.0, roll: 0.0 };
        assert!(!turned.is_frontal(5.0));
    }
}
