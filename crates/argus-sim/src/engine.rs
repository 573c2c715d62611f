//! Simulated face engine backend.
//!
//! Every sub-engine is a deliberately trivial stand-in: the detector
//! replays the script, quality is mean brightness, descriptors are
//! mean-pooled intensity grids, the index is a linear scan. Enough to
//! exercise every facade without the vendor binary, never a model.

use std::sync::Arc;

use parking_lot::Mutex;

use argus_core::backend::{
    DetectorBackend, EngineBackend, ExtractorBackend, IndexBackend, LivenessBackend,
    QualityBackend, TrackingBackend,
};
use argus_core::{
    BackendError, Descriptor, DescriptorId, Detection, Edition, Image, LivenessAlgorithm,
    Neighbor, Rect, ResultCode, SettingsProvider,
};

use crate::liveness::SimLiveness;
use crate::script::Script;
use crate::tracking::{SimTrackingBackend, SimTrackingOptions};

/// Cells per descriptor-grid axis; descriptors have GRID * GRID values.
const DESCRIPTOR_GRID: u32 = 4;
const DESCRIPTOR_MODEL: &str = "sim-grid-16";
/// Frames darker than this yield no detections.
pub(crate) const DARK_FRAME_THRESHOLD: f32 = 12.0;

/// Deterministic in-process engine backend.
pub struct SimEngineBackend {
    edition: Edition,
    script: Arc<Script>,
}

impl SimEngineBackend {
    pub fn new(edition: Edition, script: Script) -> Self {
        Self {
            edition,
            script: Arc::new(script),
        }
    }

    fn require_complete(&self, module: &str) -> Result<(), BackendError> {
        if self.edition != Edition::Complete {
            return Err(BackendError::new(
                ResultCode::LicenseRestricted,
                format!("{module} module not licensed for this edition"),
            ));
        }
        Ok(())
    }
}

impl EngineBackend for SimEngineBackend {
    fn edition(&self) -> Edition {
        self.edition
    }

    fn create_detector(&self) -> Result<Box<dyn DetectorBackend>, BackendError> {
        Ok(Box::new(SimDetector {
            script: self.script.clone(),
            cursor: Mutex::new(0),
        }))
    }

    fn create_quality_estimator(&self) -> Result<Box<dyn QualityBackend>, BackendError> {
        Ok(Box::new(SimQuality))
    }

    fn create_descriptor_extractor(&self) -> Result<Box<dyn ExtractorBackend>, BackendError> {
        self.require_complete("descriptor")?;
        Ok(Box::new(SimExtractor))
    }

    fn create_dense_index(&self, capacity: usize) -> Result<Box<dyn IndexBackend>, BackendError> {
        self.require_complete("index")?;
        Ok(Box::new(SimIndex {
            entries: Vec::with_capacity(capacity),
            next_id: 0,
            capacity,
        }))
    }

    fn create_tracking(
        &self,
        settings: &SettingsProvider,
    ) -> Result<Box<dyn TrackingBackend>, BackendError> {
        Ok(Box::new(SimTrackingBackend::from_shared(
            self.script.clone(),
            SimTrackingOptions::from_settings(settings),
        )))
    }

    fn create_liveness(
        &self,
        algorithm: LivenessAlgorithm,
        settings: &SettingsProvider,
    ) -> Result<Box<dyn LivenessBackend>, BackendError> {
        Ok(Box::new(SimLiveness::new(
            algorithm,
            self.script.clone(),
            settings,
        )))
    }
}

/// Replays the script one frame per call, oldest first.
struct SimDetector {
    script: Arc<Script>,
    cursor: Mutex<usize>,
}

impl DetectorBackend for SimDetector {
    fn detect(&self, frame: &Image, limit: usize) -> Result<Vec<Detection>, BackendError> {
        let mut cursor = self.cursor.lock();
        let index = *cursor;
        *cursor += 1;

        if frame.is_dark(DARK_FRAME_THRESHOLD) {
            return Ok(Vec::new());
        }
        Ok(self
            .script
            .detections_at(index)
            .iter()
            .take(limit)
            .map(|d| Detection {
                rect: d.rect,
                landmarks: Some(d.landmarks),
                score: d.score,
            })
            .collect())
    }
}

/// Quality is the mean brightness of the face region.
struct SimQuality;

impl QualityBackend for SimQuality {
    fn estimate(&self, frame: &Image, rect: &Rect) -> Result<f32, BackendError> {
        let crop = frame
            .crop(rect)
            .map_err(|e| BackendError::new(ResultCode::InvalidInput, e.to_string()))?;
        Ok((crop.avg_brightness() / 255.0).clamp(0.0, 1.0))
    }
}

/// Mean-pooled intensity grid over the face crop, L2-normalized.
struct SimExtractor;

impl ExtractorBackend for SimExtractor {
    fn extract(
        &self,
        frame: &Image,
        detection: &Detection,
    ) -> Result<Descriptor, BackendError> {
        let crop = frame
            .crop(&detection.rect)
            .map_err(|e| BackendError::new(ResultCode::InvalidInput, e.to_string()))?;

        let (w, h) = (crop.width(), crop.height());
        let data = crop.data();
        let mut values = Vec::with_capacity((DESCRIPTOR_GRID * DESCRIPTOR_GRID) as usize);
        for gy in 0..DESCRIPTOR_GRID {
            for gx in 0..DESCRIPTOR_GRID {
                let x0 = gx * w / DESCRIPTOR_GRID;
                let x1 = ((gx + 1) * w / DESCRIPTOR_GRID).max(x0 + 1).min(w);
                let y0 = gy * h / DESCRIPTOR_GRID;
                let y1 = ((gy + 1) * h / DESCRIPTOR_GRID).max(y0 + 1).min(h);
                if x0 >= w || y0 >= h {
                    values.push(0.0);
                    continue;
                }
                let mut sum = 0u64;
                let mut count = 0u64;
                for y in y0..y1 {
                    for x in x0..x1 {
                        sum += data[(y * w + x) as usize] as u64;
                        count += 1;
                    }
                }
                values.push(sum as f32 / (count as f32 * 255.0));
            }
        }

        let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v /= norm;
            }
        }
        Ok(Descriptor {
            values,
            model_version: Some(DESCRIPTOR_MODEL.to_string()),
        })
    }
}

/// Linear-scan cosine index with a fixed capacity.
struct SimIndex {
    entries: Vec<(DescriptorId, Descriptor)>,
    next_id: DescriptorId,
    capacity: usize,
}

impl IndexBackend for SimIndex {
    fn append(&mut self, descriptor: &Descriptor) -> Result<DescriptorId, BackendError> {
        if self.entries.len() >= self.capacity {
            return Err(BackendError::new(
                ResultCode::ResourceUnavailable,
                format!("index full ({} descriptors)", self.capacity),
            ));
        }
        if let Some((_, first)) = self.entries.first() {
            if first.values.len() != descriptor.values.len() {
                return Err(BackendError::new(
                    ResultCode::InvalidInput,
                    "descriptor length does not match the index",
                ));
            }
        }
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, descriptor.clone()));
        Ok(id)
    }

    fn remove(&mut self, id: DescriptorId) -> Result<(), BackendError> {
        match self.entries.iter().position(|(entry_id, _)| *entry_id == id) {
            Some(pos) => {
                self.entries.remove(pos);
                Ok(())
            }
            None => Err(BackendError::new(
                ResultCode::InvalidInput,
                format!("unknown descriptor id {id}"),
            )),
        }
    }

    fn search(&self, probe: &Descriptor, k: usize) -> Result<Vec<Neighbor>, BackendError> {
        if let Some((_, first)) = self.entries.first() {
            if first.values.len() != probe.values.len() {
                return Err(BackendError::new(
                    ResultCode::InvalidInput,
                    "probe length does not match the index",
                ));
            }
        }
        let mut neighbors: Vec<Neighbor> = self
            .entries
            .iter()
            .map(|(id, d)| Neighbor {
                id: *id,
                similarity: probe.similarity(d),
            })
            .collect();
        // Ties break toward the older entry for determinism.
        neighbors.sort_by(|a, b| b.similarity.total_cmp(&a.similarity).then(a.id.cmp(&b.id)));
        neighbors.truncate(k);
        Ok(neighbors)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
