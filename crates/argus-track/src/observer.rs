//! The production observer: a lock-guarded record buffer.
//!
//! Engine worker threads append on delivery; the host drains on its own
//! schedule. Everything goes through one `parking_lot::Mutex`, so a
//! drain is atomic against every recording call and the K visual
//! records of a frame land contiguously.

use std::fmt;
use std::mem;

use parking_lot::Mutex;

use argus_core::backend::{BestShotCandidate, TrackObserver};
use argus_core::{FrameId, Image, TrackId, TrackedDetection};

use crate::record::CallbackRecord;

type BestShotPolicy = Box<dyn Fn(&BestShotCandidate) -> bool + Send + Sync>;

/// Thread-safe callback store installed as every stream's observer.
///
/// Holds no I/O and never blocks beyond lock hold time. One buffer
/// serves exactly one stream.
pub struct CallbackBuffer {
    records: Mutex<Vec<CallbackRecord>>,
    policy: Option<BestShotPolicy>,
}

impl CallbackBuffer {
    /// Buffer with the default best-shot policy: accept everything.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            policy: None,
        }
    }

    /// Buffer whose `check_best_shot` consults `policy` instead of
    /// accepting unconditionally.
    pub fn with_policy(
        policy: impl Fn(&BestShotCandidate) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            policy: Some(Box::new(policy)),
        }
    }

    /// Take every buffered record, oldest first, leaving the buffer
    /// empty. Waits only for the lock, never for new records.
    pub fn drain(&self) -> Vec<CallbackRecord> {
        mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Default for CallbackBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallbackBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackBuffer")
            .field("pending", &self.len())
            .field("custom_policy", &self.policy.is_some())
            .finish()
    }
}

impl TrackObserver for CallbackBuffer {
    fn best_shot(&self, frame_id: FrameId, image: &Image, detection: &TrackedDetection) {
        self.records.lock().push(CallbackRecord::BestShot {
            frame_id,
            image: image.clone(),
            detection: detection.clone(),
        });
    }

    fn visual(&self, frame_id: FrameId, image: &Image, detections: &[TrackedDetection]) {
        // One lock acquisition for the whole frame; the records stay
        // contiguous even while another thread is draining.
        let mut records = self.records.lock();
        for detection in detections {
            records.push(CallbackRecord::Visual {
                frame_id,
                image: image.clone(),
                detection: detection.clone(),
            });
        }
    }

    fn track_end(&self, track_id: TrackId) {
        self.records.lock().push(CallbackRecord::TrackEnd { track_id });
    }

    fn check_best_shot(&self, candidate: &BestShotCandidate) -> bool {
        match &self.policy {
            Some(policy) => policy(candidate),
            None => true,
        }
    }
}
