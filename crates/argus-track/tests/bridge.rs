//! End-to-end bridge behavior against a hand-driven tracking backend.
//!
//! The harness plays the engine side: it stores the observer each
//! stream registers and lets the test deliver callbacks exactly when
//! and how it chooses, so the host-visible contract can be checked
//! without any real processing behind it.

use std::sync::Arc;

use parking_lot::Mutex;

use argus_core::backend::{
    DetectorBackend, EngineBackend, ExtractorBackend, IndexBackend, LivenessBackend,
    QualityBackend, StreamBackend, TrackObserver, TrackingBackend,
};
use argus_core::{
    BackendError, Edition, FaceEngine, FrameId, Image, Landmarks, LivenessAlgorithm, Rect,
    ResultCode, SettingsProvider, TrackedDetection,
};
use argus_track::{BestShotCandidate, RecordKind, TrackEngine};

/// Engine-side state shared between the harness backend and the test.
#[derive(Default)]
struct EngineSide {
    observer: Mutex<Option<Arc<dyn TrackObserver>>>,
    pushed: Mutex<Vec<FrameId>>,
}

impl EngineSide {
    /// The observer of the currently open stream.
    fn observer(&self) -> Arc<dyn TrackObserver> {
        self.observer
            .lock()
            .clone()
            .expect("no stream is open")
    }
}

struct HarnessTracking(Arc<EngineSide>);

impl TrackingBackend for HarnessTracking {
    fn create_stream(
        &self,
        observer: Arc<dyn TrackObserver>,
    ) -> Result<Box<dyn StreamBackend>, BackendError> {
        *self.0.observer.lock() = Some(observer);
        Ok(Box::new(HarnessStream(self.0.clone())))
    }
}

struct HarnessStream(Arc<EngineSide>);

impl StreamBackend for HarnessStream {
    fn push_frame(&self, _image: Image, frame_id: FrameId) {
        self.0.pushed.lock().push(frame_id);
    }

    fn close(&mut self) {
        *self.0.observer.lock() = None;
    }
}

/// Engine backend that only has a tracking module.
struct HarnessBackend(Arc<EngineSide>);

impl EngineBackend for HarnessBackend {
    fn edition(&self) -> Edition {
        Edition::FrontEnd
    }

    fn create_detector(&self) -> Result<Box<dyn DetectorBackend>, BackendError> {
        Err(self.unsupported())
    }

    fn create_quality_estimator(&self) -> Result<Box<dyn QualityBackend>, BackendError> {
        Err(self.unsupported())
    }

    fn create_descriptor_extractor(&self) -> Result<Box<dyn ExtractorBackend>, BackendError> {
        Err(self.unsupported())
    }

    fn create_dense_index(&self, _capacity: usize) -> Result<Box<dyn IndexBackend>, BackendError> {
        Err(self.unsupported())
    }

    fn create_tracking(
        &self,
        _settings: &SettingsProvider,
    ) -> Result<Box<dyn TrackingBackend>, BackendError> {
        Ok(Box::new(HarnessTracking(self.0.clone())))
    }

    fn create_liveness(
        &self,
        _algorithm: LivenessAlgorithm,
        _settings: &SettingsProvider,
    ) -> Result<Box<dyn LivenessBackend>, BackendError> {
        Err(self.unsupported())
    }
}

impl HarnessBackend {
    fn unsupported(&self) -> BackendError {
        BackendError::new(ResultCode::ModuleNotReady, "harness supports tracking only")
    }
}

fn harness() -> (TrackEngine, Arc<EngineSide>) {
    let side = Arc::new(EngineSide::default());
    let engine = Arc::new(FaceEngine::new(Arc::new(HarnessBackend(side.clone()))));
    let track = TrackEngine::with_settings(engine, SettingsProvider::new())
        .expect("harness backend never refuses");
    (track, side)
}

fn tracked(track_id: u64, score: f32) -> TrackedDetection {
    TrackedDetection {
        track_id,
        rect: Rect::new(12.0, 8.0, 40.0, 40.0),
        landmarks: Landmarks([(3.0, 3.0); 5]),
        score,
    }
}

fn frame() -> Image {
    Image::filled(64, 48, 128)
}

#[test]
fn test_records_appear_only_after_engine_delivery() {
    let (track, side) = harness();
    let mut stream = track.create_stream().unwrap();

    for expected in 0..3 {
        assert_eq!(stream.push_frame(frame()), expected);
    }
    assert_eq!(*side.pushed.lock(), vec![0, 1, 2]);

    // Nothing reported yet, nothing to drain.
    assert!(stream.drain_callbacks().is_empty());
    assert_eq!(stream.pending_callbacks(), 0);

    let image = frame();
    let observer = side.observer();
    observer.best_shot(1, &image, &tracked(7, 0.9));
    observer.track_end(7);

    let records = stream.drain_callbacks();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind(), RecordKind::BestShot);
    assert_eq!(records[0].frame_id(), Some(1));
    assert_eq!(records[0].track_id(), 7);
    assert_eq!(records[1].kind(), RecordKind::TrackEnd);
    assert_eq!(records[1].track_id(), 7);

    assert!(stream.drain_callbacks().is_empty());
}

#[test]
fn test_frame_numbering_ignores_drains_and_deliveries() {
    let (track, side) = harness();
    let mut stream = track.create_stream().unwrap();

    assert_eq!(stream.push_frame(frame()), 0);
    side.observer().track_end(3);
    stream.drain_callbacks();
    assert_eq!(stream.push_frame(frame()), 1);
    assert_eq!(stream.push_frame(frame()), 2);
    assert_eq!(stream.frames_pushed(), 3);
}

#[test]
fn test_drop_detaches_and_releases_the_observer() {
    let (track, side) = harness();
    let stream = track.create_stream().unwrap();

    let weak = Arc::downgrade(&side.observer());
    assert!(weak.upgrade().is_some());

    drop(stream);

    // Close ran: the engine side dropped its observer reference, and
    // with the stream gone nothing else keeps the buffer alive.
    assert!(side.observer.lock().is_none());
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_streams_do_not_share_buffers() {
    let (track, side) = harness();

    let stream_a = track.create_stream().unwrap();
    let observer_a = side.observer();
    let stream_b = track.create_stream().unwrap();
    let observer_b = side.observer();

    // The harness keeps one slot, so stream B's observer replaced A's;
    // they must still be distinct objects.
    assert!(!Arc::ptr_eq(&observer_a, &observer_b));

    observer_a.track_end(1);
    observer_b.track_end(2);
    assert_eq!(stream_a.pending_callbacks(), 1);
    assert_eq!(stream_b.pending_callbacks(), 1);
    assert_eq!(stream_a.drain_callbacks()[0].track_id(), 1);
    assert_eq!(stream_b.drain_callbacks()[0].track_id(), 2);
}

#[test]
fn test_policy_reaches_the_engine_side_predicate() {
    let (track, side) = harness();
    let _stream = track
        .create_stream_with_policy(|c| c.detection.score >= 0.5)
        .unwrap();

    let observer = side.observer();
    let reject = BestShotCandidate {
        frame_id: 0,
        image: frame(),
        detection: tracked(4, 0.2),
    };
    let accept = BestShotCandidate {
        frame_id: 0,
        image: frame(),
        detection: tracked(4, 0.8),
    };
    assert!(!observer.check_best_shot(&reject));
    assert!(observer.check_best_shot(&accept));
}

#[test]
fn test_custom_observer_at_the_backend_seam() {
    // The backend contract takes any observer; a test double can watch
    // call order and arguments without a buffer in between.
    #[derive(Default)]
    struct CallLog(Mutex<Vec<String>>);

    impl TrackObserver for CallLog {
        fn best_shot(&self, frame_id: FrameId, _image: &Image, detection: &TrackedDetection) {
            self.0
                .lock()
                .push(format!("best f{frame_id} t{}", detection.track_id));
        }
        fn visual(&self, frame_id: FrameId, _image: &Image, detections: &[TrackedDetection]) {
            self.0
                .lock()
                .push(format!("visual f{frame_id} n{}", detections.len()));
        }
        fn track_end(&self, track_id: u64) {
            self.0.lock().push(format!("end t{track_id}"));
        }
    }

    let side = Arc::new(EngineSide::default());
    let tracking = HarnessTracking(side.clone());

    let log = Arc::new(CallLog::default());
    let mut stream = tracking.create_stream(log.clone()).unwrap();

    let image = frame();
    let observer = side.observer();
    observer.visual(0, &image, &[tracked(1, 0.5), tracked(2, 0.6)]);
    observer.best_shot(0, &image, &tracked(1, 0.5));
    observer.track_end(2);

    assert_eq!(
        *log.0.lock(),
        vec!["visual f0 n2", "best f0 t1", "end t2"]
    );
    stream.close();
    assert!(side.observer.lock().is_none());
}
