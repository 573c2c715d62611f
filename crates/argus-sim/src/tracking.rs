//! Simulated tracking engine.
//!
//! Replays a [`Script`] against pushed frames and drives the observer
//! exactly the way the vendor engine would: per frame it first ends
//! tracks that left, then reports visual data, then offers best-shot
//! candidates. By default callbacks come from a dedicated worker thread;
//! the synchronous mode delivers them inline inside `push_frame`, which
//! keeps single-threaded tests deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use argus_core::backend::{BestShotCandidate, StreamBackend, TrackObserver, TrackingBackend};
use argus_core::{BackendError, FrameId, Image, ResultCode, SettingsProvider, TrackId};

use crate::script::Script;

const DEFAULT_SYNCHRONOUS: bool = false;
const DEFAULT_EMIT_VISUAL: bool = true;
const DEFAULT_FAIL_STREAM_CREATE: bool = false;

/// Knobs of the simulated tracking engine, read from the `[sim]`
/// settings section.
#[derive(Debug, Clone, Copy)]
pub struct SimTrackingOptions {
    /// Deliver callbacks inline inside `push_frame` instead of from a
    /// worker thread.
    pub synchronous: bool,
    /// Emit per-frame visual callbacks.
    pub visual: bool,
    /// Refuse stream creation, simulating the vendor's stream limit.
    pub fail_stream_create: bool,
}

impl Default for SimTrackingOptions {
    fn default() -> Self {
        Self {
            synchronous: DEFAULT_SYNCHRONOUS,
            visual: DEFAULT_EMIT_VISUAL,
            fail_stream_create: DEFAULT_FAIL_STREAM_CREATE,
        }
    }
}

impl SimTrackingOptions {
    pub fn from_settings(settings: &SettingsProvider) -> Self {
        Self {
            synchronous: settings.bool_of("sim", "synchronous", DEFAULT_SYNCHRONOUS),
            visual: settings.bool_of("sim", "visual", DEFAULT_EMIT_VISUAL),
            fail_stream_create: settings.bool_of(
                "sim",
                "fail-stream-create",
                DEFAULT_FAIL_STREAM_CREATE,
            ),
        }
    }
}

/// Per-stream replay state.
struct Tracker {
    script: Arc<Script>,
    emit_visual: bool,
    open: BTreeSet<TrackId>,
    /// Best accepted score per open track.
    best: BTreeMap<TrackId, f32>,
}

impl Tracker {
    fn new(script: Arc<Script>, emit_visual: bool) -> Self {
        Self {
            script,
            emit_visual,
            open: BTreeSet::new(),
            best: BTreeMap::new(),
        }
    }

    /// Replay one frame: end departed tracks, report visual data, offer
    /// best-shot candidates.
    fn process(&mut self, observer: &dyn TrackObserver, image: &Image, frame_id: FrameId) {
        let scripted = self.script.detections_at(frame_id as usize).to_vec();

        let present: BTreeSet<TrackId> = scripted.iter().map(|d| d.track_id).collect();
        let departed: Vec<TrackId> = self.open.difference(&present).copied().collect();
        for track_id in departed {
            self.open.remove(&track_id);
            self.best.remove(&track_id);
            observer.track_end(track_id);
        }

        if self.emit_visual && !scripted.is_empty() {
            observer.visual(frame_id, image, &scripted);
        }

        for detection in &scripted {
            self.open.insert(detection.track_id);
            let improves = self
                .best
                .get(&detection.track_id)
                .map_or(true, |best| detection.score > *best);
            if !improves {
                continue;
            }
            let candidate = BestShotCandidate {
                frame_id,
                image: image.clone(),
                detection: detection.clone(),
            };
            if observer.check_best_shot(&candidate) {
                self.best.insert(detection.track_id, detection.score);
                observer.best_shot(frame_id, image, detection);
            }
        }
    }

    /// Stream is closing: end every still-open track.
    fn finish(&mut self, observer: &dyn TrackObserver) {
        self.best.clear();
        for track_id in std::mem::take(&mut self.open) {
            observer.track_end(track_id);
        }
    }
}

/// Simulated tracking module. One instance serves any number of streams.
pub struct SimTrackingBackend {
    script: Arc<Script>,
    options: SimTrackingOptions,
}

impl SimTrackingBackend {
    pub fn new(script: Script, options: SimTrackingOptions) -> Self {
        Self {
            script: Arc::new(script),
            options,
        }
    }

    pub(crate) fn from_shared(script: Arc<Script>, options: SimTrackingOptions) -> Self {
        Self { script, options }
    }
}

impl TrackingBackend for SimTrackingBackend {
    fn create_stream(
        &self,
        observer: Arc<dyn TrackObserver>,
    ) -> Result<Box<dyn StreamBackend>, BackendError> {
        if self.options.fail_stream_create {
            return Err(BackendError::new(
                ResultCode::ResourceUnavailable,
                "stream limit reached",
            ));
        }
        let tracker = Tracker::new(self.script.clone(), self.options.visual);
        if self.options.synchronous {
            Ok(Box::new(SyncStream::new(tracker, observer)))
        } else {
            Ok(Box::new(WorkerStream::spawn(tracker, observer)?))
        }
    }
}

struct SyncInner {
    tracker: Tracker,
    observer: Option<Arc<dyn TrackObserver>>,
}

/// Inline-delivery stream: callbacks run on the pushing thread, inside
/// `push_frame`.
struct SyncStream {
    inner: Mutex<SyncInner>,
}

impl SyncStream {
    fn new(tracker: Tracker, observer: Arc<dyn TrackObserver>) -> Self {
        Self {
            inner: Mutex::new(SyncInner {
                tracker,
                observer: Some(observer),
            }),
        }
    }
}

impl StreamBackend for SyncStream {
    fn push_frame(&self, image: Image, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        let SyncInner { tracker, observer } = &mut *inner;
        if let Some(observer) = observer {
            tracker.process(observer.as_ref(), &image, frame_id);
        }
    }

    fn close(&mut self) {
        let mut inner = self.inner.lock();
        let SyncInner { tracker, observer } = &mut *inner;
        if let Some(observer) = observer.take() {
            tracker.finish(observer.as_ref());
        }
    }
}

enum WorkerMsg {
    Frame(Image, FrameId),
    Stop,
}

/// Worker-thread stream: frames travel over an unbounded channel to a
/// named worker that drives the observer. `close` stops the worker,
/// joins it, and only then returns, so no callback can follow it.
struct WorkerStream {
    tx: Sender<WorkerMsg>,
    closed: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl WorkerStream {
    fn spawn(tracker: Tracker, observer: Arc<dyn TrackObserver>) -> Result<Self, BackendError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let closed = Arc::new(AtomicBool::new(false));
        let worker_closed = closed.clone();
        let worker = std::thread::Builder::new()
            .name("argus-sim-stream".to_string())
            .spawn(move || worker_loop(rx, worker_closed, tracker, observer))
            .map_err(|e| {
                BackendError::new(
                    ResultCode::ResourceUnavailable,
                    format!("failed to spawn stream worker: {e}"),
                )
            })?;
        Ok(Self {
            tx,
            closed,
            worker: Some(worker),
        })
    }
}

impl StreamBackend for WorkerStream {
    fn push_frame(&self, image: Image, frame_id: FrameId) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        // Fire-and-forget: a dead worker just swallows the frame.
        let _ = self.tx.send(WorkerMsg::Frame(image, frame_id));
    }

    fn close(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(WorkerMsg::Stop);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("sim stream worker panicked before close");
            }
        }
    }
}

impl Drop for WorkerStream {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_loop(
    rx: Receiver<WorkerMsg>,
    closed: Arc<AtomicBool>,
    mut tracker: Tracker,
    observer: Arc<dyn TrackObserver>,
) {
    for msg in rx.iter() {
        match msg {
            WorkerMsg::Frame(image, frame_id) => {
                // Frames queued behind a close are dropped silently.
                if closed.load(Ordering::Acquire) {
                    continue;
                }
                tracker.process(observer.as_ref(), &image, frame_id);
            }
            WorkerMsg::Stop => break,
        }
    }
    tracker.finish(observer.as_ref());
}
