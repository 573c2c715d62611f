//! Host-side handle for one tracking stream.

use std::sync::Arc;

use uuid::Uuid;

use argus_core::backend::StreamBackend;
use argus_core::{FrameId, Image};

use crate::observer::CallbackBuffer;
use crate::record::CallbackRecord;

/// One tracking session: the engine-side stream, its callback buffer,
/// and the frame counter.
///
/// Built by [`TrackEngine::create_stream`](crate::TrackEngine); the
/// observer wiring exists before the first frame can be pushed. One
/// host thread drives a stream; the engine delivers callbacks out of
/// band into the buffer, which any thread may drain.
///
/// Dropping the stream detaches the observer synchronously. After the
/// drop returns, the engine invokes no further callbacks and the buffer
/// is released.
pub struct Stream {
    backend: Box<dyn StreamBackend>,
    buffer: Arc<CallbackBuffer>,
    next_frame: FrameId,
    id: Uuid,
}

impl Stream {
    pub(crate) fn new(backend: Box<dyn StreamBackend>, buffer: Arc<CallbackBuffer>) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(stream = %id, "stream opened");
        Self {
            backend,
            buffer,
            next_frame: 0,
            id,
        }
    }

    /// Hand one frame to the engine and return its sequence number.
    ///
    /// Ids start at 0 and increase by exactly 1 per call, regardless of
    /// what the engine does with the frame. Fire-and-forget: engine-side
    /// failures surface only as absent callback records.
    pub fn push_frame(&mut self, image: Image) -> FrameId {
        let frame_id = self.next_frame;
        self.backend.push_frame(image, frame_id);
        self.next_frame += 1;
        frame_id
    }

    /// Take every buffered record in arrival order.
    pub fn drain_callbacks(&self) -> Vec<CallbackRecord> {
        self.buffer.drain()
    }

    /// Records currently waiting in the buffer.
    pub fn pending_callbacks(&self) -> usize {
        self.buffer.len()
    }

    /// Frames pushed so far; equals the next id to be assigned.
    pub fn frames_pushed(&self) -> u64 {
        self.next_frame
    }

    /// Correlation id for logs. Host-side only; the engine never sees it.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        tracing::debug!(stream = %self.id, frames = self.next_frame, "closing stream");
        // After close returns the engine holds no observer reference,
        // so the buffer can drop with the rest of the fields.
        self.backend.close();
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("frames_pushed", &self.next_frame)
            .field("pending_callbacks", &self.buffer.len())
            .finish()
    }
}
