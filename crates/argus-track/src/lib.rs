//! argus-track — bridge between pushed frames and tracking callbacks.
//!
//! The engine processes frames on its own threads and reports through
//! an observer; the host polls. This crate supplies the pieces in
//! between: [`CallbackRecord`] values describing each event, the
//! lock-guarded [`CallbackBuffer`] the engine appends into, the
//! [`Stream`] handle that numbers frames and owns the session, and the
//! [`TrackEngine`] that loads tracking configuration and opens streams.
//!
//! Teardown contract: dropping a [`Stream`] detaches its observer from
//! the engine synchronously, so the engine never holds a reference to a
//! buffer the host has released.

pub mod engine;
pub mod observer;
pub mod record;
pub mod stream;

pub use engine::{TrackEngine, TrackError};
pub use observer::CallbackBuffer;
pub use record::{CallbackRecord, RecordKind, RecordSummary};
pub use stream::Stream;

// The observer-side contracts live with the other vendor contracts in
// argus-core; re-exported here because implementing an observer or a
// best-shot policy starts from this crate.
pub use argus_core::backend::{BestShotCandidate, TrackObserver};
