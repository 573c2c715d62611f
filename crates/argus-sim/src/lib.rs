//! argus-sim — scripted in-process backend for the argus face stack.
//!
//! Implements every backend contract from `argus_core` against a
//! [`Script`] of per-frame detections instead of the vendor runtime.
//! The tracking side can run synchronously (callbacks inside
//! `push_frame`) or on a worker thread, switched from the `[sim]`
//! settings section, so tests can pick determinism or realism.

pub mod engine;
pub mod script;
pub mod tracking;

mod liveness;

pub use engine::SimEngineBackend;
pub use script::{subject, Script};
pub use tracking::{SimTrackingBackend, SimTrackingOptions};
