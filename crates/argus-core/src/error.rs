//! Error surface shared by every backend contract.
//!
//! Backends report failures as a code plus a human-readable message, and
//! the binding forwards both unmodified. Success is the `Ok` arm of the
//! `Result`, so there is no "ok" code here.

use thiserror::Error;

/// Machine-readable failure category a backend attaches to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    /// Caller passed an argument the backend cannot work with.
    InvalidInput,
    /// Configuration rejected at load or apply time.
    InvalidConfig,
    /// The module exists but is not ready to serve this call.
    ModuleNotReady,
    /// A resource (model file, device, license server) is unreachable.
    ResourceUnavailable,
    /// The operation needs a capability the edition does not include.
    LicenseRestricted,
    /// Unclassified backend failure.
    Internal,
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResultCode::InvalidInput => "invalid input",
            ResultCode::InvalidConfig => "invalid config",
            ResultCode::ModuleNotReady => "module not ready",
            ResultCode::ResourceUnavailable => "resource unavailable",
            ResultCode::LicenseRestricted => "license restricted",
            ResultCode::Internal => "internal error",
        };
        write!(f, "{name}")
    }
}

/// Failure reported by a backend call, forwarded verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct BackendError {
    pub code: ResultCode,
    pub message: String,
}

impl BackendError {
    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for the most common category.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ResultCode::Internal, message)
    }
}
