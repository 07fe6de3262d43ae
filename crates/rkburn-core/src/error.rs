//! Error types for rkburn-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the core [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the session and flash command layers
///
/// None of these are retried internally; every failure is returned to the
/// immediate caller. A GPT signature mismatch is deliberately *not* an error
/// (see [`crate::flash::list_partitions`]).
#[derive(Debug, Error)]
pub enum Error {
    /// USB transport could not be (re-)initialized
    #[error("USB transport unavailable")]
    TransportUnavailable,

    /// Scan succeeded but no device matched the requested modes
    #[error("no device found in the requested mode(s)")]
    NoDevice,

    /// A session is already open; this design is single-device, single-session
    #[error("another session is already active")]
    SessionActive,

    /// Opening a communication channel against the selected device failed
    #[error("failed to open device: {0}")]
    Open(String),

    /// A channel command completed with a non-success device status
    #[error("{op} failed with device status 0x{status:02X}")]
    Channel {
        /// Operation name, for diagnostics
        op: &'static str,
        /// Raw status word reported by the device
        status: u32,
    },

    /// The transport failed mid-command (device unplugged, stalled, ...)
    #[error("transport error during {op}: {detail}")]
    TransportIo {
        /// Operation name, for diagnostics
        op: &'static str,
        /// Backend-specific description
        detail: String,
    },

    /// Erase requested before a successful flash geometry query
    #[error("flash geometry unknown; query flash info first")]
    GeometryUnknown,

    /// Boot image exists but is zero bytes long
    #[error("boot image {0} is empty")]
    EmptyImage(PathBuf),

    /// Boot image is missing or cannot be read
    #[error("cannot read boot image {path}: {source}")]
    ImageUnreadable {
        /// Path that was checked
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing the staged copy of a boot image failed
    #[error("failed to stage boot image: {0}")]
    Staging(#[source] std::io::Error),
}
