//! Error types for the USB transport

use thiserror::Error;

/// Result type for USB transport operations
pub type Result<T> = std::result::Result<T, UsbError>;

/// Errors raised by the libusb transport and the bulk codec
#[derive(Debug, Error)]
pub enum UsbError {
    /// Opening the device handle failed
    #[error("failed to open device: {0}")]
    OpenFailed(#[source] rusb::Error),

    /// Claiming the command interface failed
    #[error("failed to claim interface {interface}: {source}")]
    ClaimFailed {
        /// Interface number that was being claimed
        interface: u8,
        /// Underlying libusb error
        #[source]
        source: rusb::Error,
    },

    /// The device exposes no bulk in/out endpoint pair
    #[error("no bulk endpoint pair found")]
    EndpointNotFound,

    /// A USB transfer failed outright
    #[error("USB transfer failed: {0}")]
    Transfer(#[from] rusb::Error),

    /// A transfer moved fewer bytes than the protocol requires
    #[error("short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer {
        /// Bytes the protocol phase requires
        expected: usize,
        /// Bytes actually transferred
        actual: usize,
    },

    /// The status block did not carry the expected signature
    #[error("bad status block signature")]
    BadCswSignature,

    /// The status block echoed a tag from a different command
    #[error("status tag mismatch: sent 0x{sent:08x}, received 0x{received:08x}")]
    TagMismatch {
        /// Tag sent in the command block
        sent: u32,
        /// Tag echoed in the status block
        received: u32,
    },
}
