//! rkburn-usb - libusb transport for rkburn
//!
//! Implements the `rkburn-core` collaborator traits over libusb: device
//! enumeration with mode classification, channel open/claim, the bulk
//! CBW/CSW command codec, and the mask-rom boot-stage upload.
//!
//! # Example
//!
//! ```no_run
//! use rkburn_core::{flash, with_session, ModeMask};
//! use rkburn_usb::UsbTransport;
//!
//! let mut transport = UsbTransport::new();
//! let geometry = with_session(&mut transport, ModeMask::FLASH_CAPABLE, |dev| {
//!     flash::read_flash_info(dev)
//! })?;
//! println!("{}", geometry);
//! # Ok::<(), rkburn_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod device;
mod error;
pub mod protocol;
mod transport;

pub use device::UsbChannel;
pub use error::{Result, UsbError};
pub use transport::UsbTransport;
