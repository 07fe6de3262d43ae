//! rkburn-core - Device session and flash-protocol engine
//!
//! This crate drives a single attached Rockchip-class SoC through one of its
//! USB personalities (mask-rom, loader, or mass-storage) and exposes a fixed
//! catalog of flashing operations: boot-stage download, flash identification,
//! capability query, flash geometry query, partition-table enumeration, and
//! full-chip erase.
//!
//! The actual USB plumbing lives behind the [`Transport`] and [`Channel`]
//! traits; the `rkburn-usb` crate provides the libusb-backed implementation.
//! Everything here is synchronous and single-device: one [`with_session`]
//! call binds one device to one open channel for one unit of work and
//! releases it on every exit path.
//!
//! # Example
//!
//! ```ignore
//! use rkburn_core::{flash, with_session, ModeMask};
//! use rkburn_usb::UsbTransport;
//!
//! let mut transport = UsbTransport::new();
//! let id = with_session(&mut transport, ModeMask::FLASH_CAPABLE, |dev| {
//!     flash::read_flash_id(dev)
//! })?;
//! println!("Flash ID: {:02X?}", id);
//! # Ok::<(), rkburn_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod boot;
pub mod device;
pub mod error;
pub mod flash;
pub mod gpt;
pub mod scan;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use boot::BootImage;
pub use device::{DeviceDescriptor, ModeMask, UsbMode};
pub use error::{Error, Result};
pub use flash::{Capability, CapabilityFlags, FlashGeometry};
pub use gpt::PartitionRecord;
pub use scan::{scan, select_target};
pub use session::{with_session, Device};
pub use transport::{Channel, Status, Transport};
