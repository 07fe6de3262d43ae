//! Collaborator traits at the USB boundary
//!
//! The core never talks to libusb directly. It consumes two capability
//! surfaces: a [`Transport`] that enumerates and opens devices, and a
//! [`Channel`] carrying the fixed request/response primitives of the bulk
//! protocol. `rkburn-usb` implements both; tests substitute mocks.

use crate::device::{DeviceDescriptor, ModeMask};
use crate::error::Result;

/// Raw status word returned by a channel primitive
///
/// The command layer maps the single success value to success and every
/// other value to a failure, without interpreting individual codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u32);

impl Status {
    /// The one status value the command layer treats as success
    pub const SUCCESS: Status = Status(0);

    /// Whether this is the success status
    pub fn is_success(self) -> bool {
        self == Status::SUCCESS
    }
}

/// Low-level USB transport: enumerate and open devices
///
/// Failure to initialize is reported through [`Transport::refresh`] and
/// treated by the scanner as "no devices", never as a fatal error.
pub trait Transport {
    /// Tear down and re-create the transport context.
    ///
    /// Host-granted device permissions are not guaranteed to be reflected in
    /// a long-lived context, so every scan starts with a fresh one. Returns
    /// `false` when the context could not be created; a scan then reports an
    /// empty device list and may simply be retried later.
    fn refresh(&mut self) -> bool;

    /// List attached devices whose personality is selected by `mask`.
    fn enumerate(&mut self, mask: ModeMask) -> Vec<DeviceDescriptor>;

    /// Open a communication channel against one discovered device.
    fn open(&mut self, descriptor: &DeviceDescriptor) -> Result<Box<dyn Channel>>;
}

/// Number of bytes in a flash ID response
pub const FLASH_ID_LEN: usize = 5;
/// Number of bytes in a chip info response
pub const CHIP_INFO_LEN: usize = 16;
/// Number of bytes in a capability response
pub const CAPABILITY_LEN: usize = 8;
/// Number of bytes in a flash info (geometry) response
pub const FLASH_INFO_LEN: usize = 13;

/// Fixed request/response primitives of the device protocol
///
/// Every method returns the raw device [`Status`]; transport-level faults
/// (unplug, stall, timeout) are `Err`. Releasing whatever the channel holds
/// (claimed interface, open handle) happens on drop.
pub trait Channel {
    /// Liveness probe
    fn test_unit_ready(&mut self) -> Result<Status>;

    /// Read the 5-byte flash ID into `id`
    fn read_flash_id(&mut self, id: &mut [u8; FLASH_ID_LEN]) -> Result<Status>;

    /// Read the 16-byte chip info words into `info`
    fn read_chip_info(&mut self, info: &mut [u8; CHIP_INFO_LEN]) -> Result<Status>;

    /// Read the 8-byte capability record into `caps`
    fn read_capability(&mut self, caps: &mut [u8; CAPABILITY_LEN]) -> Result<Status>;

    /// Read the raw flash geometry record into `info`
    fn read_flash_info(&mut self, info: &mut [u8; FLASH_INFO_LEN]) -> Result<Status>;

    /// Read `buf.len() / 512` sectors starting at logical block `start`
    fn read_lba(&mut self, start: u32, buf: &mut [u8]) -> Result<Status>;

    /// Force-erase `count` blocks starting at block `start_block` on chip
    /// select `chip_select`
    fn erase_blocks(&mut self, chip_select: u8, start_block: u32, count: u16) -> Result<Status>;

    /// Push a boot-stage image to a mask-rom device
    fn transfer_boot(&mut self, image: &[u8]) -> Result<Status>;
}
