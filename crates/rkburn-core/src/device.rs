//! Device descriptors and USB personality modes

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Mask selecting which USB personalities a scan should report
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeMask: u32 {
        /// Mask-rom bootstrap mode
        const MASKROM = 1 << 0;
        /// Secondary-stage loader mode
        const LOADER = 1 << 1;
        /// USB mass-storage mode
        const MSC = 1 << 2;
    }
}

impl ModeMask {
    /// All personalities a device can enumerate in
    pub const ANY: ModeMask = ModeMask::all();

    /// Personalities that accept flash-protocol commands
    pub const FLASH_CAPABLE: ModeMask = ModeMask::MASKROM.union(ModeMask::LOADER);
}

/// USB personality a device was observed in at scan time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbMode {
    /// Earliest-stage personality, exposed before any bootloader runs
    MaskRom,
    /// Personality after a secondary-stage loader has been accepted
    Loader,
    /// Mass-storage personality
    MassStorage,
    /// Enumerated but not classifiable
    Unknown,
}

impl UsbMode {
    /// Whether this mode is selected by `mask`
    pub fn matches(self, mask: ModeMask) -> bool {
        match self {
            UsbMode::MaskRom => mask.contains(ModeMask::MASKROM),
            UsbMode::Loader => mask.contains(ModeMask::LOADER),
            UsbMode::MassStorage => mask.contains(ModeMask::MSC),
            UsbMode::Unknown => false,
        }
    }
}

impl fmt::Display for UsbMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsbMode::MaskRom => write!(f, "Maskrom"),
            UsbMode::Loader => write!(f, "Loader"),
            UsbMode::MassStorage => write!(f, "MSC"),
            UsbMode::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One discovered device
///
/// Identity is positional within a single scan result: a later scan may
/// assign a different index to the same physical device, so descriptors must
/// not be cached across scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Opaque bus/port identifier (bus number in the high byte, device
    /// address in the low byte)
    pub location_id: u32,
    /// USB vendor ID
    pub vendor_id: u16,
    /// USB product ID
    pub product_id: u16,
    /// Personality the device enumerated in
    pub mode: UsbMode,
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vid=0x{:04x} pid=0x{:04x} loc=0x{:08x}",
            self.mode, self.vendor_id, self.product_id, self.location_id
        )
    }
}
