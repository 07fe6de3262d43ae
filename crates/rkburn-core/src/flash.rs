//! Flash command layer
//!
//! Stateless operations expressed in terms of an open session's [`Device`]
//! controller. Every operation either returns a fully populated result or a
//! failure; nothing retries internally - retry policy belongs to the caller.

use std::fmt;

use bitflags::bitflags;

use crate::boot::{BootImage, StagedImage};
use crate::error::{Error, Result};
use crate::gpt::{self, PartitionRecord};
use crate::session::Device;
use crate::transport::{
    Status, CAPABILITY_LEN, CHIP_INFO_LEN, FLASH_ID_LEN, FLASH_INFO_LEN,
};

/// Manufacturer name table indexed by the code byte of a flash info response
const MANUFACTURER_NAMES: [&str; 9] = [
    "SAMSUNG", "TOSHIBA", "HYNIX", "INFINEON", "MICRON", "RENESAS", "ST", "INTEL", "SANDISK",
];

/// Largest block count a single erase command may carry
const MAX_ERASE_BLOCKS: u32 = 128;

/// Map a channel status to the command layer's success/failure contract
fn check(op: &'static str, status: Status) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        log::debug!("{}: device status 0x{:02x}", op, status.0);
        Err(Error::Channel { op, status: status.0 })
    }
}

bitflags! {
    /// Decoded capability bits of the first response byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapabilityFlags: u8 {
        /// Device supports direct logical-block addressing
        const DIRECT_LBA = 1 << 0;
        /// Device restricts access to the first 4 MiB
        const FIRST_4M_ACCESS = 1 << 2;
    }
}

/// Capability record as reported by the device
///
/// Only two bits are decoded today; the raw response is kept so callers can
/// inspect bits this crate does not know about yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Raw 8-byte response
    pub raw: [u8; CAPABILITY_LEN],
}

impl Capability {
    /// Known flags of the first response byte
    pub fn flags(&self) -> CapabilityFlags {
        CapabilityFlags::from_bits_retain(self.raw[0])
    }

    /// Whether direct LBA addressing is supported
    pub fn supports_direct_lba(&self) -> bool {
        self.flags().contains(CapabilityFlags::DIRECT_LBA)
    }

    /// Whether the restricted first-4MiB access mode is active
    pub fn supports_first_4m_access(&self) -> bool {
        self.flags().contains(CapabilityFlags::FIRST_4M_ACCESS)
    }
}

/// Flash geometry decoded from a flash info response
///
/// All sizes on the wire are counted in 512-byte sectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashGeometry {
    /// Total flash size in sectors
    pub total_sectors: u32,
    /// Block size in sectors
    pub block_size_sectors: u16,
    /// Page size in sectors
    pub page_size_sectors: u8,
    /// ECC strength in bits
    pub ecc_bits: u8,
    /// Access time code
    pub access_time: u8,
    /// Manufacturer code byte
    pub manufacturer_code: u8,
    /// Bitmask of populated chip-select lines
    pub chip_select: u8,
    /// Usable sectors per block
    pub valid_sectors_per_block: u16,
}

impl FlashGeometry {
    /// Decode the raw little-endian response record
    pub fn parse(raw: &[u8; FLASH_INFO_LEN]) -> FlashGeometry {
        FlashGeometry {
            total_sectors: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            block_size_sectors: u16::from_le_bytes([raw[4], raw[5]]),
            page_size_sectors: raw[6],
            ecc_bits: raw[7],
            access_time: raw[8],
            manufacturer_code: raw[9],
            chip_select: raw[10],
            valid_sectors_per_block: u16::from_le_bytes([raw[11], raw[12]]),
        }
    }

    /// Manufacturer name, or "UNKNOWN" for an out-of-table code
    pub fn manufacturer(&self) -> &'static str {
        MANUFACTURER_NAMES
            .get(self.manufacturer_code as usize)
            .copied()
            .unwrap_or("UNKNOWN")
    }

    /// Total size in MiB
    pub fn total_size_mib(&self) -> u32 {
        self.total_sectors / 2048
    }

    /// Block size in KiB
    pub fn block_size_kib(&self) -> u32 {
        u32::from(self.block_size_sectors) / 2
    }

    /// Page size in KiB
    pub fn page_size_kib(&self) -> u32 {
        u32::from(self.page_size_sectors) / 2
    }

    /// Number of blocks per chip select
    pub fn block_count(&self) -> u32 {
        if self.block_size_sectors == 0 {
            return 0;
        }
        self.total_sectors / u32::from(self.block_size_sectors)
    }
}

impl fmt::Display for FlashGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Manufacturer: {}, value={:02x}", self.manufacturer(), self.manufacturer_code)?;
        writeln!(f, "Flash Size: {} MB", self.total_size_mib())?;
        writeln!(f, "Block Size: {} KB", self.block_size_kib())?;
        writeln!(f, "Page Size: {} KB", self.page_size_kib())?;
        writeln!(f, "ECC Bits: {}", self.ecc_bits)?;
        writeln!(f, "Access Time: {}", self.access_time)?;
        writeln!(f, "Flash CS: 0x{:02x}", self.chip_select)?;
        write!(f, "Valid Sec Per Block: {}", self.valid_sectors_per_block)
    }
}

/// Liveness probe against the open device
pub fn test_device(dev: &mut Device) -> Result<()> {
    let status = dev.channel().test_unit_ready()?;
    check("test unit ready", status)
}

/// Read the 5-byte flash ID
pub fn read_flash_id(dev: &mut Device) -> Result<[u8; FLASH_ID_LEN]> {
    let mut id = [0u8; FLASH_ID_LEN];
    let status = dev.channel().read_flash_id(&mut id)?;
    check("read flash id", status)?;
    Ok(id)
}

/// Read the 16-byte chip info record
pub fn read_chip_info(dev: &mut Device) -> Result<[u8; CHIP_INFO_LEN]> {
    let mut info = [0u8; CHIP_INFO_LEN];
    let status = dev.channel().read_chip_info(&mut info)?;
    check("read chip info", status)?;
    Ok(info)
}

/// Read and decode the capability record
pub fn read_capability(dev: &mut Device) -> Result<Capability> {
    let mut raw = [0u8; CAPABILITY_LEN];
    let status = dev.channel().read_capability(&mut raw)?;
    check("read capability", status)?;
    Ok(Capability { raw })
}

/// Query flash geometry and cache it on the session controller
pub fn read_flash_info(dev: &mut Device) -> Result<FlashGeometry> {
    let mut raw = [0u8; FLASH_INFO_LEN];
    let status = dev.channel().read_flash_info(&mut raw)?;
    check("read flash info", status)?;

    let geometry = FlashGeometry::parse(&raw);
    log::debug!(
        "flash geometry: {} MiB, {} blocks of {} KiB, cs=0x{:02x}",
        geometry.total_size_mib(),
        geometry.block_count(),
        geometry.block_size_kib(),
        geometry.chip_select
    );
    dev.set_geometry(geometry.clone());
    Ok(geometry)
}

/// Force-erase every block on every populated chip select
///
/// Requires a successful [`read_flash_info`] on the same session first; the
/// request is rejected before any channel I/O otherwise.
pub fn erase_flash(dev: &mut Device) -> Result<()> {
    let geometry = dev.geometry().cloned().ok_or(Error::GeometryUnknown)?;
    let blocks = geometry.block_count();

    for cs in 0..8u8 {
        if geometry.chip_select & (1 << cs) == 0 {
            continue;
        }
        log::info!("erasing chip select {}: {} blocks", cs, blocks);

        let mut position = 0u32;
        while position < blocks {
            let count = (blocks - position).min(MAX_ERASE_BLOCKS) as u16;
            let status = dev.channel().erase_blocks(cs, position, count)?;
            check("erase blocks", status)?;
            position += u32::from(count);
        }
    }
    Ok(())
}

/// Enumerate the on-media partition table
///
/// Reads the first 34 sectors of the disk and decodes them as GPT. A
/// signature mismatch is not an error: it returns `Ok(None)`, which callers
/// treat as "no partitions".
pub fn list_partitions(dev: &mut Device) -> Result<Option<Vec<PartitionRecord>>> {
    let mut table = vec![0u8; gpt::TABLE_SECTORS * gpt::SECTOR_SIZE];
    let status = dev.channel().read_lba(0, &mut table)?;
    check("read lba", status)?;
    Ok(gpt::decode_partition_table(&table))
}

/// Download a boot-stage image to a mask-rom device
///
/// The image is staged first; a missing or zero-byte image aborts before any
/// channel I/O.
pub fn download_boot(dev: &mut Device, image: &BootImage) -> Result<()> {
    let staged = StagedImage::stage(image)?;
    let data = staged.read()?;
    log::info!(
        "downloading boot stage: {} bytes from {}",
        data.len(),
        staged.path().display()
    );
    let status = dev.channel().transfer_boot(&data)?;
    check("download boot", status)
}
