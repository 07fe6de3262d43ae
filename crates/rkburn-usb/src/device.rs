//! Open communication channel against one device
//!
//! `UsbChannel` owns a claimed interface on an open device handle and
//! implements the core [`Channel`] primitives over it: bulk CBW/CSW
//! commands for the flash protocol, vendor control transfers for the
//! mask-rom boot-stage upload. The interface is released on drop.

use std::time::Duration;

use rusb::{Context, DeviceHandle, TransferType};

use rkburn_core::{Channel, Error as CoreError, Status};
use rkburn_core::transport::{CAPABILITY_LEN, CHIP_INFO_LEN, FLASH_ID_LEN, FLASH_INFO_LEN};

use crate::error::{Result, UsbError};
use crate::protocol::{self, opcode, CommandBlock, Direction, CSW_LEN};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
// Full-chip erase of a large eMMC takes a while; the device answers the CSW
// only once the last block is done.
const ERASE_TIMEOUT: Duration = Duration::from_secs(120);

/// Vendor control request carrying boot-stage data
const BOOT_REQUEST: u8 = 0x0C;
/// wIndex selecting the boot-stage upload
const BOOT_STAGE_INDEX: u16 = 0x0471;
/// Control transfer chunk size the mask-rom accepts
const BOOT_CHUNK_SIZE: usize = 4096;

/// One open channel: device handle, claimed interface, bulk endpoint pair
pub struct UsbChannel {
    handle: DeviceHandle<Context>,
    interface: u8,
    ep_in: u8,
    ep_out: u8,
    tag: u32,
}

impl UsbChannel {
    /// Open the device and claim the first interface with a bulk in/out pair
    pub(crate) fn open(device: &rusb::Device<Context>) -> Result<UsbChannel> {
        let mut handle = device.open().map_err(UsbError::OpenFailed)?;
        let _ = handle.set_auto_detach_kernel_driver(true);

        let config = device.active_config_descriptor()?;
        for interface in config.interfaces() {
            for descriptor in interface.descriptors() {
                let mut ep_in = None;
                let mut ep_out = None;
                for endpoint in descriptor.endpoint_descriptors() {
                    if endpoint.transfer_type() != TransferType::Bulk {
                        continue;
                    }
                    match endpoint.direction() {
                        rusb::Direction::In => ep_in = ep_in.or(Some(endpoint.address())),
                        rusb::Direction::Out => ep_out = ep_out.or(Some(endpoint.address())),
                    }
                }
                if let (Some(ep_in), Some(ep_out)) = (ep_in, ep_out) {
                    let number = descriptor.interface_number();
                    handle
                        .claim_interface(number)
                        .map_err(|source| UsbError::ClaimFailed {
                            interface: number,
                            source,
                        })?;
                    log::debug!(
                        "claimed interface {} (bulk in 0x{:02x}, out 0x{:02x})",
                        number,
                        ep_in,
                        ep_out
                    );
                    return Ok(UsbChannel {
                        handle,
                        interface: number,
                        ep_in,
                        ep_out,
                        tag: 0,
                    });
                }
            }
        }
        Err(UsbError::EndpointNotFound)
    }

    fn next_tag(&mut self) -> u32 {
        self.tag = self.tag.wrapping_add(1);
        self.tag
    }

    fn write_exact(&self, data: &[u8], timeout: Duration) -> Result<()> {
        let written = self.handle.write_bulk(self.ep_out, data, timeout)?;
        if written != data.len() {
            return Err(UsbError::ShortTransfer {
                expected: data.len(),
                actual: written,
            });
        }
        Ok(())
    }

    fn read_exact(&self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        let mut offset = 0;
        while offset < buf.len() {
            let read = self.handle.read_bulk(self.ep_in, &mut buf[offset..], timeout)?;
            if read == 0 {
                return Err(UsbError::ShortTransfer {
                    expected: buf.len(),
                    actual: offset,
                });
            }
            offset += read;
        }
        Ok(())
    }

    /// Run one CBW / data / CSW exchange and return the device status
    fn command(
        &mut self,
        block: CommandBlock,
        direction: Direction,
        data: &mut [u8],
        timeout: Duration,
    ) -> Result<Status> {
        let tag = self.next_tag();
        let cbw = protocol::encode_cbw(tag, data.len() as u32, direction, &block);
        self.write_exact(&cbw, COMMAND_TIMEOUT)?;

        if !data.is_empty() {
            match direction {
                Direction::In => self.read_exact(data, timeout)?,
                Direction::Out => self.write_exact(data, timeout)?,
            }
        }

        let mut csw = [0u8; CSW_LEN];
        self.read_exact(&mut csw, timeout)?;
        let status = protocol::parse_csw(&csw, tag)?;
        Ok(Status(u32::from(status)))
    }

    fn boot_transfer(&mut self, image: &[u8]) -> Result<()> {
        let mut payload = image.to_vec();
        payload.extend_from_slice(&protocol::crc16_ccitt(image).to_be_bytes());

        // The ROM ends the upload on a short packet, so a payload that is an
        // exact multiple of the chunk size gets its last byte sent alone.
        let split = if payload.len() % BOOT_CHUNK_SIZE == 0 {
            payload.len() - 1
        } else {
            payload.len()
        };

        let request_type =
            rusb::request_type(rusb::Direction::Out, rusb::RequestType::Vendor, rusb::Recipient::Device);
        for chunk in payload[..split].chunks(BOOT_CHUNK_SIZE).chain(payload[split..].chunks(1)) {
            let written =
                self.handle
                    .write_control(request_type, BOOT_REQUEST, 0, BOOT_STAGE_INDEX, chunk, COMMAND_TIMEOUT)?;
            if written != chunk.len() {
                return Err(UsbError::ShortTransfer {
                    expected: chunk.len(),
                    actual: written,
                });
            }
        }
        Ok(())
    }
}

impl Drop for UsbChannel {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            log::debug!("release of interface {} failed: {}", self.interface, e);
        }
    }
}

/// Map a codec/transport fault into the core error type
fn io<T>(op: &'static str, result: Result<T>) -> rkburn_core::Result<T> {
    result.map_err(|e| CoreError::TransportIo {
        op,
        detail: e.to_string(),
    })
}

impl Channel for UsbChannel {
    fn test_unit_ready(&mut self) -> rkburn_core::Result<Status> {
        let block = CommandBlock::new(opcode::TEST_UNIT_READY);
        io(
            "test unit ready",
            self.command(block, Direction::In, &mut [], COMMAND_TIMEOUT),
        )
    }

    fn read_flash_id(&mut self, id: &mut [u8; FLASH_ID_LEN]) -> rkburn_core::Result<Status> {
        let mut block = CommandBlock::new(opcode::READ_FLASH_ID);
        block.length = FLASH_ID_LEN as u16;
        io(
            "read flash id",
            self.command(block, Direction::In, id, COMMAND_TIMEOUT),
        )
    }

    fn read_chip_info(&mut self, info: &mut [u8; CHIP_INFO_LEN]) -> rkburn_core::Result<Status> {
        let mut block = CommandBlock::new(opcode::READ_CHIP_INFO);
        block.length = CHIP_INFO_LEN as u16;
        io(
            "read chip info",
            self.command(block, Direction::In, info, COMMAND_TIMEOUT),
        )
    }

    fn read_capability(&mut self, caps: &mut [u8; CAPABILITY_LEN]) -> rkburn_core::Result<Status> {
        let mut block = CommandBlock::new(opcode::READ_CAPABILITY);
        block.length = CAPABILITY_LEN as u16;
        io(
            "read capability",
            self.command(block, Direction::In, caps, COMMAND_TIMEOUT),
        )
    }

    fn read_flash_info(&mut self, info: &mut [u8; FLASH_INFO_LEN]) -> rkburn_core::Result<Status> {
        let mut block = CommandBlock::new(opcode::READ_FLASH_INFO);
        block.length = FLASH_INFO_LEN as u16;
        io(
            "read flash info",
            self.command(block, Direction::In, info, COMMAND_TIMEOUT),
        )
    }

    fn read_lba(&mut self, start: u32, buf: &mut [u8]) -> rkburn_core::Result<Status> {
        let mut block = CommandBlock::new(opcode::READ_LBA);
        block.address = start;
        block.length = (buf.len() / 512) as u16;
        io(
            "read lba",
            self.command(block, Direction::In, buf, COMMAND_TIMEOUT),
        )
    }

    fn erase_blocks(
        &mut self,
        chip_select: u8,
        start_block: u32,
        count: u16,
    ) -> rkburn_core::Result<Status> {
        let mut block = CommandBlock::new(opcode::ERASE_FORCE);
        block.subcode = chip_select;
        block.address = start_block;
        block.length = count;
        io(
            "erase blocks",
            self.command(block, Direction::Out, &mut [], ERASE_TIMEOUT),
        )
    }

    fn transfer_boot(&mut self, image: &[u8]) -> rkburn_core::Result<Status> {
        // The mask-rom acknowledges each control chunk; there is no status
        // phase beyond transfer success.
        io("transfer boot", self.boot_transfer(image))?;
        Ok(Status::SUCCESS)
    }
}
