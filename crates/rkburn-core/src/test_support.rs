//! In-memory transport and channel doubles for unit tests

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::device::{DeviceDescriptor, ModeMask, UsbMode};
use crate::error::Result;
use crate::scan::ROCKCHIP_VENDOR_ID;
use crate::session::Device;
use crate::transport::{
    Channel, Status, Transport, CAPABILITY_LEN, CHIP_INFO_LEN, FLASH_ID_LEN, FLASH_INFO_LEN,
};

/// Shared counter of channels that are currently open
#[derive(Clone, Default)]
pub(crate) struct OpenChannels(Rc<RefCell<usize>>);

impl OpenChannels {
    pub(crate) fn get(&self) -> usize {
        *self.0.borrow()
    }

    fn increment(&self) {
        *self.0.borrow_mut() += 1;
    }

    fn decrement(&self) {
        *self.0.borrow_mut() -= 1;
    }
}

/// Scripted channel double
///
/// Records every primitive invocation so tests can assert on ordering and
/// on the absence of device I/O.
pub(crate) struct MockChannel {
    pub(crate) status: Status,
    pub(crate) flash_id: [u8; FLASH_ID_LEN],
    pub(crate) chip_info: [u8; CHIP_INFO_LEN],
    pub(crate) capability: [u8; CAPABILITY_LEN],
    pub(crate) flash_info: [u8; FLASH_INFO_LEN],
    pub(crate) lba: Vec<u8>,
    pub(crate) calls: Rc<RefCell<Vec<&'static str>>>,
    pub(crate) erase_calls: Rc<RefCell<Vec<(u8, u32, u16)>>>,
    pub(crate) boot_calls: Rc<RefCell<Vec<usize>>>,
    open_channels: Option<OpenChannels>,
}

impl MockChannel {
    /// Channel whose every primitive succeeds
    pub(crate) fn ok() -> MockChannel {
        MockChannel {
            status: Status::SUCCESS,
            flash_id: *b"NAND\0",
            chip_info: [0u8; CHIP_INFO_LEN],
            capability: [0u8; CAPABILITY_LEN],
            flash_info: [0u8; FLASH_INFO_LEN],
            lba: Vec::new(),
            calls: Rc::new(RefCell::new(Vec::new())),
            erase_calls: Rc::new(RefCell::new(Vec::new())),
            boot_calls: Rc::new(RefCell::new(Vec::new())),
            open_channels: None,
        }
    }

    /// Channel whose every primitive reports the given non-success status
    pub(crate) fn failing(status: u32) -> MockChannel {
        let mut channel = MockChannel::ok();
        channel.status = Status(status);
        channel
    }

    fn record(&self, op: &'static str) -> Result<Status> {
        self.calls.borrow_mut().push(op);
        Ok(self.status)
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        if let Some(open) = &self.open_channels {
            open.decrement();
        }
    }
}

impl Channel for MockChannel {
    fn test_unit_ready(&mut self) -> Result<Status> {
        self.record("test_unit_ready")
    }

    fn read_flash_id(&mut self, id: &mut [u8; FLASH_ID_LEN]) -> Result<Status> {
        *id = self.flash_id;
        self.record("read_flash_id")
    }

    fn read_chip_info(&mut self, info: &mut [u8; CHIP_INFO_LEN]) -> Result<Status> {
        *info = self.chip_info;
        self.record("read_chip_info")
    }

    fn read_capability(&mut self, caps: &mut [u8; CAPABILITY_LEN]) -> Result<Status> {
        *caps = self.capability;
        self.record("read_capability")
    }

    fn read_flash_info(&mut self, info: &mut [u8; FLASH_INFO_LEN]) -> Result<Status> {
        *info = self.flash_info;
        self.record("read_flash_info")
    }

    fn read_lba(&mut self, start: u32, buf: &mut [u8]) -> Result<Status> {
        let offset = start as usize * crate::gpt::SECTOR_SIZE;
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.lba.get(offset + i).copied().unwrap_or(0);
        }
        self.record("read_lba")
    }

    fn erase_blocks(&mut self, chip_select: u8, start_block: u32, count: u16) -> Result<Status> {
        self.erase_calls
            .borrow_mut()
            .push((chip_select, start_block, count));
        Ok(self.status)
    }

    fn transfer_boot(&mut self, image: &[u8]) -> Result<Status> {
        self.boot_calls.borrow_mut().push(image.len());
        Ok(self.status)
    }
}

/// Transport double backed by a fixed descriptor list
pub(crate) struct MockTransport {
    pub(crate) devices: Vec<DeviceDescriptor>,
    pub(crate) init_ok: bool,
    pub(crate) refresh_count: usize,
    pub(crate) open_channels: OpenChannels,
}

impl MockTransport {
    pub(crate) fn with_devices(devices: Vec<DeviceDescriptor>) -> MockTransport {
        MockTransport {
            devices,
            init_ok: true,
            refresh_count: 0,
            open_channels: OpenChannels::default(),
        }
    }

    pub(crate) fn with_modes(modes: &[UsbMode]) -> MockTransport {
        let devices = modes
            .iter()
            .enumerate()
            .map(|(i, &mode)| DeviceDescriptor {
                location_id: 0x0100 + i as u32,
                vendor_id: ROCKCHIP_VENDOR_ID,
                product_id: 0x330c,
                mode,
            })
            .collect();
        MockTransport::with_devices(devices)
    }
}

impl Transport for MockTransport {
    fn refresh(&mut self) -> bool {
        self.refresh_count += 1;
        self.init_ok
    }

    fn enumerate(&mut self, mask: ModeMask) -> Vec<DeviceDescriptor> {
        self.devices
            .iter()
            .filter(|d| d.mode.matches(mask))
            .cloned()
            .collect()
    }

    fn open(&mut self, _descriptor: &DeviceDescriptor) -> Result<Box<dyn Channel>> {
        self.open_channels.increment();
        let mut channel = MockChannel::ok();
        channel.open_channels = Some(self.open_channels.clone());
        Ok(Box::new(channel))
    }
}

/// Build a session controller directly around a mock channel
pub(crate) fn mock_device(channel: MockChannel) -> Device {
    let descriptor = DeviceDescriptor {
        location_id: 0x0104,
        vendor_id: ROCKCHIP_VENDOR_ID,
        product_id: 0x330c,
        mode: UsbMode::Loader,
    };
    Device::new(descriptor, Box::new(channel))
}

// Session tests share one process-wide active-session slot; serialize them.
static SESSION_TEST_LOCK: Mutex<()> = Mutex::new(());

pub(crate) fn session_lock() -> MutexGuard<'static, ()> {
    SESSION_TEST_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}
