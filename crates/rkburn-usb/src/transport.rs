//! libusb-backed transport
//!
//! The context is dropped and re-created on every [`Transport::refresh`]
//! call. Host-granted device permissions are only re-read by libusb at
//! context creation, so a long-lived context would keep serving a stale
//! view; rebuilding it per scan is what makes permission changes visible.

use rusb::{Context, UsbContext};

use rkburn_core::scan::device_filter;
use rkburn_core::{Channel, DeviceDescriptor, Error as CoreError, ModeMask, Transport, UsbMode};

use crate::device::UsbChannel;

/// USB interface class of a mass-storage function
const USB_CLASS_MASS_STORAGE: u8 = 0x08;

/// libusb transport for Rockchip-class devices
pub struct UsbTransport {
    context: Option<Context>,
}

impl UsbTransport {
    /// Transport with no live context; the first scan creates one
    pub fn new() -> UsbTransport {
        UsbTransport { context: None }
    }
}

impl Default for UsbTransport {
    fn default() -> Self {
        UsbTransport::new()
    }
}

/// Classify a device's personality from its descriptors
///
/// A mass-storage interface wins outright. Otherwise the low digit of the
/// reported USB release distinguishes the personalities: the loader bumps
/// it to an odd value, the mask-rom reports an even one.
fn classify(has_msc_interface: bool, usb_release_sub_minor: u8) -> UsbMode {
    if has_msc_interface {
        UsbMode::MassStorage
    } else if usb_release_sub_minor & 1 == 1 {
        UsbMode::Loader
    } else {
        UsbMode::MaskRom
    }
}

fn has_msc_interface<T: UsbContext>(device: &rusb::Device<T>) -> bool {
    let Ok(config) = device.active_config_descriptor() else {
        return false;
    };
    for interface in config.interfaces() {
        for descriptor in interface.descriptors() {
            if descriptor.class_code() == USB_CLASS_MASS_STORAGE {
                return true;
            }
        }
    }
    false
}

fn location_id<T: UsbContext>(device: &rusb::Device<T>) -> u32 {
    (u32::from(device.bus_number()) << 8) | u32::from(device.address())
}

impl Transport for UsbTransport {
    fn refresh(&mut self) -> bool {
        // Old context first: libusb re-reads permission state on init.
        self.context = None;
        match Context::new() {
            Ok(context) => {
                self.context = Some(context);
                true
            }
            Err(e) => {
                log::debug!("libusb context init failed: {}", e);
                false
            }
        }
    }

    fn enumerate(&mut self, mask: ModeMask) -> Vec<DeviceDescriptor> {
        let Some(context) = self.context.as_ref() else {
            return Vec::new();
        };
        let devices = match context.devices() {
            Ok(devices) => devices,
            Err(e) => {
                log::debug!("device list failed: {}", e);
                return Vec::new();
            }
        };

        let filter = device_filter();
        let mut found = Vec::new();
        for device in devices.iter() {
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            if !filter.accepts(descriptor.vendor_id(), descriptor.product_id()) {
                continue;
            }

            let mode = classify(
                has_msc_interface(&device),
                descriptor.usb_version().sub_minor(),
            );
            if !mode.matches(mask) {
                continue;
            }

            found.push(DeviceDescriptor {
                location_id: location_id(&device),
                vendor_id: descriptor.vendor_id(),
                product_id: descriptor.product_id(),
                mode,
            });
        }
        found
    }

    fn open(&mut self, target: &DeviceDescriptor) -> rkburn_core::Result<Box<dyn Channel>> {
        let context = self.context.as_ref().ok_or(CoreError::TransportUnavailable)?;
        let devices = context
            .devices()
            .map_err(|e| CoreError::Open(e.to_string()))?;

        let device = devices
            .iter()
            .find(|d| {
                location_id(d) == target.location_id
                    && d.device_descriptor()
                        .map(|desc| {
                            desc.vendor_id() == target.vendor_id
                                && desc.product_id() == target.product_id
                        })
                        .unwrap_or(false)
            })
            .ok_or_else(|| CoreError::Open(format!("device {} disappeared", target)))?;

        let channel = UsbChannel::open(&device).map_err(|e| CoreError::Open(e.to_string()))?;
        Ok(Box::new(channel))
    }
}
