//! Device scanning and target selection

use once_cell::sync::OnceCell;

use crate::device::{DeviceDescriptor, ModeMask, UsbMode};
use crate::transport::Transport;

/// Rockchip USB vendor ID
pub const ROCKCHIP_VENDOR_ID: u16 = 0x2207;

/// Vendor/product filter consulted by transport enumeration
#[derive(Debug, Clone)]
pub struct DeviceFilter {
    /// Vendor ID devices must report
    pub vendor_id: u16,
    /// Accepted product IDs; empty accepts any product of the vendor
    pub product_ids: &'static [u16],
}

impl Default for DeviceFilter {
    fn default() -> Self {
        // Any PID under the Rockchip VID; mask-rom and loader PIDs vary per SoC.
        DeviceFilter {
            vendor_id: ROCKCHIP_VENDOR_ID,
            product_ids: &[],
        }
    }
}

impl DeviceFilter {
    /// Whether a VID/PID pair passes the filter
    pub fn accepts(&self, vendor_id: u16, product_id: u16) -> bool {
        vendor_id == self.vendor_id
            && (self.product_ids.is_empty() || self.product_ids.contains(&product_id))
    }
}

// Process-lifetime filter table. Installed exactly once, before the first
// successful scan; subsequent scans reuse it unchanged even though the
// transport context itself is rebuilt every time.
static DEVICE_FILTER: OnceCell<DeviceFilter> = OnceCell::new();

/// The process-wide vendor/product filter table, installing it on first use
pub fn device_filter() -> &'static DeviceFilter {
    DEVICE_FILTER.get_or_init(|| {
        let filter = DeviceFilter::default();
        log::debug!(
            "installed device filter: vid=0x{:04x}, {} pid(s)",
            filter.vendor_id,
            filter.product_ids.len()
        );
        filter
    })
}

/// Enumerate attached devices whose mode is selected by `mask`
///
/// The transport context is torn down and re-created first so that host
/// permission grants or revocations since the previous call are observed.
/// Transport initialization failure yields an empty list, not an error;
/// scanning is best-effort and retryable.
pub fn scan<T: Transport + ?Sized>(transport: &mut T, mask: ModeMask) -> Vec<DeviceDescriptor> {
    if !transport.refresh() {
        log::warn!("USB transport re-init failed, reporting no devices");
        return Vec::new();
    }

    let _ = device_filter();

    let mut devices = transport.enumerate(mask);
    // The mask is enforced here as well, so the scanner contract holds for
    // any backend.
    devices.retain(|d| d.mode.matches(mask));

    for (index, dev) in devices.iter().enumerate() {
        log::debug!("device {}: {}", index, dev);
    }
    log::info!("scan found {} device(s)", devices.len());

    devices
}

/// Pick the session target from a scan result
///
/// A device already running a loader stage is the most capable target, so
/// the first Loader-mode entry wins; otherwise the first device of any mode.
pub fn select_target(devices: &[DeviceDescriptor]) -> Option<usize> {
    devices
        .iter()
        .position(|d| d.mode == UsbMode::Loader)
        .or(if devices.is_empty() { None } else { Some(0) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTransport;

    fn descriptor(mode: UsbMode) -> DeviceDescriptor {
        DeviceDescriptor {
            location_id: 0x0104,
            vendor_id: ROCKCHIP_VENDOR_ID,
            product_id: 0x330c,
            mode,
        }
    }

    #[test]
    fn scan_excludes_modes_outside_mask() {
        let all = vec![
            descriptor(UsbMode::MaskRom),
            descriptor(UsbMode::Loader),
            descriptor(UsbMode::MassStorage),
        ];
        for mask in [
            ModeMask::MASKROM,
            ModeMask::LOADER,
            ModeMask::MSC,
            ModeMask::FLASH_CAPABLE,
            ModeMask::ANY,
            ModeMask::empty(),
        ] {
            let mut transport = MockTransport::with_devices(all.clone());
            let found = scan(&mut transport, mask);
            assert!(
                found.iter().all(|d| d.mode.matches(mask)),
                "mask {:?} leaked a device",
                mask
            );
        }
    }

    #[test]
    fn scan_reports_empty_on_transport_failure() {
        let mut transport = MockTransport::with_devices(vec![descriptor(UsbMode::Loader)]);
        transport.init_ok = false;
        assert!(scan(&mut transport, ModeMask::ANY).is_empty());
    }

    #[test]
    fn scan_refreshes_transport_every_call() {
        let mut transport = MockTransport::with_devices(vec![descriptor(UsbMode::Loader)]);
        scan(&mut transport, ModeMask::ANY);
        scan(&mut transport, ModeMask::ANY);
        assert_eq!(transport.refresh_count, 2);
    }

    #[test]
    fn consecutive_scans_are_idempotent() {
        let devices = vec![descriptor(UsbMode::MaskRom), descriptor(UsbMode::Loader)];
        let mut transport = MockTransport::with_devices(devices);
        let first = scan(&mut transport, ModeMask::ANY);
        let second = scan(&mut transport, ModeMask::ANY);
        assert_eq!(first, second);
    }

    #[test]
    fn filter_is_installed_once() {
        let first = device_filter() as *const DeviceFilter;
        let second = device_filter() as *const DeviceFilter;
        assert_eq!(first, second);
    }

    #[test]
    fn filter_accepts_vendor_devices_only() {
        let filter = DeviceFilter::default();
        assert!(filter.accepts(ROCKCHIP_VENDOR_ID, 0x330c));
        assert!(filter.accepts(ROCKCHIP_VENDOR_ID, 0x0000));
        assert!(!filter.accepts(0x1d6b, 0x330c));
    }

    #[test]
    fn selection_prefers_loader() {
        let devices = vec![
            descriptor(UsbMode::MassStorage),
            descriptor(UsbMode::Loader),
            descriptor(UsbMode::MaskRom),
        ];
        assert_eq!(select_target(&devices), Some(1));
    }

    #[test]
    fn selection_falls_back_to_first_device() {
        let devices = vec![descriptor(UsbMode::MaskRom), descriptor(UsbMode::MassStorage)];
        assert_eq!(select_target(&devices), Some(0));
    }

    #[test]
    fn selection_of_nothing_is_none() {
        assert_eq!(select_target(&[]), None);
    }
}
