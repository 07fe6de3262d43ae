//! Scoped device sessions
//!
//! A session binds exactly one discovered device to exactly one open
//! communication channel for the duration of one closure. The channel is
//! released on every exit path: the controller owns it, and dropping the
//! controller (normal return, error return, or unwind) closes it.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::device::{DeviceDescriptor, ModeMask};
use crate::error::{Error, Result};
use crate::flash::FlashGeometry;
use crate::scan::{scan, select_target};
use crate::transport::{Channel, Transport};

// Single-device model: at most one live session per process. This is
// explicit process-scoped state, not a lock - concurrent callers are a
// usage error, not a race to arbitrate.
static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

struct SessionSlot;

impl SessionSlot {
    fn claim() -> Result<SessionSlot> {
        if SESSION_ACTIVE.swap(true, Ordering::SeqCst) {
            return Err(Error::SessionActive);
        }
        Ok(SessionSlot)
    }
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        SESSION_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Controller bound to one open channel for the lifetime of a session
///
/// Flash geometry is cached here after a successful
/// [`crate::flash::read_flash_info`] so that erase can check its
/// precondition without re-querying the device.
pub struct Device {
    descriptor: DeviceDescriptor,
    channel: Box<dyn Channel>,
    geometry: Option<FlashGeometry>,
}

impl Device {
    pub(crate) fn new(descriptor: DeviceDescriptor, channel: Box<dyn Channel>) -> Device {
        Device {
            descriptor,
            channel,
            geometry: None,
        }
    }

    /// Descriptor of the device this session is bound to
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// Geometry from the last successful flash info query in this session
    pub fn geometry(&self) -> Option<&FlashGeometry> {
        self.geometry.as_ref()
    }

    pub(crate) fn channel(&mut self) -> &mut dyn Channel {
        self.channel.as_mut()
    }

    pub(crate) fn set_geometry(&mut self, geometry: FlashGeometry) {
        self.geometry = Some(geometry);
    }
}

/// Run `body` against a freshly opened device session
///
/// Performs a scan, applies the selection policy, opens a channel against
/// the chosen device and hands the bound [`Device`] to `body`. The channel
/// is torn down before this function returns, whether `body` succeeded,
/// failed, or panicked.
pub fn with_session<T, R, F>(transport: &mut T, mask: ModeMask, body: F) -> Result<R>
where
    T: Transport + ?Sized,
    F: FnOnce(&mut Device) -> Result<R>,
{
    let devices = scan(transport, mask);
    let index = select_target(&devices).ok_or(Error::NoDevice)?;

    let _slot = SessionSlot::claim()?;
    let target = &devices[index];
    log::info!("opening session against device {}: {}", index, target);

    let channel = transport.open(target)?;
    let mut device = Device::new(target.clone(), channel);
    body(&mut device)
}
