//! List command implementation

use rkburn_core::{scan, ModeMask};
use rkburn_usb::UsbTransport;

/// List attached devices in every mode
pub fn run_list(transport: &mut UsbTransport) -> Result<(), Box<dyn std::error::Error>> {
    let devices = scan(transport, ModeMask::ANY);

    if devices.is_empty() {
        println!("No devices found");
        return Ok(());
    }

    for (index, dev) in devices.iter().enumerate() {
        println!(
            "DevNo={}\tVid=0x{:04x},Pid=0x{:04x},LocationID={:x}\t{}",
            index + 1,
            dev.vendor_id,
            dev.product_id,
            dev.location_id,
            dev.mode
        );
    }
    Ok(())
}
