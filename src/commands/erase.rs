//! Erase command implementation

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rkburn_core::{flash, with_session, ModeMask};
use rkburn_usb::UsbTransport;

/// Erase every block of every populated chip select
pub fn run_erase(transport: &mut UsbTransport) -> Result<(), Box<dyn std::error::Error>> {
    with_session(transport, ModeMask::FLASH_CAPABLE, |dev| {
        let geometry = flash::read_flash_info(dev)?;
        println!(
            "Found: {} {} MiB ({} blocks of {} KiB)",
            geometry.manufacturer(),
            geometry.total_size_mib(),
            geometry.block_count(),
            geometry.block_size_kib()
        );

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Erasing all blocks (this may take a while)...");
        pb.enable_steady_tick(Duration::from_millis(100));

        let result = flash::erase_flash(dev);
        pb.finish_and_clear();
        result
    })?;

    println!("Chip erase complete");
    Ok(())
}
