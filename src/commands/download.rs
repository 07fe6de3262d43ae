//! Boot-stage download command implementation

use std::path::Path;

use rkburn_core::{flash, with_session, BootImage, ModeMask};
use rkburn_usb::UsbTransport;

/// Download a boot-stage image to a mask-rom device
pub fn run_download_boot(
    transport: &mut UsbTransport,
    image: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = BootImage::Path(image.to_path_buf());
    with_session(transport, ModeMask::MASKROM, |dev| {
        flash::download_boot(dev, &source)
    })?;

    println!("Boot stage downloaded");
    Ok(())
}
