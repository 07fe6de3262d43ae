//! Query commands: liveness, flash ID, chip info, capability, geometry

use rkburn_core::{flash, with_session, ModeMask};
use rkburn_usb::UsbTransport;

/// Check that the selected device answers commands
pub fn run_test(transport: &mut UsbTransport) -> Result<(), Box<dyn std::error::Error>> {
    with_session(transport, ModeMask::FLASH_CAPABLE, flash::test_device)?;
    println!("Device is ready");
    Ok(())
}

/// Read and print the flash ID
pub fn run_flash_id(transport: &mut UsbTransport) -> Result<(), Box<dyn std::error::Error>> {
    let id = with_session(transport, ModeMask::FLASH_CAPABLE, flash::read_flash_id)?;
    let hex: Vec<String> = id.iter().map(|b| format!("{:02X}", b)).collect();
    println!("Flash ID: {}", hex.join(" "));
    Ok(())
}

/// Read and print the raw chip info words
pub fn run_chip_info(transport: &mut UsbTransport) -> Result<(), Box<dyn std::error::Error>> {
    let info = with_session(transport, ModeMask::FLASH_CAPABLE, flash::read_chip_info)?;
    let hex: Vec<String> = info.iter().map(|b| format!("{:02X}", b)).collect();
    println!("Chip Info: {}", hex.join(" "));
    Ok(())
}

/// Read and print the capability record
pub fn run_capability(transport: &mut UsbTransport) -> Result<(), Box<dyn std::error::Error>> {
    let capability = with_session(transport, ModeMask::FLASH_CAPABLE, flash::read_capability)?;
    println!(
        "Direct LBA:\t\t{}",
        if capability.supports_direct_lba() { "enabled" } else { "disabled" }
    );
    println!(
        "First 4M Access:\t{}",
        if capability.supports_first_4m_access() { "enabled" } else { "disabled" }
    );
    log::debug!("raw capability bytes: {:02X?}", capability.raw);
    Ok(())
}

/// Read and print flash geometry
pub fn run_flash_info(transport: &mut UsbTransport) -> Result<(), Box<dyn std::error::Error>> {
    let geometry = with_session(transport, ModeMask::FLASH_CAPABLE, flash::read_flash_info)?;
    println!("Flash Info:");
    for line in geometry.to_string().lines() {
        println!("\t{}", line);
    }
    Ok(())
}
