//! Partition table command implementation

use rkburn_core::{flash, with_session, ModeMask};
use rkburn_usb::UsbTransport;

/// Read and print the on-media GPT partition table
pub fn run_partitions(transport: &mut UsbTransport) -> Result<(), Box<dyn std::error::Error>> {
    let table = with_session(transport, ModeMask::FLASH_CAPABLE, flash::list_partitions)?;

    match table {
        None => println!("Not a GPT disk"),
        Some(partitions) if partitions.is_empty() => println!("Partition table is empty"),
        Some(partitions) => {
            println!("No  StartLBA    Name");
            for p in &partitions {
                println!("{:02}: {:10}  {}", p.index, p.start_lba, p.name);
            }
        }
    }
    Ok(())
}
