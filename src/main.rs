//! rkburn - USB flashing tool for Rockchip-class SoCs
//!
//! Drives a single attached device through its mask-rom, loader, or
//! mass-storage USB personality and issues flashing-protocol operations
//! against it: boot-stage download, flash identification, capability and
//! geometry queries, partition-table enumeration, and full-chip erase.
//!
//! The heavy lifting lives in `rkburn-core` (session and command layer) and
//! `rkburn-usb` (libusb transport); this binary only parses arguments and
//! renders results.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use rkburn_usb::UsbTransport;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let mut transport = UsbTransport::new();

    let result = match cli.command {
        Commands::List => commands::list::run_list(&mut transport),
        Commands::Test => commands::info::run_test(&mut transport),
        Commands::FlashId => commands::info::run_flash_id(&mut transport),
        Commands::ChipInfo => commands::info::run_chip_info(&mut transport),
        Commands::Capability => commands::info::run_capability(&mut transport),
        Commands::FlashInfo => commands::info::run_flash_info(&mut transport),
        Commands::Erase => commands::erase::run_erase(&mut transport),
        Commands::Partitions => commands::partitions::run_partitions(&mut transport),
        Commands::DownloadBoot { image } => {
            commands::download::run_download_boot(&mut transport, &image)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
