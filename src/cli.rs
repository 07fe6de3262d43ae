//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rkburn")]
#[command(author, version, about = "USB flashing tool for Rockchip-class SoCs", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List attached devices and the mode each enumerated in
    List,

    /// Check that the selected device answers commands
    Test,

    /// Read the flash ID
    FlashId,

    /// Read the raw chip info words
    ChipInfo,

    /// Read the capability record
    Capability,

    /// Read flash geometry
    FlashInfo,

    /// Erase every block of every populated chip select
    Erase,

    /// List the on-media GPT partition table
    Partitions,

    /// Download a boot-stage image to a mask-rom device
    DownloadBoot {
        /// Boot image file
        image: PathBuf,
    },
}
