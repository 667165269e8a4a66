use std::path::PathBuf;

use refind_btrfs_common::constants::DEFAULT_CONFIG_PATH;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunMode {
    OneTime,
    Background,
}

#[derive(clap::Parser, Debug)]
#[command(name = "refind-btrfs", about = "Generates rEFInd boot stanzas for Btrfs snapshots")]
pub struct Args {
    /// Whether to run once and exit, or stay resident and react to snapshot events.
    #[arg(long, value_enum, default_value_t = RunMode::OneTime)]
    pub run_mode: RunMode,

    /// Path to the package configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Increase logging verbosity; may be repeated (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
