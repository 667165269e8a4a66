//! Shared error types, configuration model, logging setup, and constants used
//! by every other `refind-btrfs` crate.

pub mod config;
pub mod config_loader;
pub mod constants;
pub mod errors;
pub mod logging;

pub use config::{BootStanzaGeneration, Icon, PackageConfig, SelectionCount, SnapshotManipulation, SnapshotSearch};
pub use errors::{RefindBtrfsError, Result};
