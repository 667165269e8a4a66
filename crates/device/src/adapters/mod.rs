mod btrfsutil;
mod findmnt;
mod lsblk;

pub use btrfsutil::CliSubvolumeAdapter;
pub use findmnt::CliLiveDeviceAdapter;
pub use lsblk::CliPhysicalDeviceAdapter;

use std::path::Path;

use refind_btrfs_common::errors::Result;

use crate::filesystem::Filesystem;
use crate::partition::PartitionTable;
use crate::subvolume::Subvolume;

/// Returns the block-device tree: partitions, their partition types,
/// filesystems, and each table's UUID/type. Grounded on `lsblk -J -O`.
pub trait PhysicalDeviceAdapter {
    fn partition_tables(&self) -> Result<Vec<PartitionTable>>;
}

/// Returns currently mounted filesystems with their live mount options.
/// Grounded on `findmnt -J`.
pub trait LiveDeviceAdapter {
    fn mounted_filesystems(&self) -> Result<Vec<Filesystem>>;
}

/// Subvolume-level operations, standing in for `libbtrfsutil` FFI.
pub trait SubvolumeAdapter {
    /// Reads the subvolume at `path`, if one exists there.
    fn get(&self, path: &Path) -> Result<Option<Subvolume>>;

    /// Every snapshot whose `parent_uuid` matches `subvolume`'s `uuid`.
    fn snapshots_of(&self, subvolume: &Subvolume) -> Result<Vec<Subvolume>>;

    /// Promotes `subvolume` to a bootable subvolume: flips the read-only
    /// property in place when `in_place` is true, otherwise clones it to
    /// `destination` and returns that clone. `destination` is ignored when
    /// `in_place` is true.
    fn bootable(&self, subvolume: &Subvolume, in_place: bool, destination: &Path) -> Result<Subvolume>;

    /// Physically deletes `subvolume`.
    fn delete(&self, subvolume: &Subvolume) -> Result<()>;
}
