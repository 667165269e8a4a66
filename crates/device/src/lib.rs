pub mod adapters;
pub mod filesystem;
pub mod fstab;
pub mod mount_options;
pub mod partition;
pub mod subvolume;

pub use adapters::{
    CliLiveDeviceAdapter, CliPhysicalDeviceAdapter, CliSubvolumeAdapter, LiveDeviceAdapter,
    PhysicalDeviceAdapter, SubvolumeAdapter,
};
pub use filesystem::Filesystem;
pub use fstab::{FstabMount, StaticPartitionTable};
pub use mount_options::{MountOptionToken, MountOptions};
pub use partition::{Partition, PartitionTable, PartitionTableType};
pub use subvolume::{Subvolume, SubvolumeBuilder};
