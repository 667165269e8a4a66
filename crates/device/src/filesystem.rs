use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mount_options::MountOptions;
use crate::subvolume::Subvolume;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Filesystem {
    pub uuid: Option<Uuid>,
    pub label: Option<String>,
    pub fs_type: Option<String>,
    pub mount_point: Option<String>,
    pub mount_options: Option<MountOptions>,
    pub subvolume: Option<Subvolume>,
}

impl Filesystem {
    /// A filesystem *is mounted* iff its mount point is non-empty.
    pub fn is_mounted(&self) -> bool {
        matches!(&self.mount_point, Some(mp) if !mp.is_empty())
    }

    pub fn is_vfat(&self) -> bool {
        self.fs_type.as_deref() == Some("vfat")
    }

    pub fn is_btrfs(&self) -> bool {
        self.fs_type.as_deref() == Some("btrfs")
    }
}
