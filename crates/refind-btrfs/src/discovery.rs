use std::path::Path;

use walkdir::WalkDir;

use refind_btrfs_common::config::SnapshotSearch;
use refind_btrfs_common::errors::Result;
use refind_btrfs_device::{Subvolume, SubvolumeAdapter};

/// Walks each configured search directory (respecting `is_nested`/`max_depth`)
/// looking for subvolumes whose `parent_uuid` matches `root`'s `uuid`.
pub fn discover_snapshots(
    searches: &[SnapshotSearch],
    root: &Subvolume,
    adapter: &dyn SubvolumeAdapter,
) -> Result<Vec<Subvolume>> {
    let mut snapshots = Vec::new();

    for search in searches {
        let max_depth = if search.is_nested {
            search.max_depth as usize
        } else {
            1
        };

        for entry in WalkDir::new(&search.dir)
            .min_depth(1)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
        {
            if let Some(candidate) = adapter.get(entry.path())? {
                if candidate.parent_uuid == root.uuid {
                    snapshots.push(candidate);
                }
            }
        }
    }

    Ok(snapshots)
}

/// Loads the static partition table (own `/etc/fstab`) for a subvolume rooted
/// at `filesystem_path`, used to validate the pre-migration `/` mount.
pub fn fstab_path_for(filesystem_path: &Path) -> std::path::PathBuf {
    filesystem_path.join("etc").join("fstab")
}
