use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filesystem::Filesystem;
use refind_btrfs_common::constants::{ESP_PARTITION_TYPE_CODE, ESP_PARTITION_TYPE_GUID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionTableType {
    Gpt,
    Mtab,
    Fstab,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub name: String,
    pub partition_type_code: Option<String>,
    pub partition_type_guid: Option<String>,
    pub filesystem: Filesystem,
}

impl Partition {
    fn is_esp_type(&self) -> bool {
        self.partition_type_code
            .as_deref()
            .map(|c| c.eq_ignore_ascii_case(ESP_PARTITION_TYPE_CODE))
            .unwrap_or(false)
            || self
                .partition_type_guid
                .as_deref()
                .map(|g| g.eq_ignore_ascii_case(ESP_PARTITION_TYPE_GUID))
                .unwrap_or(false)
    }
}

/// Ordered sequence of [`Partition`]s plus a UUID and a type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTable {
    pub uuid: Uuid,
    pub table_type: PartitionTableType,
    pub partitions: Vec<Partition>,
}

/// Returns `Some` only when exactly one element of `iter` satisfies `pred`;
/// zero or multiple matches collapse to `None` ("unique" in the data model sense).
fn unique_matching<'a, I>(iter: I, pred: impl Fn(&&'a Partition) -> bool) -> Option<&'a Partition>
where
    I: Iterator<Item = &'a Partition>,
{
    let mut matches = iter.filter(pred);
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

impl PartitionTable {
    pub fn esp(&self) -> Option<&Partition> {
        unique_matching(self.partitions.iter(), |p| {
            p.is_esp_type() && p.filesystem.is_mounted() && p.filesystem.is_vfat()
        })
    }

    pub fn root(&self) -> Option<&Partition> {
        unique_matching(self.partitions.iter(), |p| {
            p.filesystem.mount_point.as_deref() == Some("/")
        })
    }

    pub fn boot(&self) -> Option<&Partition> {
        unique_matching(self.partitions.iter(), |p| {
            p.filesystem.mount_point.as_deref() == Some("/boot")
        })
    }

    /// True when a distinct partition is mounted at `/boot` (so paths are not
    /// shared with the root Btrfs volume).
    pub fn has_separate_boot(&self) -> bool {
        self.boot().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs(mount_point: &str, fs_type: &str) -> Filesystem {
        Filesystem {
            mount_point: Some(mount_point.to_string()),
            fs_type: Some(fs_type.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn esp_requires_unique_match() {
        let esp_partition = Partition {
            name: "sda1".into(),
            partition_type_code: Some("0xEF".into()),
            partition_type_guid: None,
            filesystem: fs("/boot/efi", "vfat"),
        };
        let root_partition = Partition {
            name: "sda2".into(),
            partition_type_code: None,
            partition_type_guid: None,
            filesystem: fs("/", "btrfs"),
        };

        let table = PartitionTable {
            uuid: Uuid::nil(),
            table_type: PartitionTableType::Gpt,
            partitions: vec![esp_partition.clone(), root_partition.clone()],
        };

        assert_eq!(table.esp(), Some(&esp_partition));
        assert_eq!(table.root(), Some(&root_partition));
        assert_eq!(table.boot(), None);

        let mut two_esps = table.clone();
        two_esps.partitions.push(esp_partition);
        assert_eq!(two_esps.esp(), None);
    }
}
