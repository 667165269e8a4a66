use std::process::Command;

use serde::Deserialize;
use uuid::Uuid;

use refind_btrfs_common::errors::{RefindBtrfsError, Result};

use super::PhysicalDeviceAdapter;
use crate::filesystem::Filesystem;
use crate::partition::{Partition, PartitionTable, PartitionTableType};

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    name: String,
    #[serde(default)]
    pttype: Option<String>,
    #[serde(default)]
    ptuuid: Option<String>,
    #[serde(default)]
    parttype: Option<String>,
    #[serde(default)]
    fstype: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    mountpoint: Option<String>,
    #[serde(default)]
    children: Vec<LsblkDevice>,
}

/// Default [`PhysicalDeviceAdapter`] that shells out to `lsblk -J -O`,
/// mirroring the teacher's pattern of parsing a CLI tool's JSON output
/// instead of binding to its native library.
pub struct CliPhysicalDeviceAdapter;

impl CliPhysicalDeviceAdapter {
    pub fn new() -> Self {
        CliPhysicalDeviceAdapter
    }

    fn run(&self) -> Result<LsblkOutput> {
        let output = Command::new("lsblk")
            .args(["-J", "-O"])
            .output()
            .map_err(|e| RefindBtrfsError::partition(format!("failed to run lsblk: {e}")))?;

        if !output.status.success() {
            return Err(RefindBtrfsError::partition(format!(
                "lsblk exited with {}",
                output.status
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| RefindBtrfsError::partition(format!("failed to parse lsblk output: {e}")))
    }
}

impl Default for CliPhysicalDeviceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn partition_type(parttype: &Option<String>) -> (Option<String>, Option<String>) {
    match parttype {
        Some(t) if t.contains('-') => (None, Some(t.clone())),
        Some(t) => (Some(t.clone()), None),
        None => (None, None),
    }
}

fn to_partition(device: &LsblkDevice) -> Partition {
    let (partition_type_code, partition_type_guid) = partition_type(&device.parttype);

    Partition {
        name: device.name.clone(),
        partition_type_code,
        partition_type_guid,
        filesystem: Filesystem {
            uuid: device.uuid.as_deref().and_then(|u| Uuid::parse_str(u).ok()),
            label: device.label.clone(),
            fs_type: device.fstype.clone(),
            mount_point: device.mountpoint.clone(),
            mount_options: None,
            subvolume: None,
        },
    }
}

impl PhysicalDeviceAdapter for CliPhysicalDeviceAdapter {
    fn partition_tables(&self) -> Result<Vec<PartitionTable>> {
        let parsed = self.run()?;
        let mut tables = Vec::new();

        for disk in &parsed.blockdevices {
            let Some(pttype) = &disk.pttype else {
                continue;
            };
            if pttype != "gpt" {
                continue;
            }

            let table_uuid = disk
                .ptuuid
                .as_deref()
                .and_then(|u| Uuid::parse_str(u).ok())
                .unwrap_or_else(Uuid::nil);

            let partitions = disk.children.iter().map(to_partition).collect();

            tables.push(PartitionTable {
                uuid: table_uuid,
                table_type: PartitionTableType::Gpt,
                partitions,
            });
        }

        Ok(tables)
    }
}
