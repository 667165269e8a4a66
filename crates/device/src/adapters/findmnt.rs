use std::process::Command;

use serde::Deserialize;
use uuid::Uuid;

use refind_btrfs_common::errors::{RefindBtrfsError, Result};

use super::LiveDeviceAdapter;
use crate::filesystem::Filesystem;
use crate::mount_options::MountOptions;

#[derive(Debug, Deserialize)]
struct FindmntOutput {
    filesystems: Vec<FindmntEntry>,
}

#[derive(Debug, Deserialize)]
struct FindmntEntry {
    target: String,
    #[serde(default)]
    fstype: Option<String>,
    #[serde(default)]
    options: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

/// Default [`LiveDeviceAdapter`] that shells out to `findmnt -J`.
pub struct CliLiveDeviceAdapter;

impl CliLiveDeviceAdapter {
    pub fn new() -> Self {
        CliLiveDeviceAdapter
    }
}

impl Default for CliLiveDeviceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveDeviceAdapter for CliLiveDeviceAdapter {
    fn mounted_filesystems(&self) -> Result<Vec<Filesystem>> {
        let output = Command::new("findmnt")
            .arg("-J")
            .output()
            .map_err(|e| RefindBtrfsError::partition(format!("failed to run findmnt: {e}")))?;

        if !output.status.success() {
            return Err(RefindBtrfsError::partition(format!(
                "findmnt exited with {}",
                output.status
            )));
        }

        let parsed: FindmntOutput = serde_json::from_slice(&output.stdout).map_err(|e| {
            RefindBtrfsError::partition(format!("failed to parse findmnt output: {e}"))
        })?;

        parsed
            .filesystems
            .into_iter()
            .map(|entry| {
                let mount_options = match entry.options {
                    Some(raw) => Some(
                        MountOptions::parse(&raw)
                            .map_err(|message| RefindBtrfsError::partition(message))?,
                    ),
                    None => None,
                };

                Ok(Filesystem {
                    uuid: entry.uuid.as_deref().and_then(|u| Uuid::parse_str(u).ok()),
                    label: entry.label,
                    fs_type: entry.fstype,
                    mount_point: Some(entry.target),
                    mount_options,
                    subvolume: None,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sample_findmnt_json() {
        let sample = r#"{
            "filesystems": [
                {"target": "/", "fstype": "btrfs", "options": "rw,noatime,subvol=/@,subvolid=256"}
            ]
        }"#;

        let parsed: FindmntOutput = serde_json::from_str(sample).unwrap();
        assert_eq!(parsed.filesystems.len(), 1);
        assert_eq!(parsed.filesystems[0].target, "/");
    }
}
