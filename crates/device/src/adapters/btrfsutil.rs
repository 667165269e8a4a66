use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use uuid::Uuid;

use refind_btrfs_common::errors::{RefindBtrfsError, Result};

use super::SubvolumeAdapter;
use crate::subvolume::Subvolume;

/// Default [`SubvolumeAdapter`] that shells out to the `btrfs` CLI, standing
/// in for `libbtrfsutil` FFI bindings.
pub struct CliSubvolumeAdapter;

impl CliSubvolumeAdapter {
    pub fn new() -> Self {
        CliSubvolumeAdapter
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("btrfs")
            .args(args)
            .output()
            .map_err(|e| RefindBtrfsError::subvolume(format!("failed to run btrfs: {e}")))?;

        if !output.status.success() {
            return Err(RefindBtrfsError::subvolume(format!(
                "btrfs {} exited with {}",
                args.join(" "),
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn show(&self, path: &Path) -> Result<Option<HashMap<String, String>>> {
        let args = ["subvolume", "show", path.to_str().unwrap_or_default()];
        let output = Command::new("btrfs")
            .args(args)
            .output()
            .map_err(|e| RefindBtrfsError::subvolume(format!("failed to run btrfs: {e}")))?;

        if !output.status.success() {
            return Ok(None);
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(Some(parse_show_fields(&text)))
    }
}

impl Default for CliSubvolumeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_show_fields(text: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();

    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let value = value.trim();
            if !key.is_empty() && !value.is_empty() {
                fields.insert(key.to_string(), value.to_string());
            }
        }
    }

    fields
}

fn parse_time(raw: &str) -> DateTime<Local> {
    let trimmed = raw.rsplit_once(' ').map(|(d, _)| d).unwrap_or(raw);
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).single())
        .unwrap_or_else(Local::now)
}

fn parse_uuid(raw: &str) -> Uuid {
    if raw == "-" {
        Uuid::nil()
    } else {
        Uuid::parse_str(raw).unwrap_or_else(|_| Uuid::nil())
    }
}

fn to_subvolume(path: &Path, fields: &HashMap<String, String>) -> Result<Subvolume> {
    let get = |key: &str| {
        fields
            .get(key)
            .ok_or_else(|| RefindBtrfsError::subvolume(format!("missing '{key}' in btrfs output")))
    };

    let num_id: u64 = get("Subvolume ID")?
        .parse()
        .map_err(|_| RefindBtrfsError::subvolume("malformed Subvolume ID"))?;
    let parent_num_id: u64 = get("Parent ID")?
        .parse()
        .map_err(|_| RefindBtrfsError::subvolume("malformed Parent ID"))?;
    let flags = fields.get("Flags").map(String::as_str).unwrap_or("");

    Ok(Subvolume {
        filesystem_path: path.to_path_buf(),
        logical_path: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        time_created: parse_time(get("Creation time")?),
        uuid: parse_uuid(get("UUID")?),
        parent_uuid: parse_uuid(get("Parent UUID")?),
        num_id,
        parent_num_id,
        is_read_only: flags.contains("readonly"),
        created_from: None,
        static_partition_table: None,
        snapshots: None,
    })
}

impl SubvolumeAdapter for CliSubvolumeAdapter {
    fn get(&self, path: &Path) -> Result<Option<Subvolume>> {
        match self.show(path)? {
            Some(fields) => to_subvolume(path, &fields).map(Some),
            None => Ok(None),
        }
    }

    fn snapshots_of(&self, subvolume: &Subvolume) -> Result<Vec<Subvolume>> {
        let root = subvolume
            .filesystem_path
            .parent()
            .unwrap_or(&subvolume.filesystem_path);

        let output = self.run(&[
            "subvolume",
            "list",
            "-o",
            "-u",
            root.to_str().unwrap_or_default(),
        ])?;

        let mut snapshots = Vec::new();

        for line in output.lines() {
            let Some(path_field) = line.split("path ").nth(1) else {
                continue;
            };
            let candidate = PathBuf::from(path_field.trim());
            if let Some(fields) = self.show(&candidate)? {
                let candidate_subvolume = to_subvolume(&candidate, &fields)?;
                if candidate_subvolume.parent_uuid == subvolume.uuid {
                    snapshots.push(candidate_subvolume);
                }
            }
        }

        Ok(snapshots)
    }

    fn bootable(&self, subvolume: &Subvolume, in_place: bool, destination: &Path) -> Result<Subvolume> {
        let path_str = subvolume
            .filesystem_path
            .to_str()
            .ok_or_else(|| RefindBtrfsError::subvolume("non-UTF8 subvolume path"))?;

        if in_place {
            self.run(&["property", "set", "-ts", path_str, "ro", "false"])?;
            self.get(&subvolume.filesystem_path)?.ok_or_else(|| {
                RefindBtrfsError::subvolume("subvolume vanished after promotion")
            })
        } else {
            let destination_str = destination
                .to_str()
                .ok_or_else(|| RefindBtrfsError::subvolume("non-UTF8 destination path"))?;

            self.run(&["subvolume", "snapshot", path_str, destination_str])?;
            self.get(destination)?
                .ok_or_else(|| RefindBtrfsError::subvolume("clone vanished after snapshot"))
        }
    }

    fn delete(&self, subvolume: &Subvolume) -> Result<()> {
        let path_str = subvolume
            .filesystem_path
            .to_str()
            .ok_or_else(|| RefindBtrfsError::subvolume("non-UTF8 subvolume path"))?;

        self.run(&["subvolume", "delete", path_str])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
@snapshot\n\
\tName: \t\t\t@snapshot\n\
\tUUID: \t\t\t11111111-1111-1111-1111-111111111111\n\
\tParent UUID: \t\t22222222-2222-2222-2222-222222222222\n\
\tCreation time: \t\t2023-06-15 10:30:00 +0000\n\
\tSubvolume ID: \t\t256\n\
\tParent ID: \t\t5\n\
\tFlags: \t\t\treadonly\n";

    #[test]
    fn parses_show_output() {
        let fields = parse_show_fields(SAMPLE);
        let subvolume = to_subvolume(Path::new("/mnt/@snapshot"), &fields).unwrap();

        assert_eq!(subvolume.num_id, 256);
        assert!(subvolume.is_read_only);
        assert!(subvolume.is_snapshot());
    }
}
