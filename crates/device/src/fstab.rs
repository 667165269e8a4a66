use std::fs;
use std::io::Write;
use std::path::Path;

use refind_btrfs_common::errors::{RefindBtrfsError, Result};

use crate::filesystem::Filesystem;
use crate::mount_options::MountOptions;
use crate::partition::{Partition, PartitionTable, PartitionTableType};

/// One non-comment, non-blank line of an `/etc/fstab` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstabMount {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub options: MountOptions,
    pub dump: String,
    pub pass: String,
}

/// Formats a mount record as a fresh tab-separated fstab line, used only for
/// the one line [`StaticPartitionTable::with_root_options`] actually edits.
fn render_mount_line(mount: &FstabMount) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        mount.device, mount.mount_point, mount.fs_type, mount.options, mount.dump, mount.pass
    )
}

/// A single physical line of the file, either a parsed mount or verbatim text
/// (comment/blank line) kept so the file can be rewritten byte-for-byte except
/// for the one line being edited. A `Mount` line keeps its original source
/// text alongside the parsed fields, and renders from that text unless
/// [`StaticPartitionTable::with_root_options`] has replaced it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FstabLine {
    Verbatim(String),
    Mount { raw: String, mount: FstabMount },
}

/// The table reconstructed by parsing a specific filesystem's `/etc/fstab`,
/// as opposed to live `/proc/mounts` data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPartitionTable {
    lines: Vec<FstabLine>,
}

impl StaticPartitionTable {
    pub fn parse(contents: &str) -> Result<Self> {
        let mut lines = Vec::new();

        for raw in contents.lines() {
            let trimmed = raw.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                lines.push(FstabLine::Verbatim(raw.to_string()));
                continue;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() < 4 {
                lines.push(FstabLine::Verbatim(raw.to_string()));
                continue;
            }

            let options = MountOptions::parse(fields[3])
                .map_err(|message| RefindBtrfsError::partition(message))?;

            lines.push(FstabLine::Mount {
                raw: raw.to_string(),
                mount: FstabMount {
                    device: fields[0].to_string(),
                    mount_point: fields[1].to_string(),
                    fs_type: fields[2].to_string(),
                    options,
                    dump: fields.get(4).unwrap_or(&"0").to_string(),
                    pass: fields.get(5).unwrap_or(&"0").to_string(),
                },
            });
        }

        Ok(StaticPartitionTable { lines })
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn mounts(&self) -> impl Iterator<Item = &FstabMount> {
        self.lines.iter().filter_map(|l| match l {
            FstabLine::Mount { mount, .. } => Some(mount),
            FstabLine::Verbatim(_) => None,
        })
    }

    pub fn root_mount(&self) -> Option<&FstabMount> {
        self.mounts().find(|m| m.mount_point == "/")
    }

    /// Rewrites the `/` mount's options to `new_options`, leaving every other
    /// byte of the file untouched, and returns the new file contents.
    pub fn with_root_options(&self, new_options: MountOptions) -> Result<Self> {
        let mut found = false;
        let mut lines = self.lines.clone();

        for line in lines.iter_mut() {
            if let FstabLine::Mount { raw, mount } = line {
                if mount.mount_point == "/" {
                    mount.options = new_options.clone();
                    *raw = render_mount_line(mount);
                    found = true;
                    break;
                }
            }
        }

        if !found {
            return Err(RefindBtrfsError::partition(
                "fstab has no mount point for '/'",
            ));
        }

        Ok(StaticPartitionTable { lines })
    }

    /// Every line is emitted from its stored source text. Only a line that
    /// `with_root_options` has rewritten carries new text; every other line,
    /// mount or comment or blank, is reproduced byte-for-byte.
    pub fn render(&self) -> String {
        let mut out = String::new();

        for line in &self.lines {
            let raw = match line {
                FstabLine::Verbatim(raw) => raw,
                FstabLine::Mount { raw, .. } => raw,
            };
            out.push_str(raw);
            out.push('\n');
        }

        out
    }

    /// Atomically rewrites `path` with this table's contents: write to a
    /// sibling temp file, then rename over the original.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(self.render().as_bytes())?;
        tmp.persist(path)
            .map_err(|e| RefindBtrfsError::partition(e.to_string()))?;
        Ok(())
    }

    /// Builds a [`PartitionTable`] (type `fstab`) view over this file's mounts,
    /// used by phase-1 discovery consumers that want a uniform `PartitionTable`.
    pub fn as_partition_table(&self, table_uuid: uuid::Uuid) -> PartitionTable {
        let partitions = self
            .mounts()
            .enumerate()
            .map(|(i, m)| Partition {
                name: format!("fstab-{}", i),
                partition_type_code: None,
                partition_type_guid: None,
                filesystem: Filesystem {
                    uuid: None,
                    label: None,
                    fs_type: Some(m.fs_type.clone()),
                    mount_point: Some(m.mount_point.clone()),
                    mount_options: Some(m.options.clone()),
                    subvolume: None,
                },
            })
            .collect();

        PartitionTable {
            uuid: table_uuid,
            table_type: PartitionTableType::Fstab,
            partitions,
        }
    }
}
