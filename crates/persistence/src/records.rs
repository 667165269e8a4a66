use std::time::SystemTime;

use semver::Version;
use serde::{Deserialize, Serialize};

use refind_btrfs_boot::BootConfig;
use refind_btrfs_common::config::{BootStanzaGeneration, PackageConfig};
use refind_btrfs_device::Subvolume;

/// The implementation's current record version. Reads discard a stored
/// record whose version is older than this.
pub fn current_version() -> Version {
    Version::new(1, 0, 0)
}

/// A versioned wrapper persisted for every record, carrying the writer's
/// record-format version and the source file's mtime (when the record mirrors
/// a file) for cache-invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: Version,
    #[serde(with = "mtime_serde")]
    pub source_mtime: Option<SystemTime>,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn new(value: T, source_mtime: Option<SystemTime>) -> Self {
        Versioned {
            version: current_version(),
            source_mtime,
            value,
        }
    }

    /// A stored record is usable iff its version is not older than the
    /// implementation's current version, and, when `current_mtime` is given,
    /// the source file has not changed since the record was written.
    pub fn is_fresh(&self, current_mtime: Option<SystemTime>) -> bool {
        if self.version < current_version() {
            return false;
        }
        match (self.source_mtime, current_mtime) {
            (Some(stored), Some(current)) => stored == current,
            (None, None) => true,
            _ => false,
        }
    }
}

mod mtime_serde {
    use std::time::SystemTime;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos = value.map(|t| {
            t.duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        });
        nanos.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos: Option<u64> = Option::deserialize(deserializer)?;
        Ok(nanos.map(|n| SystemTime::UNIX_EPOCH + std::time::Duration::from_nanos(n)))
    }
}

/// Previous-run persistence: the snapshots promoted to bootable form and the
/// generation parameters used, for change detection on the next run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub bootable_snapshots: Vec<Subvolume>,
    pub last_boot_stanza_generation: Option<BootStanzaGeneration>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Store {
    pub package_config: Option<Versioned<PackageConfig>>,
    pub refind_configs: std::collections::BTreeMap<String, Versioned<BootConfig>>,
    pub processing_result: Option<Versioned<ProcessingResult>>,
}
