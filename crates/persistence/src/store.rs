use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use refind_btrfs_boot::{parse_file, BootConfig};
use refind_btrfs_common::config::PackageConfig;
use refind_btrfs_common::config_loader;
use refind_btrfs_common::errors::Result;

use crate::records::{Store, Versioned};

/// The persistence file: a single JSON document opened per-operation
/// (open-write-close) so readers and the daemon never hold it open.
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Database { path: path.into() }
    }

    pub fn load(&self) -> Result<Store> {
        if !self.path.exists() {
            return Ok(Store::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Store::default());
        }

        serde_json::from_str(&contents).or_else(|e| {
            log::warn!(
                "discarding unreadable persistence file {}: {e}",
                self.path.display()
            );
            Ok(Store::default())
        })
    }

    /// Writes `store` atomically: sibling temp file, then rename.
    pub fn save(&self, store: &Store) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let contents = serde_json::to_string_pretty(store)
            .map_err(|e| refind_btrfs_common::errors::RefindBtrfsError::refind_config(
                &self.path,
                format!("failed to serialize persistence store: {e}"),
            ))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| {
            refind_btrfs_common::errors::RefindBtrfsError::refind_config(&self.path, e.to_string())
        })?;

        Ok(())
    }

    /// Reads, applies `mutate`, and writes back in one open-write-close cycle.
    pub fn update(&self, mutate: impl FnOnce(&mut Store)) -> Result<()> {
        let mut store = self.load()?;
        mutate(&mut store);
        self.save(&store)
    }

    /// Loads the package config at `path`, serving the cached record when its
    /// source mtime matches the file's current one.
    pub fn load_config(&self, path: &Path) -> Result<PackageConfig> {
        let mtime = fs::metadata(path).and_then(|m| m.modified()).ok();

        if let Some(cached) = &self.load()?.package_config {
            if cached.is_fresh(mtime) {
                return Ok(cached.value.clone());
            }
        }

        let config = config_loader::load(path)?;
        self.update(|store| {
            store.package_config = Some(Versioned::new(config.clone(), mtime));
        })?;
        Ok(config)
    }

    /// Loads and parses the boot-loader config tree rooted at `path`, keyed
    /// by its resolved path, serving the cached record when its source
    /// mtime matches the file's current one.
    pub fn load_boot_config(&self, path: &Path) -> Result<BootConfig> {
        let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let key = resolved.to_string_lossy().into_owned();
        let mtime = fs::metadata(&resolved).and_then(|m| m.modified()).ok();

        if let Some(cached) = self.load()?.refind_configs.get(&key) {
            if cached.is_fresh(mtime) {
                return Ok(cached.value.clone());
            }
        }

        let config = parse_file(&resolved)?;
        self.update(|store| {
            store
                .refind_configs
                .insert(key, Versioned::new(config.clone(), mtime));
        })?;
        Ok(config)
    }
}
