use std::path::{Path, PathBuf};

use refind_btrfs_boot::{
    append_includes, emit_entry, migrate_entry, BootEntry, BootOptions, MigrationContext,
};
use refind_btrfs_common::config::PackageConfig;
use refind_btrfs_common::constants::{
    DESTINATION_DIR_MODE, GENERATED_ICONS_DIR, GENERATED_STANZAS_DIR, LOGO_LIBRARY_DIR,
};
use refind_btrfs_common::errors::{RefindBtrfsError, Result};
use refind_btrfs_device::{
    LiveDeviceAdapter, PhysicalDeviceAdapter, StaticPartitionTable, Subvolume, SubvolumeAdapter,
};
use refind_btrfs_persistence::{Database, ProcessingResult, Versioned};

use crate::discovery::{discover_snapshots, fstab_path_for};

pub struct Engine<'a> {
    pub config: &'a PackageConfig,
    pub physical: &'a dyn PhysicalDeviceAdapter,
    pub live: &'a dyn LiveDeviceAdapter,
    pub subvolume: &'a dyn SubvolumeAdapter,
    pub db: &'a Database,
}

#[derive(Debug)]
pub enum RunOutcome {
    Applied { emitted: usize },
    Unchanged,
    Unsupported,
}

struct MatchedEntry {
    entry: BootEntry,
    config_path: PathBuf,
}

/// Whether `options.rootflags` identifies `root`, either directly on a
/// `menuentry` or on one of its `submenuentry` blocks.
fn rootflags_match(options: &BootOptions, root: &Subvolume) -> bool {
    options
        .rootflags
        .as_ref()
        .map(|m| m.matches(&root.logical_path, root.num_id))
        .unwrap_or(false)
}

impl<'a> Engine<'a> {
    pub fn run(&self) -> Result<RunOutcome> {
        let root_partition_table = self.initialize_block_devices()?;
        let root_filesystem = root_partition_table
            .root()
            .expect("guarded by initialize_block_devices")
            .filesystem
            .clone();

        let root = match self.initialize_root_subvolume(&root_filesystem)? {
            Some(outcome) => outcome,
            None => return Ok(RunOutcome::Unsupported),
        };

        let esp = root_partition_table
            .partitions
            .iter()
            .find(|p| p.filesystem.uuid == Some(self.config.esp_uuid))
            .ok_or_else(|| RefindBtrfsError::partition("configured ESP UUID not found on the selected device"))?;

        let matched = self.initialize_matched_boot_entries(esp.name.as_str(), &root)?;

        let Some((additions, removals, prepared)) =
            self.initialize_prepared_snapshots(&root)?
        else {
            return Ok(RunOutcome::Unchanged);
        };

        let pairs = self.combine(&matched, &prepared)?;

        let emitted = self.process_changes(&pairs, &root, root_partition_table.has_separate_boot())?;

        self.persist(&prepared, &removals, &additions)?;

        Ok(RunOutcome::Applied { emitted })
    }

    fn initialize_block_devices(&self) -> Result<refind_btrfs_device::PartitionTable> {
        let tables = self.physical.partition_tables()?;
        let live_filesystems = self.live.mounted_filesystems()?;

        let mut table = tables
            .into_iter()
            .find(|t| {
                t.root().is_some()
                    && t.partitions
                        .iter()
                        .any(|p| p.filesystem.uuid == Some(self.config.esp_uuid))
            })
            .ok_or_else(|| {
                RefindBtrfsError::partition("no device holds both the configured ESP and a root partition")
            })?;

        for partition in table.partitions.iter_mut() {
            if let Some(live) = live_filesystems
                .iter()
                .find(|f| f.mount_point == partition.filesystem.mount_point && f.mount_point.is_some())
            {
                partition.filesystem.mount_options = live.mount_options.clone();
            }
        }

        let root = table
            .root()
            .ok_or_else(|| RefindBtrfsError::partition("no unique root partition"))?;
        if !root.filesystem.is_btrfs() {
            return Err(RefindBtrfsError::partition("root partition is not btrfs"));
        }

        Ok(table)
    }

    fn initialize_root_subvolume(
        &self,
        root_filesystem: &refind_btrfs_device::Filesystem,
    ) -> Result<Option<Subvolume>> {
        let mount_point = root_filesystem
            .mount_point
            .as_deref()
            .ok_or_else(|| RefindBtrfsError::subvolume("root filesystem has no mount point"))?;

        let root = self
            .subvolume
            .get(Path::new(mount_point))?
            .ok_or_else(|| RefindBtrfsError::subvolume("root mount has no subvolume"))?;

        if root.is_snapshot() && self.config.exit_if_root_is_snapshot {
            log::warn!("root subvolume is itself a snapshot; exiting as configured");
            return Ok(None);
        }

        let snapshots =
            discover_snapshots(&self.config.snapshot_search, &root, self.subvolume)?;
        if snapshots.is_empty() {
            return Err(RefindBtrfsError::subvolume(
                "root subvolume has no discoverable snapshots",
            ));
        }

        Ok(Some(root.builder().with_snapshots(snapshots).build()))
    }

    fn initialize_matched_boot_entries(
        &self,
        esp_name: &str,
        root: &Subvolume,
    ) -> Result<Vec<MatchedEntry>> {
        let boot_config_path = Path::new(&self.config.boot_stanza_generation.refind_config)
            .to_path_buf();
        let config_tree = self.db.load_boot_config(&boot_config_path)?;

        let mut seen = std::collections::HashSet::new();
        let mut matched = Vec::new();

        for entry in config_tree.source_entries(GENERATED_STANZAS_DIR) {
            if entry.volume.as_deref() != Some(esp_name) {
                continue;
            }

            let matches_root = rootflags_match(&entry.boot_options, root)
                || entry
                    .sub_entries
                    .iter()
                    .any(|sub| rootflags_match(&sub.boot_options, root));

            if !matches_root {
                continue;
            }

            if !seen.insert(entry.identity()) {
                return Err(RefindBtrfsError::refind_config(
                    &boot_config_path,
                    "duplicate (volume, loader_path) among matched boot entries",
                ));
            }

            matched.push(MatchedEntry {
                entry: entry.clone(),
                config_path: boot_config_path.clone(),
            });
        }

        if matched.is_empty() {
            return Err(RefindBtrfsError::refind_config(
                &boot_config_path,
                "no boot entry matches the root subvolume",
            ));
        }
        if !matched.iter().any(|m| m.entry.is_usable_for_snapshots()) {
            return Err(RefindBtrfsError::refind_config(
                &boot_config_path,
                "no matched boot entry is usable for snapshots",
            ));
        }

        Ok(matched)
    }

    /// Returns `None` when the run is a no-op (`UnchangedConfiguration`).
    fn initialize_prepared_snapshots(
        &self,
        root: &Subvolume,
    ) -> Result<Option<(Vec<Subvolume>, Vec<Subvolume>, Vec<Subvolume>)>> {
        let store = self.db.load()?;
        let previous = store
            .processing_result
            .map(|v| v.value)
            .unwrap_or_default();

        let snapshots = root.snapshots.clone().unwrap_or_default();
        let mut sorted = snapshots;
        sorted.sort_by(|a, b| b.time_created.cmp(&a.time_created));
        let selected = self.config.snapshot_manipulation.selection_count.take(sorted);

        let exclusion = &self.config.snapshot_manipulation.cleanup_exclusion;

        let additions: Vec<Subvolume> = selected
            .iter()
            .filter(|sigma| {
                !previous.bootable_snapshots.iter().any(|beta| {
                    beta.created_from
                        .as_deref()
                        .map(|source| source.uuid == sigma.uuid)
                        .unwrap_or(beta.uuid == sigma.uuid)
                })
            })
            .cloned()
            .collect();

        let selected_and_excluded_uuids: std::collections::HashSet<_> = selected
            .iter()
            .map(|s| s.uuid)
            .chain(exclusion.iter().copied())
            .collect();

        let removals: Vec<Subvolume> = previous
            .bootable_snapshots
            .iter()
            .filter(|beta| {
                let in_keep_set = selected_and_excluded_uuids.contains(&beta.uuid)
                    || beta
                        .created_from
                        .as_deref()
                        .map(|source| selected_and_excluded_uuids.contains(&source.uuid))
                        .unwrap_or(false);
                !in_keep_set
            })
            .cloned()
            .collect();

        let generation_unchanged = Some(self.config.boot_stanza_generation.clone())
            == previous.last_boot_stanza_generation;

        let nothing_to_do = additions.is_empty() && removals.is_empty() && generation_unchanged;

        if nothing_to_do && self.config.exit_if_no_changes_are_detected {
            return Ok(None);
        }

        let mut prepared = Vec::new();
        for addition in &additions {
            match self.promote(addition) {
                Ok(bootable) => prepared.push(bootable),
                Err(e) => log::warn!("dropping snapshot addition '{}': {e}", addition.logical_path),
            }
        }

        for removal in &removals {
            if removal.is_freshly_created() {
                if let Err(e) = self.subvolume.delete(removal) {
                    log::warn!("failed to delete stale bootable snapshot: {e}");
                }
            }
        }

        let unaffected: Vec<Subvolume> = previous
            .bootable_snapshots
            .into_iter()
            .filter(|beta| !removals.iter().any(|r| r.uuid == beta.uuid))
            .collect();

        let mut all_bootable = unaffected;
        all_bootable.extend(prepared.clone());

        Ok(Some((additions, removals, all_bootable)))
    }

    fn promote(&self, sigma: &Subvolume) -> Result<Subvolume> {
        let bootable = if sigma.is_writable() {
            sigma.clone()
        } else if self.config.snapshot_manipulation.modify_read_only_flag {
            self.subvolume
                .bootable(sigma, true, &sigma.filesystem_path)?
        } else {
            let destination_dir = &self.config.snapshot_manipulation.destination_dir;
            create_destination_dir(destination_dir)?;
            let destination = destination_dir.join(sigma.derived_clone_name());
            self.subvolume.bootable(sigma, false, &destination)?
        };

        let bootable = bootable.builder().with_created_from(sigma.clone()).build();

        let fstab_path = fstab_path_for(&bootable.filesystem_path);
        let table = StaticPartitionTable::read_from(&fstab_path)?;
        let root_mount = table
            .root_mount()
            .ok_or_else(|| RefindBtrfsError::partition("bootable snapshot's fstab has no '/' mount"))?;

        if !root_mount
            .options
            .matches(&sigma.logical_path, sigma.num_id)
        {
            return Err(RefindBtrfsError::partition(
                "bootable snapshot's fstab does not match its pre-migration identity",
            ));
        }

        let mut new_options = root_mount.options.clone();
        new_options.set(refind_btrfs_device::mount_options::SUBVOL, bootable.logical_path.clone());
        new_options.set(
            refind_btrfs_device::mount_options::SUBVOLID,
            bootable.num_id.to_string(),
        );

        let rewritten = table.with_root_options(new_options)?;
        rewritten.write_to(&fstab_path)?;

        Ok(bootable.builder().with_static_partition_table(
            rewritten.as_partition_table(uuid::Uuid::new_v4()),
        ).build())
    }

    fn combine(
        &self,
        matched: &[MatchedEntry],
        prepared: &[Subvolume],
    ) -> Result<Vec<(BootEntry, Subvolume, PathBuf)>> {
        let mut pairs = Vec::new();

        for matched_entry in matched {
            for snapshot in prepared {
                if self.snapshot_contains_referenced_files(&matched_entry.entry, snapshot) {
                    pairs.push((
                        matched_entry.entry.clone(),
                        snapshot.clone(),
                        matched_entry.config_path.clone(),
                    ));
                }
            }
        }

        if pairs.is_empty() {
            return Err(RefindBtrfsError::refind_config(
                Path::new(""),
                "no (entry, snapshot) pair survived file-existence checks",
            ));
        }

        Ok(pairs)
    }

    fn snapshot_contains_referenced_files(&self, entry: &BootEntry, snapshot: &Subvolume) -> bool {
        [&entry.loader_path, &entry.initrd_path]
            .into_iter()
            .flatten()
            .all(|relative| snapshot.filesystem_path.join(relative.trim_start_matches('/')).exists())
    }

    fn process_changes(
        &self,
        pairs: &[(BootEntry, Subvolume, PathBuf)],
        root: &Subvolume,
        has_separate_boot: bool,
    ) -> Result<usize> {
        let generation = &self.config.boot_stanza_generation;
        let boot_config_dir = pairs
            .first()
            .and_then(|(_, _, p)| p.parent())
            .unwrap_or_else(|| Path::new("."));
        let generated_dir = boot_config_dir.join(GENERATED_STANZAS_DIR);
        let icons_output_dir = generated_dir.join(GENERATED_ICONS_DIR);
        let logo_library_dir = Path::new(LOGO_LIBRARY_DIR);

        let mut emitted_paths = Vec::new();
        let latest_uuid = pairs.iter().map(|(_, s, _)| s).max().map(|s| s.uuid);

        for (entry, snapshot, main_config_path) in pairs {
            let ctx = MigrationContext {
                live: root,
                include_paths: generation.include_paths,
                include_sub_menus: generation.include_sub_menus,
                has_separate_boot,
                is_latest: latest_uuid == Some(snapshot.uuid),
                icon: &generation.icon,
                logo_library_dir,
                icons_output_dir: &icons_output_dir,
                boot_config_dir,
            };

            match migrate_entry(entry, snapshot, &ctx) {
                Ok(migrated) => match emit_entry(&migrated, &generated_dir) {
                    Ok(path) => emitted_paths.push((main_config_path.clone(), path)),
                    Err(e) => log::warn!("failed to emit migrated entry: {e}"),
                },
                Err(e) => log::warn!("dropping (entry,snapshot) pair: {e}"),
            }
        }

        let mut by_main_config: std::collections::BTreeMap<PathBuf, Vec<PathBuf>> =
            std::collections::BTreeMap::new();
        for (main_config, emitted) in &emitted_paths {
            by_main_config
                .entry(main_config.clone())
                .or_default()
                .push(emitted.clone());
        }

        for (main_config_path, emitted) in &by_main_config {
            append_includes(main_config_path, emitted)?;
        }

        Ok(emitted_paths.len())
    }

    fn persist(
        &self,
        bootable_snapshots: &[Subvolume],
        _removals: &[Subvolume],
        _additions: &[Subvolume],
    ) -> Result<()> {
        let result = ProcessingResult {
            bootable_snapshots: bootable_snapshots.to_vec(),
            last_boot_stanza_generation: Some(self.config.boot_stanza_generation.clone()),
        };

        self.db.update(|store| {
            store.processing_result = Some(Versioned::new(result, None));
        })
    }
}

/// Creates the bootable-snapshot destination directory with `0750` permissions
/// if it doesn't already exist, matching the package's clone-mode manipulation.
fn create_destination_dir(path: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    if path.exists() {
        return Ok(());
    }

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(DESTINATION_DIR_MODE)
        .create(path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{Local, TimeZone};
    use uuid::Uuid;

    use refind_btrfs_common::config::{
        BootStanzaGeneration, Icon, PackageConfig, SelectionCount, SnapshotManipulation,
        SnapshotSearch,
    };
    use refind_btrfs_device::{Filesystem, Partition, PartitionTable, PartitionTableType};

    use super::*;

    /// Stands in for the real `btrfs subvolume snapshot` clone: copies the
    /// source tree so the cloned fstab is present at the new location.
    fn copy_dir_recursive(src: &Path, dst: &Path) {
        std::fs::create_dir_all(dst).unwrap();
        for entry in std::fs::read_dir(src).unwrap() {
            let entry = entry.unwrap();
            let dest_path = dst.join(entry.file_name());
            if entry.file_type().unwrap().is_dir() {
                copy_dir_recursive(&entry.path(), &dest_path);
            } else {
                std::fs::copy(entry.path(), &dest_path).unwrap();
            }
        }
    }

    struct FixturePhysical {
        table: PartitionTable,
    }

    impl PhysicalDeviceAdapter for FixturePhysical {
        fn partition_tables(&self) -> Result<Vec<PartitionTable>> {
            Ok(vec![self.table.clone()])
        }
    }

    struct FixtureLive;

    impl LiveDeviceAdapter for FixtureLive {
        fn mounted_filesystems(&self) -> Result<Vec<Filesystem>> {
            Ok(Vec::new())
        }
    }

    struct FixtureSubvolume {
        by_path: HashMap<PathBuf, Subvolume>,
        deleted: Mutex<Vec<Uuid>>,
    }

    impl SubvolumeAdapter for FixtureSubvolume {
        fn get(&self, path: &Path) -> Result<Option<Subvolume>> {
            Ok(self.by_path.get(path).cloned())
        }

        fn snapshots_of(&self, _subvolume: &Subvolume) -> Result<Vec<Subvolume>> {
            Ok(Vec::new())
        }

        fn bootable(&self, subvolume: &Subvolume, in_place: bool, destination: &Path) -> Result<Subvolume> {
            let mut clone = subvolume.clone();
            clone.is_read_only = false;
            if !in_place {
                clone.filesystem_path = destination.to_path_buf();
                copy_dir_recursive(&subvolume.filesystem_path, destination);
            }
            Ok(clone)
        }

        fn delete(&self, subvolume: &Subvolume) -> Result<()> {
            self.deleted.lock().unwrap().push(subvolume.uuid);
            Ok(())
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        config: PackageConfig,
        physical: FixturePhysical,
        live: FixtureLive,
        subvolume: FixtureSubvolume,
        db: Database,
    }

    fn subvol(uuid: Uuid, parent_uuid: Uuid, logical_path: &str, num_id: u64, path: &Path) -> Subvolume {
        Subvolume {
            filesystem_path: path.to_path_buf(),
            logical_path: logical_path.to_string(),
            time_created: Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            uuid,
            parent_uuid,
            num_id,
            parent_num_id: 5,
            is_read_only: true,
            created_from: None,
            static_partition_table: None,
            snapshots: None,
        }
    }

    /// A root subvolume `@` (num_id 256) and one matched boot entry in
    /// `refind.conf` for it. `good_dir` under `snapshots/` carries a valid
    /// `etc/fstab` plus the loader/initrd files the entry references. When
    /// `include_bad` is set, a second candidate missing `etc/fstab` entirely
    /// is added so `Engine::promote` must drop it without failing the run.
    const MATCH_ON_MENU_ENTRY: &str = concat!(
        "menuentry \"Arch Linux\" {\n",
        "    volume \"ESP\"\n",
        "    loader /vmlinuz-linux\n",
        "    initrd /initramfs-linux.img\n",
        "    options \"root=PARTUUID=deadbeef rootflags=subvol=@,subvolid=256 rw quiet\"\n",
        "}\n",
    );

    fn build_fixture(include_bad: bool) -> Fixture {
        build_fixture_with_refind_conf(include_bad, MATCH_ON_MENU_ENTRY)
    }

    fn build_fixture_with_refind_conf(include_bad: bool, refind_conf_contents: &str) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let root_dir = tmp.path().join("root");
        let snapshots_dir = tmp.path().join("snapshots");
        let good_dir = snapshots_dir.join("good");
        let bad_dir = snapshots_dir.join("bad");
        let destination_dir = tmp.path().join("bootable");
        let refind_config = tmp.path().join("refind.conf");

        std::fs::create_dir_all(&root_dir).unwrap();
        std::fs::create_dir_all(&good_dir).unwrap();
        if include_bad {
            std::fs::create_dir_all(&bad_dir).unwrap();
        }

        std::fs::write(&refind_config, refind_conf_contents).unwrap();

        let root_uuid = Uuid::new_v4();
        let good_uuid = Uuid::new_v4();
        let esp_uuid = Uuid::new_v4();

        let root = subvol(root_uuid, Uuid::nil(), "@", 256, &root_dir);
        let good = subvol(good_uuid, root_uuid, "@snapshots/good", 257, &good_dir);

        std::fs::write(good_dir.join("vmlinuz-linux"), b"").unwrap();
        std::fs::write(good_dir.join("initramfs-linux.img"), b"").unwrap();
        std::fs::create_dir_all(good_dir.join("etc")).unwrap();
        std::fs::write(
            good_dir.join("etc").join("fstab"),
            "UUID=1111-2222 / btrfs rw,noatime,subvol=@snapshots/good,subvolid=257 0 0\n",
        )
        .unwrap();

        let mut by_path = HashMap::new();
        by_path.insert(Path::new("/").to_path_buf(), root);
        by_path.insert(good_dir.clone(), good);
        if include_bad {
            let bad_uuid = Uuid::new_v4();
            let bad = subvol(bad_uuid, root_uuid, "@snapshots/bad", 258, &bad_dir);
            by_path.insert(bad_dir.clone(), bad);
        }

        let table = PartitionTable {
            uuid: Uuid::new_v4(),
            table_type: PartitionTableType::Gpt,
            partitions: vec![
                Partition {
                    name: "ESP".to_string(),
                    partition_type_code: Some("0xEF".to_string()),
                    partition_type_guid: None,
                    filesystem: Filesystem {
                        uuid: Some(esp_uuid),
                        label: None,
                        fs_type: Some("vfat".to_string()),
                        mount_point: Some("/boot/efi".to_string()),
                        mount_options: None,
                        subvolume: None,
                    },
                },
                Partition {
                    name: "root1".to_string(),
                    partition_type_code: None,
                    partition_type_guid: None,
                    filesystem: Filesystem {
                        uuid: Some(Uuid::new_v4()),
                        label: None,
                        fs_type: Some("btrfs".to_string()),
                        mount_point: Some("/".to_string()),
                        mount_options: None,
                        subvolume: None,
                    },
                },
            ],
        };

        let config = PackageConfig {
            exit_if_root_is_snapshot: false,
            exit_if_no_changes_are_detected: true,
            esp_uuid,
            snapshot_search: vec![SnapshotSearch {
                dir: snapshots_dir,
                is_nested: false,
                max_depth: 1,
            }],
            snapshot_manipulation: SnapshotManipulation {
                selection_count: SelectionCount::Infinite,
                modify_read_only_flag: true,
                destination_dir,
                cleanup_exclusion: Default::default(),
            },
            boot_stanza_generation: BootStanzaGeneration {
                refind_config: refind_config.to_string_lossy().into_owned(),
                include_paths: true,
                include_sub_menus: true,
                icon: Icon::Default,
            },
        };

        let db = Database::new(tmp.path().join("state.json"));

        Fixture {
            _tmp: tmp,
            config,
            physical: FixturePhysical { table },
            live: FixtureLive,
            subvolume: FixtureSubvolume {
                by_path,
                deleted: Mutex::new(Vec::new()),
            },
            db,
        }
    }

    fn engine(fixture: &Fixture) -> Engine<'_> {
        Engine {
            config: &fixture.config,
            physical: &fixture.physical,
            live: &fixture.live,
            subvolume: &fixture.subvolume,
            db: &fixture.db,
        }
    }

    #[test]
    fn run_drops_the_snapshot_missing_an_fstab_and_emits_the_other() {
        let fixture = build_fixture(true);
        let outcome = engine(&fixture).run().unwrap();

        match outcome {
            RunOutcome::Applied { emitted } => assert_eq!(emitted, 1),
            other => panic!("expected Applied, got {other:?}"),
        }

        let generated_dir = fixture
            .config
            .boot_stanza_generation
            .refind_config
            .clone();
        let generated_dir = Path::new(&generated_dir)
            .parent()
            .unwrap()
            .join(GENERATED_STANZAS_DIR);
        let emitted_files: Vec<_> = std::fs::read_dir(&generated_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(emitted_files.len(), 1);

        let main_config = std::fs::read_to_string(&fixture.config.boot_stanza_generation.refind_config).unwrap();
        assert!(main_config.contains("include \"boot_stanzas/"));
    }

    #[test]
    fn second_run_is_unchanged() {
        let fixture = build_fixture(false);
        let engine_ref = engine(&fixture);

        let first = engine_ref.run().unwrap();
        assert!(matches!(first, RunOutcome::Applied { .. }));

        let second = engine_ref.run().unwrap();
        assert!(matches!(second, RunOutcome::Unchanged));
        assert!(fixture.subvolume.deleted.lock().unwrap().is_empty());
    }

    #[test]
    fn promote_clones_into_the_destination_dir_not_the_search_tree() {
        let mut fixture = build_fixture(false);
        fixture.config.snapshot_manipulation.modify_read_only_flag = false;
        let eng = engine(&fixture);

        let sigma = fixture
            .subvolume
            .by_path
            .values()
            .find(|s| s.logical_path == "@snapshots/good")
            .unwrap()
            .clone();

        let bootable = eng.promote(&sigma).unwrap();

        let destination_dir = &fixture.config.snapshot_manipulation.destination_dir;
        assert_eq!(
            bootable.filesystem_path,
            destination_dir.join(sigma.derived_clone_name())
        );
        assert!(!bootable
            .filesystem_path
            .starts_with(&fixture.config.snapshot_search[0].dir));
    }

    #[test]
    fn matches_an_entry_whose_root_identity_lives_only_in_a_sub_entry() {
        const MATCH_ON_SUB_ENTRY: &str = concat!(
            "menuentry \"Arch Linux\" {\n",
            "    volume \"ESP\"\n",
            "    loader /vmlinuz-linux\n",
            "    initrd /initramfs-linux.img\n",
            "    submenuentry \"Boot\" {\n",
            "        options \"root=PARTUUID=deadbeef rootflags=subvol=@,subvolid=256 rw quiet\"\n",
            "    }\n",
            "}\n",
        );

        let fixture = build_fixture_with_refind_conf(false, MATCH_ON_SUB_ENTRY);
        let outcome = engine(&fixture).run().unwrap();

        assert!(matches!(outcome, RunOutcome::Applied { emitted: 1 }));
    }
}
