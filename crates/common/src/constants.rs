pub const PACKAGE_NAME: &str = "refind-btrfs";

pub const DEFAULT_CONFIG_PATH: &str = "/etc/refind-btrfs.conf";
pub const PERSISTENCE_DIR: &str = "/var/lib/refind-btrfs";
pub const PID_FILE_NAME: &str = "refind-btrfs.pid";
pub const PERSISTENCE_FILE_NAME: &str = "refind-btrfs.db.json";

/// Name of the directory (created beside the main boot-loader config) into which
/// per-snapshot entry files are emitted.
pub const GENERATED_STANZAS_DIR: &str = "boot_stanzas";

pub const ESP_PARTITION_TYPE_CODE: &str = "0xEF";
pub const ESP_PARTITION_TYPE_GUID: &str = "c12a7328-f81f-11d2-ba4b-00a0c93ec93b";

/// Recursion-depth limit for the boot config `include` tree (see §4.1).
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// Mode the destination directory for promoted snapshots is created with.
pub const DESTINATION_DIR_MODE: u32 = 0o750;

/// Directory bundled with the package holding the built-in Btrfs logo PNGs,
/// named by [`crate::config::BtrfsLogoSpec::logo_filename`].
pub const LOGO_LIBRARY_DIR: &str = "/usr/share/refind-btrfs/logos";

/// Subdirectory of the generated-stanzas directory that composited icons are
/// written into (see §4.3 step 5 of the migration algorithm).
pub const GENERATED_ICONS_DIR: &str = "icons";
