use std::fs;
use std::path::Path;

use crate::config::PackageConfig;
use crate::errors::{RefindBtrfsError, Result};

/// Loads and validates a [`PackageConfig`] from a TOML file on disk.
///
/// Unknown keys are rejected by `#[serde(deny_unknown_fields)]` on the target
/// structs; cross-field invariants are checked afterwards via
/// [`PackageConfig::validate`].
pub fn load(path: &Path) -> Result<PackageConfig> {
    let contents = fs::read_to_string(path).map_err(|e| RefindBtrfsError::PackageConfigError {
        message: format!("could not read '{}': {}", path.display(), e),
    })?;

    parse(&contents)
}

pub fn parse(contents: &str) -> Result<PackageConfig> {
    let config: PackageConfig =
        toml::from_str(contents).map_err(|e| RefindBtrfsError::PackageConfigError {
            message: e.to_string(),
        })?;

    config
        .validate()
        .map_err(|message| RefindBtrfsError::PackageConfigError { message })?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
exit_if_root_is_snapshot = false
exit_if_no_changes_are_detected = true
esp_uuid = "0e3d5c56-1234-4321-9abc-0123456789ab"

[[snapshot-search]]
dir = "/.snapshots"
is_nested = false
max_depth = 2

[snapshot-manipulation]
selection_count = 5
modify_read_only_flag = false
destination_dir = "/.bootable_snapshots"
cleanup_exclusion = []

[boot-stanza-generation]
refind_config = "refind.conf"
include_paths = true
include_sub_menus = true

[boot-stanza-generation.icon]
mode = "default"
"#;

    #[test]
    fn parses_valid_config() {
        let config = parse(VALID).expect("should parse");
        assert_eq!(config.snapshot_search.len(), 1);
        assert_eq!(config.boot_stanza_generation.refind_config, "refind.conf");
    }

    #[test]
    fn rejects_unknown_fields() {
        let bad = VALID.replace(
            "exit_if_root_is_snapshot = false",
            "exit_if_root_is_snapshot = false\nbogus_field = true",
        );
        assert!(parse(&bad).is_err());
    }

    #[test]
    fn rejects_nested_search_and_destination() {
        let bad = VALID.replace(
            "destination_dir = \"/.bootable_snapshots\"",
            "destination_dir = \"/.snapshots/bootable\"",
        );
        assert!(parse(&bad).is_err());
    }

    #[test]
    fn infinite_selection_count() {
        let config = VALID.replace("selection_count = 5", "selection_count = \"inf\"");
        let config = parse(&config).expect("should parse");
        assert_eq!(
            config.snapshot_manipulation.selection_count,
            crate::config::SelectionCount::Infinite
        );
    }
}
