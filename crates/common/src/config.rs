use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Either a finite positive selection bound or "take every snapshot".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionCount {
    Finite(u32),
    Infinite,
}

impl SelectionCount {
    pub fn take<T>(self, sorted_desc: Vec<T>) -> Vec<T> {
        match self {
            SelectionCount::Infinite => sorted_desc,
            SelectionCount::Finite(n) => {
                let n = n as usize;
                sorted_desc.into_iter().take(n).collect()
            }
        }
    }
}

impl<'de> Deserialize<'de> for SelectionCount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SelectionCountVisitor;

        impl<'de> Visitor<'de> for SelectionCountVisitor {
            type Value = SelectionCount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a positive integer or the string \"inf\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if v == "inf" {
                    Ok(SelectionCount::Infinite)
                } else {
                    Err(de::Error::invalid_value(de::Unexpected::Str(v), &self))
                }
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if v == 0 {
                    return Err(de::Error::invalid_value(de::Unexpected::Unsigned(v), &self));
                }
                Ok(SelectionCount::Finite(v as u32))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if v <= 0 {
                    return Err(de::Error::invalid_value(de::Unexpected::Signed(v), &self));
                }
                Ok(SelectionCount::Finite(v as u32))
            }
        }

        deserializer.deserialize_any(SelectionCountVisitor)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SnapshotSearch {
    pub dir: PathBuf,
    #[serde(default)]
    pub is_nested: bool,
    pub max_depth: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SnapshotManipulation {
    pub selection_count: SelectionCount,
    #[serde(default)]
    pub modify_read_only_flag: bool,
    pub destination_dir: PathBuf,
    #[serde(default)]
    pub cleanup_exclusion: HashSet<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BtrfsLogoVariant {
    Original,
    Inverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BtrfsLogoSize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BtrfsLogoSpec {
    pub variant: BtrfsLogoVariant,
    pub size: BtrfsLogoSize,
    pub horizontal_alignment: HorizontalAlignment,
    pub vertical_alignment: VerticalAlignment,
}

impl BtrfsLogoSpec {
    /// The filename of this logo within the bundled logo library directory.
    pub fn logo_filename(&self) -> String {
        let variant = match self.variant {
            BtrfsLogoVariant::Original => "original",
            BtrfsLogoVariant::Inverted => "inverted",
        };
        let size = match self.size {
            BtrfsLogoSize::Small => "small",
            BtrfsLogoSize::Medium => "medium",
            BtrfsLogoSize::Large => "large",
        };
        format!("btrfs-{variant}-{size}.png")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Icon {
    Default,
    Custom {
        path: PathBuf,
    },
    EmbedBtrfsLogo {
        #[serde(rename = "btrfs-logo")]
        btrfs_logo: BtrfsLogoSpec,
    },
}

impl Default for Icon {
    fn default() -> Self {
        Icon::Default
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BootStanzaGeneration {
    pub refind_config: String,
    #[serde(default = "default_true")]
    pub include_paths: bool,
    #[serde(default = "default_true")]
    pub include_sub_menus: bool,
    #[serde(default)]
    pub icon: Icon,
}

fn default_true() -> bool {
    true
}

impl PartialEq for BootStanzaGeneration {
    fn eq(&self, other: &Self) -> bool {
        self.refind_config == other.refind_config
            && self.include_paths == other.include_paths
            && self.include_sub_menus == other.include_sub_menus
            && self.icon == other.icon
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PackageConfig {
    #[serde(default)]
    pub exit_if_root_is_snapshot: bool,
    #[serde(default)]
    pub exit_if_no_changes_are_detected: bool,
    pub esp_uuid: Uuid,
    #[serde(rename = "snapshot-search", default)]
    pub snapshot_search: Vec<SnapshotSearch>,
    #[serde(rename = "snapshot-manipulation")]
    pub snapshot_manipulation: SnapshotManipulation,
    #[serde(rename = "boot-stanza-generation")]
    pub boot_stanza_generation: BootStanzaGeneration,
}

impl PackageConfig {
    /// Cross-field invariants that `serde`'s schema checking cannot express.
    pub fn validate(&self) -> Result<(), String> {
        for search in &self.snapshot_search {
            if search.max_depth == 0 {
                return Err(format!(
                    "snapshot-search dir '{}' has max_depth == 0",
                    search.dir.display()
                ));
            }

            if is_nested_or_equal(&search.dir, &self.snapshot_manipulation.destination_dir) {
                return Err(format!(
                    "snapshot-search dir '{}' and destination_dir '{}' must not be nested or equal",
                    search.dir.display(),
                    self.snapshot_manipulation.destination_dir.display()
                ));
            }
        }

        if self.snapshot_manipulation.cleanup_exclusion.contains(&Uuid::nil()) {
            return Err("cleanup_exclusion must not contain the nil UUID".to_string());
        }

        Ok(())
    }
}

fn is_nested_or_equal(a: &std::path::Path, b: &std::path::Path) -> bool {
    a == b || a.starts_with(b) || b.starts_with(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_count_finite_caps_at_n() {
        let sorted_desc = vec![1, 2, 3, 4, 5];
        assert_eq!(SelectionCount::Finite(3).take(sorted_desc.clone()), vec![1, 2, 3]);
        assert_eq!(SelectionCount::Finite(10).take(sorted_desc), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn selection_count_infinite_keeps_everything() {
        let sorted_desc = vec!["a", "b", "c"];
        assert_eq!(SelectionCount::Infinite.take(sorted_desc.clone()), sorted_desc);
    }

    #[test]
    fn selection_count_rejects_zero_and_negative() {
        #[derive(Deserialize)]
        struct Wrapper {
            n: SelectionCount,
        }

        assert!(toml::from_str::<Wrapper>("n = 0").is_err());
        assert!(toml::from_str::<Wrapper>("n = -1").is_err());
    }

    #[test]
    fn selection_count_parses_inf_and_positive_integers() {
        #[derive(Deserialize)]
        struct Wrapper {
            n: SelectionCount,
        }

        assert_eq!(toml::from_str::<Wrapper>("n = \"inf\"").unwrap().n, SelectionCount::Infinite);
        assert_eq!(toml::from_str::<Wrapper>("n = 7").unwrap().n, SelectionCount::Finite(7));
    }
}
