use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use refind_btrfs_device::MountOptions;

/// `root=VALUE`, `rootflags=MountOptions`, `initrd=PATH`, and anything else,
/// in the order they were parsed. Formats back to a quoted string whose token
/// order equals the parse order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootOptions {
    pub root: Option<String>,
    pub rootflags: Option<MountOptions>,
    pub initrd: Vec<String>,
    pub other: Vec<String>,
    order: Vec<OptionSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum OptionSlot {
    Root,
    Rootflags,
    Initrd(usize),
    Other(usize),
}

impl BootOptions {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut result = BootOptions::default();

        for token in raw.split_whitespace() {
            if let Some(value) = token.strip_prefix("root=") {
                if result.root.is_some() {
                    return Err("duplicate 'root=' option".to_string());
                }
                result.root = Some(value.to_string());
                result.order.push(OptionSlot::Root);
            } else if let Some(value) = token.strip_prefix("rootflags=") {
                if result.rootflags.is_some() {
                    return Err("duplicate 'rootflags=' option".to_string());
                }
                result.rootflags = Some(MountOptions::parse(value)?);
                result.order.push(OptionSlot::Rootflags);
            } else if let Some(value) = token.strip_prefix("initrd=") {
                result.order.push(OptionSlot::Initrd(result.initrd.len()));
                result.initrd.push(value.to_string());
            } else {
                result.order.push(OptionSlot::Other(result.other.len()));
                result.other.push(token.to_string());
            }
        }

        Ok(result)
    }

    pub fn format(&self) -> String {
        let tokens: Vec<String> = self
            .order
            .iter()
            .map(|slot| match slot {
                OptionSlot::Root => format!("root={}", self.root.as_deref().unwrap_or_default()),
                OptionSlot::Rootflags => format!(
                    "rootflags={}",
                    self.rootflags
                        .as_ref()
                        .map(|m| m.format())
                        .unwrap_or_default()
                ),
                OptionSlot::Initrd(i) => format!("initrd={}", self.initrd[*i]),
                OptionSlot::Other(i) => self.other[*i].clone(),
            })
            .collect();

        tokens.join(" ")
    }

    pub fn set_root(&mut self, value: impl Into<String>) {
        if self.root.is_none() {
            self.order.push(OptionSlot::Root);
        }
        self.root = Some(value.into());
    }

    pub fn set_rootflags(&mut self, options: MountOptions) {
        if self.rootflags.is_none() {
            self.order.push(OptionSlot::Rootflags);
        }
        self.rootflags = Some(options);
    }

    pub fn rewrite_initrd(&mut self, mut rewrite: impl FnMut(&str) -> String) {
        for value in self.initrd.iter_mut() {
            *value = rewrite(value);
        }
    }

    /// Merges `self` (parent) with `addition` (sub-entry's `add_boot_options`):
    /// the parent's tokens first, then any addition tokens not already present.
    pub fn merge(&self, addition: &BootOptions) -> BootOptions {
        let mut merged = self.clone();

        if merged.root.is_none() {
            if let Some(root) = &addition.root {
                merged.set_root(root.clone());
            }
        }
        if merged.rootflags.is_none() {
            if let Some(rootflags) = &addition.rootflags {
                merged.set_rootflags(rootflags.clone());
            }
        }
        for initrd in &addition.initrd {
            if !merged.initrd.contains(initrd) {
                merged.order.push(OptionSlot::Initrd(merged.initrd.len()));
                merged.initrd.push(initrd.clone());
            }
        }
        for other in &addition.other {
            if !merged.other.contains(other) {
                merged.order.push(OptionSlot::Other(merged.other.len()));
                merged.other.push(other.clone());
            }
        }

        merged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OsType {
    MacOs,
    Linux,
    Elilo,
    Windows,
    Xom,
}

impl OsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::MacOs => "MacOS",
            OsType::Linux => "Linux",
            OsType::Elilo => "ELILO",
            OsType::Windows => "Windows",
            OsType::Xom => "XOM",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "MacOS" => Some(OsType::MacOs),
            "Linux" => Some(OsType::Linux),
            "ELILO" => Some(OsType::Elilo),
            "Windows" => Some(OsType::Windows),
            "XOM" => Some(OsType::Xom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphicsMode {
    On,
    Off,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubEntry {
    pub name: String,
    pub loader_path: Option<String>,
    pub initrd_path: Option<String>,
    pub graphics: Option<GraphicsMode>,
    pub boot_options: BootOptions,
    pub add_boot_options: BootOptions,
    pub is_disabled: bool,
}

impl SubEntry {
    /// A sub-entry shares the usability rule of its parent, minus `volume`.
    pub fn is_usable(&self) -> bool {
        self.loader_path.is_some() && self.initrd_path.is_some() && !self.is_disabled
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootEntry {
    pub name: String,
    pub volume: Option<String>,
    pub loader_path: Option<String>,
    pub initrd_path: Option<String>,
    pub icon_path: Option<String>,
    pub os_type: Option<OsType>,
    pub graphics: Option<GraphicsMode>,
    pub boot_options: BootOptions,
    pub firmware_bootnum: Option<u16>,
    pub is_disabled: bool,
    pub sub_entries: Vec<SubEntry>,
}

impl BootEntry {
    /// Equality for the matched-entry invariant is the pair (volume, loader_path).
    pub fn identity(&self) -> (Option<&str>, Option<&str>) {
        (self.volume.as_deref(), self.loader_path.as_deref())
    }

    pub fn is_usable_for_snapshots(&self) -> bool {
        self.volume.is_some()
            && self.loader_path.is_some()
            && self.initrd_path.is_some()
            && !self.is_disabled
    }
}

/// A parsed boot-loader configuration file plus its resolved `include` tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootConfig {
    pub path: PathBuf,
    pub entries: Vec<BootEntry>,
    pub includes: Vec<BootConfig>,
}

impl BootConfig {
    /// A config is *generated* iff its parent directory name equals the
    /// generated-stanzas directory name.
    pub fn is_generated(&self, generated_stanzas_dir_name: &str) -> bool {
        self.path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n == generated_stanzas_dir_name)
            .unwrap_or(false)
    }

    pub fn all_entries(&self) -> Vec<&BootEntry> {
        let mut entries: Vec<&BootEntry> = self.entries.iter().collect();
        for included in &self.includes {
            entries.extend(included.all_entries());
        }
        entries
    }

    /// Like [`Self::all_entries`], but does not descend into an included
    /// config that is itself generated output: the entries this package
    /// already emitted and included back in are not original boot-loader
    /// entries to match snapshots against.
    pub fn source_entries(&self, generated_stanzas_dir_name: &str) -> Vec<&BootEntry> {
        let mut entries: Vec<&BootEntry> = self.entries.iter().collect();
        for included in &self.includes {
            if !included.is_generated(generated_stanzas_dir_name) {
                entries.extend(included.source_entries(generated_stanzas_dir_name));
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_options_merge_prefers_parent_and_skips_duplicates() {
        let parent = BootOptions::parse("root=/dev/sda1 initrd=/initramfs.img quiet").unwrap();
        let addition = BootOptions::parse("root=/dev/sda2 initrd=/initramfs.img splash").unwrap();

        let merged = parent.merge(&addition);

        assert_eq!(merged.root.as_deref(), Some("/dev/sda1"));
        assert_eq!(merged.initrd, vec!["/initramfs.img".to_string()]);
        assert_eq!(merged.other, vec!["quiet".to_string(), "splash".to_string()]);
    }

    #[test]
    fn boot_entry_identity_is_volume_and_loader_path() {
        let entry = BootEntry {
            name: "Arch Linux".to_string(),
            volume: Some("ESP".to_string()),
            loader_path: Some("/vmlinuz-linux".to_string()),
            ..Default::default()
        };
        assert_eq!(entry.identity(), (Some("ESP"), Some("/vmlinuz-linux")));
    }

    #[test]
    fn boot_entry_usable_for_snapshots_requires_volume_loader_and_initrd() {
        let mut entry = BootEntry {
            name: "Arch Linux".to_string(),
            volume: Some("ESP".to_string()),
            loader_path: Some("/vmlinuz-linux".to_string()),
            initrd_path: Some("/initramfs-linux.img".to_string()),
            ..Default::default()
        };
        assert!(entry.is_usable_for_snapshots());

        entry.is_disabled = true;
        assert!(!entry.is_usable_for_snapshots());

        entry.is_disabled = false;
        entry.initrd_path = None;
        assert!(!entry.is_usable_for_snapshots());
    }

    #[test]
    fn boot_config_is_generated_checks_the_parent_directory_name() {
        let generated = BootConfig {
            path: PathBuf::from("/boot/efi/EFI/refind/boot_stanzas/esp_vmlinuz.conf"),
            ..Default::default()
        };
        let original = BootConfig {
            path: PathBuf::from("/boot/efi/EFI/refind/refind.conf"),
            ..Default::default()
        };

        assert!(generated.is_generated("boot_stanzas"));
        assert!(!original.is_generated("boot_stanzas"));
    }

    fn entry_named(name: &str) -> BootEntry {
        BootEntry {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn source_entries_skips_generated_includes_but_all_entries_does_not() {
        let generated_include = BootConfig {
            path: PathBuf::from("/refind/boot_stanzas/esp_vmlinuz.conf"),
            entries: vec![entry_named("Arch Linux (snapshot)")],
            ..Default::default()
        };
        let manual_include = BootConfig {
            path: PathBuf::from("/refind/extra.conf"),
            entries: vec![entry_named("Windows")],
            ..Default::default()
        };
        let root = BootConfig {
            path: PathBuf::from("/refind/refind.conf"),
            entries: vec![entry_named("Arch Linux")],
            includes: vec![generated_include, manual_include],
        };

        let source_names: Vec<&str> = root
            .source_entries("boot_stanzas")
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(source_names, vec!["Arch Linux", "Windows"]);

        let all_names: Vec<&str> = root
            .all_entries()
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(all_names, vec!["Arch Linux", "Arch Linux (snapshot)", "Windows"]);
    }
}
