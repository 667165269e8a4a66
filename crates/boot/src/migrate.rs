use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use refind_btrfs_common::config::Icon;
use refind_btrfs_common::errors::{RefindBtrfsError, Result};
use refind_btrfs_device::{MountOptions, Subvolume};

use crate::icon;
use crate::model::{BootEntry, BootOptions, SubEntry};

lazy_static! {
    static ref DERIVED_NAME_IN_PARENS: Regex =
        Regex::new(r"\((?:ro|rw)(?:subvol|snap)_\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}_ID\d+\)")
            .unwrap();
}

/// Rewrites `options`'s `subvol=`/`subvolid=` from `from`'s identity to
/// `to`'s. Strict: aborts if `options` did not already match `from`.
pub fn migrate_mount_options(
    options: &MountOptions,
    from: &Subvolume,
    to: &Subvolume,
) -> Result<MountOptions> {
    if !options.matches(&from.logical_path, from.num_id) {
        return Err(RefindBtrfsError::partition(format!(
            "mount options do not match source subvolume '{}'",
            from.logical_path
        )));
    }

    let mut migrated = options.clone();
    migrated.set(refind_btrfs_device::mount_options::SUBVOL, to.logical_path.clone());
    migrated.set(
        refind_btrfs_device::mount_options::SUBVOLID,
        to.num_id.to_string(),
    );
    Ok(migrated)
}

fn migrate_name(name: &str, snapshot: &Subvolume) -> String {
    let replacement = format!("({})", snapshot.derived_name());

    if DERIVED_NAME_IN_PARENS.is_match(name) {
        DERIVED_NAME_IN_PARENS
            .replace(name, replacement.as_str())
            .into_owned()
    } else {
        format!("{name} {replacement}")
    }
}

/// Replaces the leading path segment equal to `from`'s logical path with
/// `to`'s, normalizing backslashes and collapsing leading separator runs.
pub fn root_part_substitute(text: &str, from_logical: &str, to_logical: &str) -> String {
    let normalized = text.replace('\\', "/");
    let from_trimmed = from_logical.trim_start_matches('/');
    let to_trimmed = to_logical.trim_start_matches('/');

    let pattern = format!(r"^(/*){}(/)", regex::escape(from_trimmed));
    let re = Regex::new(&pattern).expect("constructed from escaped literal");

    if let Some(caps) = re.captures(&normalized) {
        let leading = if caps[1].is_empty() { "" } else { "/" };
        let rest = &normalized[caps.get(0).unwrap().end()..];
        format!("{leading}{to_trimmed}/{rest}")
    } else {
        normalized
    }
}

pub struct MigrationContext<'a> {
    pub live: &'a Subvolume,
    pub include_paths: bool,
    pub include_sub_menus: bool,
    pub has_separate_boot: bool,
    pub is_latest: bool,
    pub icon: &'a Icon,
    pub logo_library_dir: &'a Path,
    pub icons_output_dir: &'a Path,
    pub boot_config_dir: &'a Path,
}

/// Every path in the grammar (`loader`, `initrd`, `icon`) is written relative
/// to the boot-loader's own directory, `/`-separated, with a leading slash —
/// never as a real filesystem path. Converts a filesystem path produced by
/// icon compositing back into that form; a path outside `base` is left as an
/// absolute filesystem path rather than failing the whole migration over it.
fn to_refind_relative(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let as_text = relative.to_string_lossy().replace('\\', "/");
    if as_text.starts_with('/') {
        as_text
    } else {
        format!("/{as_text}")
    }
}

/// Migrates the `icon` directive per the Icon dispatch: `Default` keeps the
/// source entry's icon untouched; `Custom` validates the configured file and
/// substitutes it; `EmbedBtrfsLogo` composites the configured logo over the
/// source entry's existing icon, or is a no-op if it has none.
fn migrate_icon(source_icon_path: Option<&str>, ctx: &MigrationContext) -> Result<Option<String>> {
    match ctx.icon {
        Icon::Default => Ok(source_icon_path.map(str::to_string)),
        Icon::Custom { path } => {
            icon::validate_custom(path)?;
            Ok(Some(to_refind_relative(path, ctx.boot_config_dir)))
        }
        Icon::EmbedBtrfsLogo { btrfs_logo } => {
            let Some(source) = source_icon_path else {
                return Ok(None);
            };
            let source_absolute = ctx.boot_config_dir.join(source.trim_start_matches('/'));
            let logo_path = ctx.logo_library_dir.join(btrfs_logo.logo_filename());
            let composited =
                icon::embed_logo(&source_absolute, &logo_path, btrfs_logo, ctx.icons_output_dir)?;
            Ok(Some(to_refind_relative(&composited, ctx.boot_config_dir)))
        }
    }
}

/// Migrates boot options for one entry: rewrites `rootflags=` and, when
/// `include_paths` is set, each `initrd=PATH` token by root-part substitution.
fn migrate_boot_options(
    options: &BootOptions,
    ctx: &MigrationContext,
    snapshot: &Subvolume,
) -> Result<BootOptions> {
    let mut migrated = options.clone();

    if let Some(rootflags) = &options.rootflags {
        migrated.set_rootflags(migrate_mount_options(rootflags, ctx.live, snapshot)?);
    }

    if ctx.include_paths {
        migrated.rewrite_initrd(|path| {
            root_part_substitute(path, &ctx.live.logical_path, &snapshot.logical_path)
        });
    }

    Ok(migrated)
}

fn migrate_path(path: &str, ctx: &MigrationContext, snapshot: &Subvolume) -> String {
    if ctx.include_paths && !ctx.has_separate_boot {
        root_part_substitute(path, &ctx.live.logical_path, &snapshot.logical_path)
    } else {
        path.to_string()
    }
}

/// Migrates one (entry, snapshot) pair into a new entry per the migration
/// algorithm: name, loader/initrd paths, boot options, sub-entries, icon are
/// handled; firmware_bootnum/os_type/graphics/volume/disabled copy unchanged.
pub fn migrate_entry(
    entry: &BootEntry,
    snapshot: &Subvolume,
    ctx: &MigrationContext,
) -> Result<BootEntry> {
    let mut migrated = entry.clone();

    migrated.name = migrate_name(&entry.name, snapshot);

    if let Some(loader) = &entry.loader_path {
        migrated.loader_path = Some(migrate_path(loader, ctx, snapshot));
    }
    if let Some(initrd) = &entry.initrd_path {
        migrated.initrd_path = Some(migrate_path(initrd, ctx, snapshot));
    }

    migrated.boot_options = migrate_boot_options(&entry.boot_options, ctx, snapshot)?;

    migrated.icon_path = migrate_icon(entry.icon_path.as_deref(), ctx)?;

    migrated.sub_entries = Vec::new();
    if ctx.include_sub_menus {
        for sub in &entry.sub_entries {
            if !sub.is_usable() {
                continue;
            }
            migrated
                .sub_entries
                .push(migrate_sub_entry(sub, &migrated, ctx, snapshot)?);
        }
    }

    Ok(migrated)
}

fn migrate_sub_entry(
    sub: &SubEntry,
    migrated_parent: &BootEntry,
    ctx: &MigrationContext,
    snapshot: &Subvolume,
) -> Result<SubEntry> {
    let mut migrated = sub.clone();

    let migrated_add_options = migrate_boot_options(&sub.add_boot_options, ctx, snapshot)?;
    migrated.boot_options = migrated_parent.boot_options.merge(&migrated_add_options);
    migrated.add_boot_options = BootOptions::default();

    if !ctx.is_latest {
        migrated.loader_path = migrated_parent.loader_path.clone();
        migrated.initrd_path = migrated_parent.initrd_path.clone();
    }

    Ok(migrated)
}
