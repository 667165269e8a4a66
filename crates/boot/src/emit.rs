use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use refind_btrfs_common::errors::{RefindBtrfsError, Result};

use crate::format::format_entry;
use crate::model::BootEntry;

fn normalize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_lowercase()
}

/// `{volume-normalized}_{basename(loader_path)}.conf`, lowercased.
pub fn derive_filename(entry: &BootEntry) -> Result<String> {
    let volume = entry
        .volume
        .as_deref()
        .ok_or_else(|| RefindBtrfsError::refind_config(Path::new(""), "entry has no volume"))?;
    let loader_path = entry.loader_path.as_deref().ok_or_else(|| {
        RefindBtrfsError::refind_config(Path::new(""), "entry has no loader_path")
    })?;

    let basename = Path::new(loader_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| loader_path.to_string());

    Ok(format!(
        "{}_{}.conf",
        normalize_component(volume),
        normalize_component(&basename)
    ))
}

fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path)
        .map_err(|e| RefindBtrfsError::refind_config(path, e.to_string()))?;
    Ok(())
}

/// Writes `entry` into `{generated_stanzas_dir}/{derived filename}`, creating
/// the directory if absent. Write-then-replace via a sibling temp file.
pub fn emit_entry(
    entry: &BootEntry,
    generated_stanzas_dir: &Path,
) -> Result<PathBuf> {
    let filename = derive_filename(entry)?;
    let target = generated_stanzas_dir.join(filename);

    let mut contents = format_entry(entry);
    if !contents.ends_with('\n') {
        contents.push('\n');
    }

    atomic_write(&target, &contents)?;
    Ok(target)
}

fn relative_include_path(main_config_path: &Path, emitted_path: &Path) -> PathBuf {
    let base = main_config_path.parent().unwrap_or_else(|| Path::new("."));
    emitted_path
        .strip_prefix(base)
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|_| emitted_path.to_path_buf())
}

/// Appends one `include RELPATH` line per new file to the main boot-loader
/// config, skipping any relative path already present, and rewrites the file
/// atomically.
pub fn append_includes(main_config_path: &Path, new_emitted_paths: &[PathBuf]) -> Result<()> {
    let existing = fs::read_to_string(main_config_path).unwrap_or_default();

    let relative_paths: Vec<String> = new_emitted_paths
        .iter()
        .map(|p| relative_include_path(main_config_path, p).to_string_lossy().into_owned())
        .collect();

    let mut out = existing.clone();
    let last_line_is_include = out
        .lines()
        .last()
        .map(|l| l.trim_start().starts_with("include "))
        .unwrap_or(true);

    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    if !last_line_is_include && !out.is_empty() {
        out.push('\n');
    }

    for relative_path in relative_paths {
        let directive = format!("include \"{relative_path}\"");
        if existing.lines().any(|l| l.trim() == directive) {
            continue;
        }
        out.push_str(&directive);
        out.push('\n');
    }

    atomic_write(main_config_path, &out)
}
