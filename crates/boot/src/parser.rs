use std::fs;
use std::path::{Path, PathBuf};

use refind_btrfs_common::errors::{RefindBtrfsError, Result};

use crate::grammar::{tokenize, SyntaxError, TokenKind, TokenStream};
use crate::model::{BootConfig, BootEntry, BootOptions, GraphicsMode, OsType, SubEntry};

const MAX_INCLUDE_DEPTH: usize = 32;

fn to_refind_error(path: &Path, e: SyntaxError) -> RefindBtrfsError {
    RefindBtrfsError::RefindSyntaxError {
        path: path.to_path_buf(),
        line: e.line,
        column: e.column,
        message: e.message,
    }
}

/// Parses `path` and recursively resolves its `include` directives, relative
/// to the including file's directory. `depth` guards against cycles.
pub fn parse_file(path: &Path) -> Result<BootConfig> {
    parse_file_at_depth(path, 0)
}

fn parse_file_at_depth(path: &Path, depth: usize) -> Result<BootConfig> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(RefindBtrfsError::refind_config(
            path,
            "include recursion depth exceeded (cycle?)",
        ));
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| RefindBtrfsError::refind_config(path, format!("failed to read: {e}")))?;

    let (entries, include_paths) =
        parse_contents(&contents).map_err(|e| to_refind_error(path, e))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut includes = Vec::new();

    for raw_include in include_paths {
        let include_path = resolve_include(base_dir, &raw_include);
        includes.push(parse_file_at_depth(&include_path, depth + 1)?);
    }

    Ok(BootConfig {
        path: path.to_path_buf(),
        entries,
        includes,
    })
}

fn resolve_include(base_dir: &Path, raw: &str) -> PathBuf {
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    }
}

/// Parses the top-level `menuentry`/`include` items of a single file's
/// contents, without resolving any includes.
pub fn parse_contents(contents: &str) -> Result<(Vec<BootEntry>, Vec<String>), SyntaxError> {
    let tokens = tokenize(contents)?;
    let mut stream = TokenStream::new(tokens);
    let mut entries = Vec::new();
    let mut includes = Vec::new();

    while !stream.is_at_end() {
        let (word, line, column) = stream.expect_word()?;

        match word.as_str() {
            "menuentry" => entries.push(parse_menu_entry(&mut stream)?),
            "include" => {
                let (value, ..) = stream.expect_value()?;
                includes.push(value);
            }
            _ => skip_unrecognized_directive(&mut stream, line),
        }
    }

    Ok((entries, includes))
}

/// Any top-level directive other than `menuentry`/`include` is syntactically
/// well-formed refind.conf the parser doesn't act on (`timeout`,
/// `default_selection`, `scanfor`, banner/theming options, ...). Consumes the
/// directive's optional same-line value, if any, and moves on rather than
/// failing the whole parse.
fn skip_unrecognized_directive(stream: &mut TokenStream, directive_line: usize) {
    if let Some(next) = stream.peek() {
        let is_value = matches!(next.kind, TokenKind::Word(_) | TokenKind::QuotedString(_));
        if is_value && next.line == directive_line {
            stream.advance();
        }
    }
}

fn parse_menu_entry(stream: &mut TokenStream) -> Result<BootEntry, SyntaxError> {
    let (name, ..) = stream.expect_value()?;
    stream.expect_lbrace()?;

    let mut entry = BootEntry {
        name,
        ..Default::default()
    };

    while !stream.at_rbrace() {
        let (word, line, column) = stream.expect_word()?;

        match word.as_str() {
            "volume" => entry.volume = Some(stream.expect_value()?.0),
            "loader" => entry.loader_path = Some(stream.expect_value()?.0),
            "initrd" => entry.initrd_path = Some(stream.expect_value()?.0),
            "icon" => entry.icon_path = Some(stream.expect_value()?.0),
            "ostype" => {
                let (value, l, c) = stream.expect_value()?;
                entry.os_type = Some(OsType::parse(&value).ok_or_else(|| SyntaxError {
                    line: l,
                    column: c,
                    message: format!("unrecognized ostype '{value}'"),
                })?);
            }
            "graphics" => {
                let (value, l, c) = stream.expect_value()?;
                entry.graphics = Some(parse_graphics(&value, l, c)?);
            }
            "options" => {
                let (value, l, c) = stream.expect_value()?;
                entry.boot_options = BootOptions::parse(&value).map_err(|message| SyntaxError {
                    line: l,
                    column: c,
                    message,
                })?;
            }
            "firmware_bootnum" => {
                let (value, l, c) = stream.expect_value()?;
                entry.firmware_bootnum = Some(parse_hex_u16(&value, l, c)?);
            }
            "disabled" => entry.is_disabled = true,
            "submenuentry" => entry.sub_entries.push(parse_sub_entry(stream)?),
            _ => {
                return Err(SyntaxError {
                    line,
                    column,
                    message: format!("unrecognized menuentry directive '{word}'"),
                })
            }
        }
    }

    stream.consume_rbrace()?;
    Ok(entry)
}

fn parse_sub_entry(stream: &mut TokenStream) -> Result<SubEntry, SyntaxError> {
    let (name, ..) = stream.expect_value()?;
    stream.expect_lbrace()?;

    let mut sub = SubEntry {
        name,
        ..Default::default()
    };

    while !stream.at_rbrace() {
        let (word, line, column) = stream.expect_word()?;

        match word.as_str() {
            "loader" => sub.loader_path = Some(stream.expect_value()?.0),
            "initrd" => sub.initrd_path = Some(stream.expect_value()?.0),
            "graphics" => {
                let (value, l, c) = stream.expect_value()?;
                sub.graphics = Some(parse_graphics(&value, l, c)?);
            }
            "options" => {
                let (value, l, c) = stream.expect_value()?;
                sub.boot_options = BootOptions::parse(&value).map_err(|message| SyntaxError {
                    line: l,
                    column: c,
                    message,
                })?;
            }
            "add_options" => {
                let (value, l, c) = stream.expect_value()?;
                sub.add_boot_options =
                    BootOptions::parse(&value).map_err(|message| SyntaxError {
                        line: l,
                        column: c,
                        message,
                    })?;
            }
            "disabled" => sub.is_disabled = true,
            _ => {
                return Err(SyntaxError {
                    line,
                    column,
                    message: format!("unrecognized submenuentry directive '{word}'"),
                })
            }
        }
    }

    stream.consume_rbrace()?;
    Ok(sub)
}

fn parse_graphics(value: &str, line: usize, column: usize) -> Result<GraphicsMode, SyntaxError> {
    match value {
        "on" => Ok(GraphicsMode::On),
        "off" => Ok(GraphicsMode::Off),
        _ => Err(SyntaxError {
            line,
            column,
            message: format!("graphics must be 'on' or 'off', got '{value}'"),
        }),
    }
}

fn parse_hex_u16(value: &str, line: usize, column: usize) -> Result<u16, SyntaxError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    u16::from_str_radix(stripped, 16).map_err(|_| SyntaxError {
        line,
        column,
        message: format!("'{value}' is not a valid 16-bit hex integer"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
menuentry "Linux" {
    volume "ROOT"
    loader /vmlinuz-linux
    initrd /initramfs-linux.img
    icon /icons/linux.png
    ostype Linux
    graphics on
    options "root=/dev/sda2 rootflags=subvol=@,subvolid=256 rw quiet"
    submenuentry "Fallback" {
        initrd /initramfs-linux-fallback.img
        add_options "single"
    }
}
include "/boot/refind_linux.conf"
"#;

    #[test]
    fn parses_menu_entry_and_submenu() {
        let (entries, includes) = parse_contents(SAMPLE).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(includes, vec!["/boot/refind_linux.conf".to_string()]);

        let entry = &entries[0];
        assert_eq!(entry.volume.as_deref(), Some("ROOT"));
        assert_eq!(entry.os_type, Some(OsType::Linux));
        assert_eq!(entry.graphics, Some(GraphicsMode::On));
        assert_eq!(entry.boot_options.root.as_deref(), Some("/dev/sda2"));
        assert_eq!(entry.sub_entries.len(), 1);
        assert_eq!(
            entry.sub_entries[0].add_boot_options.other,
            vec!["single".to_string()]
        );
    }

    #[test]
    fn reports_line_and_column_on_bad_graphics() {
        let bad = "menuentry \"X\" {\n    graphics maybe\n}\n";
        let err = parse_contents(bad).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn rejects_duplicate_root() {
        let err = BootOptions::parse("root=/dev/sda2 root=/dev/sda3").unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn skips_unrecognized_top_level_directives() {
        let contents = r#"
timeout 20
default_selection 1
scanfor internal,external
textonly
menuentry "Linux" {
    volume "ROOT"
    loader /vmlinuz-linux
    initrd /initramfs-linux.img
}
banner "refind-banner.png"
include "/boot/refind_linux.conf"
"#;
        let (entries, includes) = parse_contents(contents).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(includes, vec!["/boot/refind_linux.conf".to_string()]);
    }
}
