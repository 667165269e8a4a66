use std::fmt::Write as _;

use crate::model::{BootEntry, GraphicsMode, SubEntry};

fn push_line(out: &mut String, indent: &str, line: &str) {
    let _ = writeln!(out, "{indent}{line}");
}

fn format_graphics(mode: GraphicsMode) -> &'static str {
    match mode {
        GraphicsMode::On => "on",
        GraphicsMode::Off => "off",
    }
}

fn format_sub_entry(out: &mut String, sub: &SubEntry) {
    push_line(out, "    ", &format!("submenuentry \"{}\" {{", sub.name));

    if let Some(loader) = &sub.loader_path {
        push_line(out, "        ", &format!("loader {loader}"));
    }
    if let Some(initrd) = &sub.initrd_path {
        push_line(out, "        ", &format!("initrd {initrd}"));
    }
    if let Some(graphics) = sub.graphics {
        push_line(out, "        ", &format!("graphics {}", format_graphics(graphics)));
    }
    let options = sub.boot_options.format();
    if !options.is_empty() {
        push_line(out, "        ", &format!("options \"{options}\""));
    }
    let add_options = sub.add_boot_options.format();
    if !add_options.is_empty() {
        push_line(out, "        ", &format!("add_options \"{add_options}\""));
    }
    if sub.is_disabled {
        push_line(out, "        ", "disabled");
    }

    push_line(out, "    ", "}");
}

/// Renders a [`BootEntry`] back to the line-oriented grammar, as written by
/// the emission phase for each generated stanza file.
pub fn format_entry(entry: &BootEntry) -> String {
    let mut out = String::new();

    push_line(&mut out, "", &format!("menuentry \"{}\" {{", entry.name));

    if let Some(volume) = &entry.volume {
        push_line(&mut out, "    ", &format!("volume \"{volume}\""));
    }
    if let Some(loader) = &entry.loader_path {
        push_line(&mut out, "    ", &format!("loader {loader}"));
    }
    if let Some(initrd) = &entry.initrd_path {
        push_line(&mut out, "    ", &format!("initrd {initrd}"));
    }
    if let Some(icon) = &entry.icon_path {
        push_line(&mut out, "    ", &format!("icon {icon}"));
    }
    if let Some(os_type) = entry.os_type {
        push_line(&mut out, "    ", &format!("ostype {}", os_type.as_str()));
    }
    if let Some(graphics) = entry.graphics {
        push_line(&mut out, "    ", &format!("graphics {}", format_graphics(graphics)));
    }
    let options = entry.boot_options.format();
    if !options.is_empty() {
        push_line(&mut out, "    ", &format!("options \"{options}\""));
    }
    if let Some(bootnum) = entry.firmware_bootnum {
        push_line(&mut out, "    ", &format!("firmware_bootnum 0x{bootnum:04x}"));
    }
    if entry.is_disabled {
        push_line(&mut out, "    ", "disabled");
    }
    for sub in &entry.sub_entries {
        format_sub_entry(&mut out, sub);
    }

    push_line(&mut out, "", "}");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BootOptions;

    #[test]
    fn round_trips_through_format_and_parse() {
        let entry = BootEntry {
            name: "Arch Linux".to_string(),
            volume: Some("ROOT".to_string()),
            loader_path: Some("/vmlinuz-linux".to_string()),
            initrd_path: Some("/initramfs-linux.img".to_string()),
            boot_options: BootOptions::parse("root=/dev/sda2 rw").unwrap(),
            ..Default::default()
        };

        let rendered = format_entry(&entry);
        let (parsed, _) = crate::parser::parse_contents(&rendered).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, entry.name);
        assert_eq!(parsed[0].loader_path, entry.loader_path);
    }
}
