pub mod emit;
pub mod format;
pub mod grammar;
pub mod icon;
pub mod migrate;
pub mod model;
pub mod parser;

pub use emit::{append_includes, derive_filename, emit_entry};
pub use format::format_entry;
pub use grammar::SyntaxError;
pub use icon::{embed_logo, resolve_icon, validate_custom};
pub use migrate::{migrate_entry, migrate_mount_options, root_part_substitute, MigrationContext};
pub use model::{BootConfig, BootEntry, BootOptions, GraphicsMode, OsType, SubEntry};
pub use parser::{parse_contents, parse_file};
