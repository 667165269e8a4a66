use log::LevelFilter;

/// Initializes the `env_logger` sink from an occurrence-counted verbosity flag,
/// mirroring the teacher's `installer::cli::Args::verbosity` handling.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_secs()
        .try_init();
}
