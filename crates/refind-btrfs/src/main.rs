mod cli;
mod discovery;
mod engine;
mod pidfile;
mod privilege;
mod signals;
mod watch;

use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use clap::Parser;

use cli::{Args, RunMode};
use engine::{Engine, RunOutcome};
use refind_btrfs_common::constants::{PERSISTENCE_DIR, PERSISTENCE_FILE_NAME, PID_FILE_NAME};
use refind_btrfs_device::{CliLiveDeviceAdapter, CliPhysicalDeviceAdapter, CliSubvolumeAdapter};
use refind_btrfs_persistence::Database;
use pidfile::PidFile;

fn main() -> ExitCode {
    let args = Args::parse();
    refind_btrfs_common::logging::init(args.verbose);

    if let Err(code) = privilege::require_root() {
        return ExitCode::from(code as u8);
    }

    match args.run_mode {
        RunMode::OneTime => run_once(&args),
        RunMode::Background => run_daemon(&args),
    }
}

fn run_once(args: &Args) -> ExitCode {
    let db = Database::new(std::path::Path::new(PERSISTENCE_DIR).join(PERSISTENCE_FILE_NAME));

    let config = match db.load_config(&args.config) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let physical = CliPhysicalDeviceAdapter::new();
    let live = CliLiveDeviceAdapter::new();
    let subvolume = CliSubvolumeAdapter::new();

    let engine = Engine {
        config: &config,
        physical: &physical,
        live: &live,
        subvolume: &subvolume,
        db: &db,
    };

    exit_code_for(engine.run())
}

fn run_daemon(args: &Args) -> ExitCode {
    let db = Database::new(std::path::Path::new(PERSISTENCE_DIR).join(PERSISTENCE_FILE_NAME));

    let config = match db.load_config(&args.config) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let _pid_file = match PidFile::acquire(Path::new(PERSISTENCE_DIR).join(PID_FILE_NAME)) {
        Ok(guard) => guard,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = match signals::install_shutdown_flag() {
        Ok(flag) => flag,
        Err(e) => {
            log::error!("failed to install signal handler: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut watched_dirs: Vec<std::path::PathBuf> = config
        .snapshot_search
        .iter()
        .map(|s| s.dir.clone())
        .collect();
    watched_dirs.push(config.snapshot_manipulation.destination_dir.clone());

    let watcher = match watch::FilesystemWatch::new(&watched_dirs) {
        Ok(w) => w,
        Err(e) => {
            log::error!("failed to install filesystem watch: {e}");
            return ExitCode::FAILURE;
        }
    };

    let physical = CliPhysicalDeviceAdapter::new();
    let live = CliLiveDeviceAdapter::new();
    let subvolume = CliSubvolumeAdapter::new();

    while !signals::should_shutdown(&shutdown) {
        if !watcher.wait_for_trigger() {
            break;
        }
        if signals::should_shutdown(&shutdown) {
            break;
        }

        let engine = Engine {
            config: &config,
            physical: &physical,
            live: &live,
            subvolume: &subvolume,
            db: &db,
        };

        match engine.run() {
            Ok(RunOutcome::Applied { emitted }) => log::info!("run complete: {emitted} stanza(s) emitted"),
            Ok(RunOutcome::Unchanged) => log::warn!("nothing to do this run"),
            Ok(RunOutcome::Unsupported) => log::warn!("root is a snapshot; skipping this run"),
            Err(e) => log::error!("run failed: {e}"),
        }
    }

    shutdown.store(true, Ordering::Relaxed);
    ExitCode::SUCCESS
}

fn exit_code_for(result: refind_btrfs_common::errors::Result<RunOutcome>) -> ExitCode {
    match result {
        Ok(RunOutcome::Applied { emitted }) => {
            log::info!("run complete: {emitted} stanza(s) emitted");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Unchanged) | Ok(RunOutcome::Unsupported) => ExitCode::SUCCESS,
        Err(e) if e.is_benign() => {
            log::warn!("{e}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
