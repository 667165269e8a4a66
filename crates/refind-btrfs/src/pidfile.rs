use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// An advisory lock held for the lifetime of a daemon run: refuses to start
/// if another live process is already holding the same PID file.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Acquires the lock at `path`, removing it first if it names a process
    /// that is no longer alive.
    pub fn acquire(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();

        if let Some(existing) = read_pid(&path)? {
            if process_is_alive(existing) {
                return Err(std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    format!("another {} daemon (pid {existing}) is already running", path.display()),
                ));
            }
            log::warn!("removing stale pid file for dead process {existing}");
            let _ = fs::remove_file(&path);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    format!("could not create pid file '{}': {e}", path.display()),
                )
            })?;

        write!(file, "{}", std::process::id())?;

        Ok(PidFile { path })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn read_pid(path: &Path) -> std::io::Result<Option<i32>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents.trim().parse().ok()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn process_is_alive(pid: i32) -> bool {
    signal::kill(Pid::from_raw(pid), None::<Signal>).is_ok()
}
