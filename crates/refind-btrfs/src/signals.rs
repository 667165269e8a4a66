use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

/// Installs the conventional-terminate-signal handler: asks the daemon's
/// observer loop to stop after the in-flight run finishes.
pub fn install_shutdown_flag() -> std::io::Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;
    Ok(shutdown)
}

pub fn should_shutdown(flag: &AtomicBool) -> bool {
    flag.load(Ordering::Relaxed)
}
