/// Refuses to continue unless running as the effective root user, per the
/// CLI contract's `EACCES`-family exit code.
pub fn require_root() -> Result<(), i32> {
    if nix::unistd::geteuid().is_root() {
        Ok(())
    } else {
        log::error!("refind-btrfs must run as root");
        Err(libc_eacces())
    }
}

fn libc_eacces() -> i32 {
    13 // EACCES
}
