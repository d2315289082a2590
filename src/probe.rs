//! Detection of io_uring availability on the current host.
//!
//! io_uring is frequently switched off outside bare-metal Linux: the
//! `kernel.io_uring_disabled` sysctl, Docker's default seccomp profile and
//! most Kubernetes runtimes all refuse `io_uring_setup`. There is no fallback
//! backend; these helpers only tell a caller (or a test) whether a ring can
//! be created here and, if not, the most likely reason.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

const IO_URING_DISABLED_SYSCTL: &str = "/proc/sys/kernel/io_uring_disabled";

/// Check whether this process can create an io_uring instance.
///
/// The probe creates and immediately drops a two-entry ring. The answer is
/// cached for the lifetime of the process.
///
/// # Example
///
/// ```rust,no_run
/// if !ringread::probe::is_io_uring_available() {
///     eprintln!("io_uring unavailable: {:?}", ringread::probe::restriction_hint());
/// }
/// ```
pub fn is_io_uring_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| io_uring::IoUring::new(2).is_ok())
}

/// Best guess at why io_uring is unavailable, if a restriction is visible.
pub fn restriction_hint() -> Option<String> {
    if let Ok(value) = fs::read_to_string(IO_URING_DISABLED_SYSCTL) {
        match value.trim() {
            "1" => {
                return Some(
                    "kernel.io_uring_disabled=1: only members of kernel.io_uring_group may create rings"
                        .to_string(),
                )
            }
            "2" => return Some("kernel.io_uring_disabled=2: io_uring is disabled".to_string()),
            _ => {}
        }
    }

    if let Ok(status) = fs::read_to_string("/proc/self/status") {
        let filtered = status
            .lines()
            .find_map(|line| line.strip_prefix("Seccomp:"))
            .map(|mode| mode.trim() != "0")
            .unwrap_or(false);
        if filtered {
            return Some("a seccomp profile may filter io_uring system calls".to_string());
        }
    }

    if Path::new("/.dockerenv").exists() {
        return Some("Docker environment detected: io_uring is blocked by the default seccomp profile".to_string());
    }

    None
}
