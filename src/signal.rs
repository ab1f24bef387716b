//! Cooperative shutdown: a stop flag plus signal handlers.
//!
//! SIGINT/SIGTERM mean "stop now"; SIGTTIN/SIGTTOU (raised when a
//! backgrounded process tries to read/write its controlling terminal) are
//! routed through the same handler since, per the design, they're treated as
//! the same event here. The handler body is restricted to what's
//! async-signal-safe: an atomic store and a single volatile register write.
//!
//! The flag itself is an `Arc<AtomicBool>` passed by reference to whatever
//! needs it, rather than a module-level global — the signal handler gets its
//! own clone of the `Arc` at registration time, so tests can each use an
//! independent flag instead of fighting over shared process state.

use crate::gpio;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM, SIGTTIN, SIGTTOU};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag shared between the signal handler and both periodic
/// tasks. Cheap to clone; every clone observes the same underlying bool.
#[derive(Clone)]
pub struct StopFlag(Arc<AtomicBool>);

impl Default for StopFlag {
    fn default() -> Self {
        StopFlag(Arc::new(AtomicBool::new(false)))
    }
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Register the termination handler for SIGINT, SIGTERM, SIGHUP, SIGTTIN,
/// and SIGTTOU against `flag`. The handler sets `flag` and performs a
/// signal-safe "all lamps off" via the process-wide mapped GPIO address.
pub fn install(flag: StopFlag) -> Result<(), crate::error::Error> {
    for sig in [SIGINT, SIGTERM, SIGHUP, SIGTTIN, SIGTTOU] {
        let flag = flag.clone();
        unsafe {
            signal_hook::low_level::register(sig, move || {
                flag.0.store(true, Ordering::Release);
                gpio::all_off_signal_safe();
            })
            .map_err(|e| crate::error::Error::Other(anyhow::anyhow!(e)))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_clear_and_reflects_set() {
        let flag = StopFlag::new();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
    }

    #[test]
    fn clones_share_the_same_underlying_state() {
        let flag = StopFlag::new();
        let clone = flag.clone();
        clone.set();
        assert!(flag.is_set());
    }
}
