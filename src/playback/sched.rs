//! Real-time priority helper and absolute-deadline periodic sleep.

use crate::error::{Error, Result};
use std::time::{Duration, Instant};

/// Attempt to raise the calling thread to `SCHED_FIFO` at `priority`
/// (1-99). Denial is recoverable: callers fall back to default scheduling
/// with a warning, never an abort.
pub fn set_realtime_priority(priority: i32) -> Result<()> {
    unsafe {
        let mut param: libc::sched_param = std::mem::zeroed();
        param.sched_priority = priority;
        let rc = libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param);
        if rc != 0 {
            return Err(Error::PriorityDenied(format!(
                "pthread_setschedparam(SCHED_FIFO, {priority}) failed: errno {rc}"
            )));
        }
    }
    Ok(())
}

/// An absolute monotonic deadline clock. `tick()` sleeps until the next
/// deadline and advances it by `period` regardless of how late the wakeup
/// was, so jitter never accumulates.
pub struct DeadlineClock {
    period: Duration,
    next: Instant,
}

impl DeadlineClock {
    pub fn new(period: Duration) -> Self {
        DeadlineClock { period, next: Instant::now() + period }
    }

    /// Sleep until the next deadline (a no-op if already past it), then
    /// advance the deadline by one period. Returns the observed jitter in
    /// nanoseconds: positive if the wakeup was late, negative if early (a
    /// bug, since `thread::sleep` cannot wake early — the signed return
    /// lets callers detect and log it rather than have it clamp to zero).
    pub fn tick(&mut self) -> i64 {
        let now = Instant::now();
        if now < self.next {
            std::thread::sleep(self.next - now);
        }
        let actual_wake = Instant::now();
        let jitter = if actual_wake >= self.next {
            actual_wake.duration_since(self.next).as_nanos() as i64
        } else {
            -(self.next.duration_since(actual_wake).as_nanos() as i64)
        };
        self.next += self.period;
        jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_advances_by_exactly_one_period_each_tick() {
        let mut clock = DeadlineClock::new(Duration::from_millis(5));
        let first = clock.next;
        clock.tick();
        assert_eq!(clock.next, first + Duration::from_millis(5));
        clock.tick();
        assert_eq!(clock.next, first + Duration::from_millis(10));
    }

    #[test]
    fn jitter_is_positive_when_deadline_already_passed() {
        let mut clock = DeadlineClock::new(Duration::from_millis(5));
        clock.next = Instant::now() - Duration::from_millis(1);
        let jitter = clock.tick();
        assert!(jitter > 0);
    }
}
