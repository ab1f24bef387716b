//! Lamp ticker task: a 10 ms periodic walk over the pattern list.

use crate::gpio::GpioSink;
use crate::pattern::{expand_to_lines, lamp_mask, PatternStep};
use crate::playback::sched::{set_realtime_priority, DeadlineClock};
use crate::signal::StopFlag;
use std::sync::Arc;
use std::time::Duration;

pub const PERIOD: Duration = Duration::from_millis(10);
pub const PRIORITY: i32 = 80;

pub struct TickerOutcome {
    pub ticks_issued: u32,
    pub stopped_early: bool,
}

/// Run the ticker to completion on the calling thread. Spawn this on its own
/// thread from the coordinator; it blocks until the pattern list is
/// exhausted or the stop flag is observed.
pub fn run(gpio: Arc<dyn GpioSink>, patterns: &[PatternStep], stop: StopFlag) -> TickerOutcome {
    if let Err(e) = set_realtime_priority(PRIORITY) {
        tracing::warn!(error = %e, "lamp ticker running at default priority");
    }

    gpio.configure_as_output(&crate::pattern::LAMP_LINES);

    let mut clock = DeadlineClock::new(PERIOD);
    let mut shadow: u32 = 0;
    let mut current_index = 0usize;
    let mut ticks_remaining = 0u32;
    let mut ticks_issued = 0u32;

    while current_index < patterns.len() {
        let jitter = clock.tick();
        if jitter < 0 {
            tracing::warn!(jitter_ns = jitter, "lamp ticker woke before its deadline");
        }
        if stop.is_set() {
            return TickerOutcome { ticks_issued, stopped_early: true };
        }

        if ticks_remaining == 0 {
            let step = &patterns[current_index];
            ticks_remaining = step.ticks().max(1);
            apply_step(gpio.as_ref(), step, &mut shadow);
        }

        ticks_issued += 1;
        ticks_remaining -= 1;
        if ticks_remaining == 0 {
            current_index += 1;
        }
    }

    TickerOutcome { ticks_issued, stopped_early: false }
}

fn apply_step(gpio: &dyn GpioSink, step: &PatternStep, shadow: &mut u32) {
    let mask = lamp_mask();
    let desired = expand_to_lines(step.bits);
    let to_set = desired & !*shadow & mask;
    let to_clear = !desired & *shadow & mask;

    if to_set != 0 {
        gpio.set_bits(to_set);
    }
    if to_clear != 0 {
        gpio.clear_bits(to_clear);
    }
    *shadow = (*shadow & !mask) | desired;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternStep;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGpio {
        sets: Mutex<Vec<u32>>,
        clears: Mutex<Vec<u32>>,
    }

    impl GpioSink for RecordingGpio {
        fn configure_as_output(&self, _lines: &[u32]) {}
        fn set_bits(&self, mask: u32) {
            self.sets.lock().unwrap().push(mask);
        }
        fn clear_bits(&self, mask: u32) {
            self.clears.lock().unwrap().push(mask);
        }
    }

    #[test]
    fn lamp_ordering_and_minimal_writes() {
        let gpio: Arc<RecordingGpio> = Arc::new(RecordingGpio::default());
        let patterns = vec![
            PatternStep { duration_ms: 10, bits: 0b1111_0000 },
            PatternStep { duration_ms: 10, bits: 0b1111_0000 }, // identical: no writes expected
            PatternStep { duration_ms: 10, bits: 0b0000_1111 },
        ];
        let outcome = run(gpio.clone(), &patterns, StopFlag::new());

        assert_eq!(outcome.ticks_issued, 3);
        assert!(!outcome.stopped_early);

        // One register event for step 0 (first-ever write), zero for the
        // repeated step 1, one for step 2's transition.
        let sets = gpio.sets.lock().unwrap();
        let clears = gpio.clears.lock().unwrap();
        assert_eq!(sets.len() + clears.len(), 3);
    }

    #[test]
    fn period_integrity_matches_sum_of_rounded_ticks() {
        let gpio: Arc<RecordingGpio> = Arc::new(RecordingGpio::default());
        let patterns = vec![
            PatternStep { duration_ms: 500, bits: 0b1111_0000 },
            PatternStep { duration_ms: 500, bits: 0b0000_1111 },
        ];
        let outcome = run(gpio, &patterns, StopFlag::new());
        assert_eq!(outcome.ticks_issued, 100); // 500/10 + 500/10
    }

    #[test]
    fn stop_flag_halts_before_pattern_exhausted() {
        // A single very long step; run() in a thread, flip stop shortly after.
        let gpio: Arc<RecordingGpio> = Arc::new(RecordingGpio::default());
        let patterns = vec![PatternStep { duration_ms: 10_000, bits: 0b1111_1111 }];
        let stop = StopFlag::new();
        stop.set();
        let outcome = run(gpio, &patterns, stop);
        assert!(outcome.stopped_early);
        assert!(outcome.ticks_issued <= 1);
    }
}
