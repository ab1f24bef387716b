//! Audio writer task: a 30 ms periodic pull-from-source / push-to-sink loop.
//!
//! Keeps the sink's pending-frame backlog inside `[period, MAX_BUFFER_PERIODS
//! * period]` in steady state by writing up to three sink periods (≈30 ms)
//! every 30 ms, and recovers from sink under-runs with a prepare + bounded
//! re-prefill rather than letting ALSA's implicit xrun handling run the show.

use crate::audio::sink::PcmSink;
use crate::audio::source::Source;
use crate::error::Error;
use crate::playback::sched::{set_realtime_priority, DeadlineClock};
use crate::playback::stats::{CycleObservation, StatsRing};
use crate::signal::StopFlag;
use std::time::{Duration, Instant};

pub const PERIOD: Duration = Duration::from_millis(30);
pub const PRIORITY: i32 = 75;

/// Sink pending frames above this many periods: stop writing for this cycle.
const MAX_BUFFER_PERIODS: usize = 5;
/// Writes attempted per cycle before yielding the remainder to the next one.
const WRITES_PER_CYCLE: usize = 3;
/// Successive period writes attempted during under-run recovery.
const PREFILL_PERIODS: usize = 4;

#[derive(Debug, Default, Clone, Copy)]
pub struct WriterOutcome {
    pub underrun_count: u32,
    pub buffer_stall_count: u32,
    pub cycles: u32,
    pub stopped_early: bool,
}

/// Run the writer to completion on the calling thread. Spawn this on its own
/// thread from the coordinator; it blocks until the source reports finished
/// or the stop flag is observed.
pub fn run(
    sink: &impl PcmSink,
    source: &mut Source,
    stop: &StopFlag,
    mut stats: Option<&mut StatsRing>,
) -> WriterOutcome {
    if let Err(e) = set_realtime_priority(PRIORITY) {
        tracing::warn!(error = %e, "audio writer running at default priority");
    }

    let period_frames = sink.period_frames();
    let channels = sink.channels() as usize;
    let max_delay_frames = MAX_BUFFER_PERIODS * period_frames;

    let mut clock = DeadlineClock::new(PERIOD);
    let mut buf = vec![0i16; period_frames * channels];
    let mut outcome = WriterOutcome::default();

    loop {
        let cycle_start = Instant::now();
        let jitter = clock.tick();
        if jitter < 0 {
            tracing::warn!(jitter_ns = jitter, "audio writer woke before its deadline");
        }

        if stop.is_set() {
            outcome.stopped_early = true;
            break;
        }
        if source.finished() {
            break;
        }

        let mut delay_frames = sink.pending_frames().unwrap_or(0);
        let ring_available = source.available_frames();

        for _ in 0..WRITES_PER_CYCLE {
            if delay_frames > max_delay_frames {
                break;
            }
            if source.available_frames() < period_frames && source.awaiting_more_data() {
                outcome.buffer_stall_count += 1;
                break;
            }

            let n = source.read(&mut buf);
            if n == 0 {
                break;
            }
            let frames = &buf[..n * channels];

            match sink.write(frames) {
                Ok(_) => {
                    delay_frames = sink.pending_frames().unwrap_or(delay_frames);
                }
                Err(Error::Alsa(_)) => {
                    outcome.underrun_count += 1;
                    tracing::warn!(
                        count = outcome.underrun_count,
                        "sink under-run, preparing and re-prefilling"
                    );
                    let _ = sink.prepare();
                    reprefill(sink, source, &mut buf, channels);
                    delay_frames = sink.pending_frames().unwrap_or(0);
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "sink write failed");
                    break;
                }
            }
        }

        if let Some(ring) = stats.as_deref_mut() {
            ring.push(CycleObservation {
                jitter_ns: jitter,
                runtime: cycle_start.elapsed(),
                sink_pending_frames: delay_frames,
                ring_available_frames: ring_available,
            });
        }
        outcome.cycles += 1;
    }

    outcome
}

/// Up to [`PREFILL_PERIODS`] successive period writes; a failing write just
/// re-prepares and retries the same slot, matching the original `do_reprefill`
/// loop exactly (§4.5 step 4).
fn reprefill(sink: &impl PcmSink, source: &mut Source, buf: &mut [i16], channels: usize) {
    let mut r = 0;
    while r < PREFILL_PERIODS {
        let n = source.read(buf);
        if n == 0 {
            break;
        }
        let frames = &buf[..n * channels];
        match sink.write(frames) {
            Ok(_) => r += 1,
            Err(_) => {
                let _ = sink.prepare();
                // retry this same slot; do not advance `r`.
            }
        }
    }
}
