//! Playback coordinator: assembles one song's assets, runs the two periodic
//! tasks to completion, and enforces ordered teardown (§4.7).

use crate::audio::sink::Sink;
use crate::audio::source::Source;
use crate::error::Result;
use crate::gpio::GpioSink;
use crate::pattern::{self, PatternStep};
use crate::playback::stats::StatsRing;
use crate::playback::{ticker, writer};
use crate::signal::StopFlag;
use std::path::Path;
use std::sync::Arc;

/// Summary of one song's playback, useful to callers and the verbose reporter.
#[derive(Debug, Default)]
pub struct SongOutcome {
    pub ticks_issued: u32,
    pub underrun_count: u32,
    pub buffer_stall_count: u32,
    pub audio_played: bool,
    pub stopped_early: bool,
}

/// Play one song to completion: `base` is the asset path without extension
/// (e.g. `/home/linux/music/jingle_bells`). A pattern file at `{base}.txt`
/// is mandatory; `{base}.mp3` is tried before `{base}.wav`, and either may be
/// entirely absent for an LED-only song.
pub fn play_song(
    base: &Path,
    gpio: Arc<dyn GpioSink>,
    stop: StopFlag,
    verbose: bool,
) -> Result<SongOutcome> {
    let pattern_path = base.with_extension("txt");
    let patterns: Vec<PatternStep> = pattern::load_patterns(&pattern_path)?;

    // Stop flag is process-owned; a prior song may have left it set only if
    // the process itself decided to keep going (it is never cleared here).
    if stop.is_set() {
        tracing::info!("stop flag already set entering song, playing LED pattern anyway");
    }

    let resolved = Source::resolve(base, stop.clone())?;

    let mut outcome = SongOutcome::default();
    let mut stats = verbose.then(|| StatsRing::new(6000));

    match resolved {
        None => {
            tracing::info!(song = %base.display(), "no audio asset found, LED-only playback");
            let ticker_outcome = ticker::run(gpio.clone(), &patterns, stop.clone());
            outcome.ticks_issued = ticker_outcome.ticks_issued;
            outcome.stopped_early = ticker_outcome.stopped_early;
        }
        Some((mut source, format)) => {
            let sink = match Sink::open(format) {
                Ok(sink) => Some(sink),
                Err(e) => {
                    tracing::warn!(error = %e, "audio device unavailable, falling back to LED-only");
                    None
                }
            };

            match sink {
                Some(sink) => {
                    outcome.audio_played = true;
                    // Both tasks own everything they touch outright so
                    // neither has to cross the thread boundary by reference;
                    // the writer closes its sink and source when its loop
                    // ends, the ticker only ever touches the shared GPIO
                    // window through the `Arc<dyn GpioSink>`.
                    let writer_stop = stop.clone();
                    let writer_handle = std::thread::Builder::new()
                        .name("audio-writer".into())
                        .spawn(move || {
                            let mut stats = stats;
                            let wo = writer::run(&sink, &mut source, &writer_stop, stats.as_mut());
                            let _ = sink.drain();
                            sink.close();
                            source.close();
                            (wo, stats)
                        })
                        .expect("failed to spawn audio writer thread");

                    let ticker_gpio = gpio.clone();
                    let ticker_stop = stop.clone();
                    let ticker_patterns = patterns.clone();
                    let ticker_handle = std::thread::Builder::new()
                        .name("lamp-ticker".into())
                        .spawn(move || ticker::run(ticker_gpio, &ticker_patterns, ticker_stop))
                        .expect("failed to spawn lamp ticker thread");

                    // Join the writer first (bounded by audio length), then
                    // the ticker (bounded by pattern length); the shorter one
                    // finishes and sits quiescent until the other ends, per
                    // §4.7 step 6.
                    let (writer_outcome, returned_stats) =
                        writer_handle.join().expect("writer thread panicked");
                    let ticker_outcome = ticker_handle.join().expect("ticker thread panicked");

                    outcome.underrun_count = writer_outcome.underrun_count;
                    outcome.buffer_stall_count = writer_outcome.buffer_stall_count;
                    outcome.ticks_issued = ticker_outcome.ticks_issued;
                    outcome.stopped_early =
                        writer_outcome.stopped_early || ticker_outcome.stopped_early;
                    stats = returned_stats;
                }
                None => {
                    let ticker_outcome = ticker::run(gpio.clone(), &patterns, stop.clone());
                    outcome.ticks_issued = ticker_outcome.ticks_issued;
                    outcome.stopped_early = ticker_outcome.stopped_early;
                    source.close();
                }
            }
        }
    }

    gpio.configure_as_output(&pattern::LAMP_LINES);
    all_lamps_off(gpio.as_ref());

    if let Some(stats) = stats {
        crate::report::log_summary(base, &stats, &outcome);
    }

    Ok(outcome)
}

fn all_lamps_off(gpio: &dyn GpioSink) {
    let mask = pattern::lamp_mask();
    gpio.clear_bits(mask);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::GpioSink;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGpio {
        cleared: Mutex<Vec<u32>>,
    }

    impl GpioSink for RecordingGpio {
        fn configure_as_output(&self, _lines: &[u32]) {}
        fn set_bits(&self, _mask: u32) {}
        fn clear_bits(&self, mask: u32) {
            self.cleared.lock().unwrap().push(mask);
        }
    }

    #[test]
    fn s2_missing_audio_plays_led_only_with_no_sink() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("song");
        std::fs::write(base.with_extension("txt"), "100 10101010\n100 01010101\n").unwrap();

        let gpio: Arc<dyn GpioSink> = Arc::new(RecordingGpio::default());
        let stop = StopFlag::new();
        let outcome = play_song(&base, gpio.clone(), stop, false).unwrap();

        assert!(!outcome.audio_played);
        assert_eq!(outcome.ticks_issued, 20);
    }

    #[test]
    fn missing_pattern_file_is_fatal_to_the_song() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nosuchsong");
        let gpio: Arc<dyn GpioSink> = Arc::new(RecordingGpio::default());
        let stop = StopFlag::new();
        let result = play_song(&base, gpio, stop, false);
        assert!(matches!(result, Err(crate::error::Error::AssetMissing { .. })));
    }

    #[test]
    fn audio_played_stays_false_when_sink_open_fails() {
        // A WAV asset resolves, but this test environment has no real sound
        // card, so `Sink::open` fails and playback must fall back to
        // LED-only without ever having claimed audio played.
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("song");
        std::fs::write(base.with_extension("txt"), "10 11111111\n").unwrap();
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(base.with_extension("wav"), spec).unwrap();
        for s in [0i16, 0, 1, 1] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let gpio: Arc<dyn GpioSink> = Arc::new(RecordingGpio::default());
        let stop = StopFlag::new();
        let outcome = play_song(&base, gpio, stop, false).unwrap();

        assert!(!outcome.audio_played);
        assert_eq!(outcome.ticks_issued, 1);
    }

    #[test]
    fn all_lamps_off_is_issued_at_song_end() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("song");
        std::fs::write(base.with_extension("txt"), "10 11111111\n").unwrap();

        let gpio = Arc::new(RecordingGpio::default());
        let stop = StopFlag::new();
        play_song(&base, gpio.clone(), stop, false).unwrap();

        assert!(!gpio.cleared.lock().unwrap().is_empty());
    }
}
