//! Verbose-mode CSV timing report, written once per song when `-v` is set.
//!
//! Thin adapter over [`StatsRing`]: not part of the correctness contract,
//! and never consulted by playback itself, mirroring
//! `examples/original_source/src/player.c`'s `save_runtime_log`/
//! `make_log_filename`.

use crate::playback::coordinator::SongOutcome;
use crate::playback::stats::StatsRing;
use chrono::Local;
use std::io::Write as _;
use std::path::Path;

fn log_filename(prefix: &str, song: &str) -> String {
    let now = Local::now();
    format!("{prefix}_{song}_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Render `stats` (and the song's final outcome) to a CSV file in the
/// current directory, named `audio_log_<song>_<timestamp>.csv`. Failures
/// are logged and otherwise swallowed — a missing report never fails the
/// song that produced it.
pub fn log_summary(base: &Path, stats: &StatsRing, outcome: &SongOutcome) {
    let song = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "song".to_string());

    let filename = log_filename("audio_log", &song);
    if let Err(e) = write_csv(&filename, stats, outcome) {
        tracing::warn!(error = %e, file = %filename, "failed to write verbose timing report");
    } else {
        tracing::info!(file = %filename, "wrote verbose timing report");
    }
}

fn write_csv(path: &str, stats: &StatsRing, outcome: &SongOutcome) -> std::io::Result<()> {
    let mut f = std::fs::File::create(path)?;
    writeln!(
        f,
        "# underrun_count={},buffer_stall_count={},ticks_issued={},audio_played={},stopped_early={}",
        outcome.underrun_count,
        outcome.buffer_stall_count,
        outcome.ticks_issued,
        outcome.audio_played,
        outcome.stopped_early,
    )?;
    writeln!(f, "cycle,jitter_us,runtime_us,sink_pending_frames,ring_available_frames")?;
    for (i, obs) in stats.iter().enumerate() {
        writeln!(
            f,
            "{},{},{},{},{}",
            i,
            obs.jitter_ns / 1_000,
            obs.runtime.as_micros(),
            obs.sink_pending_frames,
            obs.ring_available_frames,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::stats::CycleObservation;
    use std::time::Duration;

    #[test]
    fn filename_carries_prefix_and_song_name() {
        let name = log_filename("audio_log", "jingle");
        assert!(name.starts_with("audio_log_jingle_"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn writes_a_csv_with_header_and_one_row_per_observation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        let mut stats = StatsRing::new(10);
        stats.push(CycleObservation {
            jitter_ns: 100_000,
            runtime: Duration::from_micros(200),
            sink_pending_frames: 441,
            ring_available_frames: 4410,
        });
        let outcome = SongOutcome { ticks_issued: 5, underrun_count: 1, ..Default::default() };

        write_csv(path.to_str().unwrap(), &stats, &outcome).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert!(lines.next().unwrap().starts_with("# underrun_count=1"));
        assert_eq!(
            lines.next().unwrap(),
            "cycle,jitter_us,runtime_us,sink_pending_frames,ring_available_frames"
        );
        assert_eq!(lines.next().unwrap(), "0,100,200,441,4410");
    }
}
