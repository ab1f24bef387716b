//! Error types for the playback engine.
//!
//! The error kinds mirror the propagation policy of the design: most are
//! recovered locally by the component that raised them (an under-run, a
//! denied real-time priority, a failed page-lock) and never escape to a
//! caller as a hard failure. They keep a typed identity anyway so logs and
//! tests can tell "transient, recovered" apart from "fatal to this song".

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type returned by fallible engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO errors from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The pattern file for a song could not be read. Fatal to the song.
    #[error("pattern file missing or unreadable: {path}")]
    AssetMissing { path: PathBuf },

    /// The WAV/MP3 asset was rejected by its parser or decoder. Fatal to the song.
    #[error("audio format rejected: {reason}")]
    FormatRejected { reason: String },

    /// The PCM sink could not be opened; playback continues LED-only.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A periodic task could not obtain the requested real-time priority.
    #[error("real-time priority denied: {0}")]
    PriorityDenied(String),

    /// `mlock` on the WAV mapping failed; the real-time guarantee degrades to soft.
    #[error("page lock denied: {0}")]
    LockDenied(String),

    /// ALSA error surfaced from a sink operation.
    #[error("ALSA error: {0}")]
    Alsa(#[from] alsa::Error),

    /// Symphonia probe/decode error, rendered to text since it is not `Send + Sync + 'static` cleanly across threads.
    #[error("decoder error: {0}")]
    Decode(String),

    /// Configuration/CLI errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic context-carrying error for the outer control-plane (CLI, UDP, menu).
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Local-recovery classification for a raised error.
///
/// Per the error handling design, transient device conditions are recovered
/// in place by the component that sees them; this enum exists for the rare
/// caller (coordinator, tests) that needs to decide whether to abort the
/// current song or keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The component already recovered; no action needed upstream.
    Recovered,
    /// The current song must be aborted; the process may continue to the next.
    AbortSong,
}

impl Error {
    /// Recommended recovery policy for this error, per §7 of the design.
    pub fn recovery(&self) -> Recovery {
        match self {
            Error::AssetMissing { .. } => Recovery::AbortSong,
            Error::FormatRejected { .. } => Recovery::AbortSong,
            Error::DeviceUnavailable(_) => Recovery::Recovered, // LED-only fallback
            Error::PriorityDenied(_) => Recovery::Recovered,    // default-priority fallback
            Error::LockDenied(_) => Recovery::Recovered,        // soft real-time fallback
            Error::Alsa(_) => Recovery::Recovered,
            Error::Decode(_) => Recovery::AbortSong,
            Error::Io(_) => Recovery::AbortSong,
            Error::Config(_) => Recovery::AbortSong,
            Error::Other(_) => Recovery::AbortSong,
        }
    }

    /// Short code for log correlation, matching the error kind names in the design.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "LS_IO",
            Error::AssetMissing { .. } => "LS_ASSET_MISSING",
            Error::FormatRejected { .. } => "LS_FORMAT_REJECTED",
            Error::DeviceUnavailable(_) => "LS_DEVICE_UNAVAILABLE",
            Error::PriorityDenied(_) => "LS_PRIORITY_DENIED",
            Error::LockDenied(_) => "LS_LOCK_DENIED",
            Error::Alsa(_) => "LS_ALSA",
            Error::Decode(_) => "LS_DECODE",
            Error::Config(_) => "LS_CONFIG",
            Error::Other(_) => "LS_OTHER",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_missing_aborts_song() {
        let e = Error::AssetMissing { path: PathBuf::from("song.txt") };
        assert_eq!(e.recovery(), Recovery::AbortSong);
        assert_eq!(e.code(), "LS_ASSET_MISSING");
    }

    #[test]
    fn device_unavailable_recovers() {
        let e = Error::DeviceUnavailable("no default PCM device".into());
        assert_eq!(e.recovery(), Recovery::Recovered);
    }

    #[test]
    fn codes_are_distinct_per_variant() {
        use std::collections::HashSet;
        let errs: Vec<Error> = vec![
            Error::AssetMissing { path: PathBuf::from("x") },
            Error::FormatRejected { reason: "x".into() },
            Error::DeviceUnavailable("x".into()),
            Error::PriorityDenied("x".into()),
            Error::LockDenied("x".into()),
            Error::Decode("x".into()),
            Error::Config("x".into()),
        ];
        let codes: HashSet<_> = errs.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errs.len());
    }
}
