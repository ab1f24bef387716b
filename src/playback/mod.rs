//! Playback subsystem: the two real-time periodic tasks (lamp ticker, audio
//! writer), the deadline scheduler they share, bounded timing statistics,
//! and the coordinator that assembles a song and runs both to completion.

pub mod coordinator;
pub mod sched;
pub mod stats;
pub mod ticker;
pub mod writer;

pub use coordinator::{play_song, SongOutcome};
