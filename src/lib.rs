//! # lumisync
//!
//! Real-time lamp-pattern and audio playback engine for an 8-lamp GPIO
//! display, driven from a per-song pattern file and an optional WAV/MP3
//! asset.
//!
//! **Architecture:** two SCHED_FIFO periodic tasks (a 10 ms lamp ticker and
//! a 30 ms audio writer) sharing only a stop flag and a GPIO register
//! window, coordinated per song by [`playback::coordinator`].

pub mod audio;
pub mod config;
pub mod control;
pub mod error;
pub mod gpio;
pub mod pattern;
pub mod playback;
pub mod report;
pub mod signal;

pub use error::{Error, Result};
