//! Audio subsystem: format descriptor, ring buffer, source streams, sink.

pub mod decode;
pub mod format;
pub mod ring_buffer;
pub mod sink;
pub mod source;
pub mod wav;

pub use format::AudioFormat;
pub use sink::Sink;
pub use source::Source;
