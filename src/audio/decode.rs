//! Background MP3 decoder feeding the ring buffer.
//!
//! Runs at default scheduling priority on its own thread: one packet
//! decoded, one period worth of frames pushed (blocking) into the ring,
//! repeat until end-of-stream or the stop flag is set.

use crate::audio::format::{AssetKind, AudioFormat, SUPPORTED_RATES};
use crate::audio::ring_buffer::RingBuffer;
use crate::error::{Error, Result};
use crate::signal::StopFlag;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// An MP3 opened and probed, but not yet handed to a decoder thread. Split
/// out from `spawn` so the caller learns the format (and can size the ring
/// buffer correctly) before any decoding starts.
pub struct OpenedMp3 {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
}

impl OpenedMp3 {
    pub fn open(path: &Path) -> Result<(Self, AudioFormat)> {
        let file = File::open(path).map_err(|_| Error::AssetMissing { path: path.to_path_buf() })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        hint.with_extension("mp3");

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::Decode(format!("probe failed: {e}")))?;
        let format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| Error::FormatRejected { reason: "no audio track in MP3".into() })?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| Error::FormatRejected { reason: "MP3 has no sample rate".into() })?;
        let channels = params.channels.map(|c| c.count()).unwrap_or(0) as u16;

        if !SUPPORTED_RATES.contains(&sample_rate) {
            return Err(Error::FormatRejected { reason: format!("unsupported rate {sample_rate} Hz") });
        }
        if !(1..=2).contains(&channels) {
            return Err(Error::FormatRejected { reason: format!("unsupported channel count {channels}") });
        }

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("no decoder for codec: {e}")))?;

        let descriptor = AudioFormat { sample_rate_hz: sample_rate, channels, kind: AssetKind::Compressed };
        Ok((OpenedMp3 { format, decoder, track_id }, descriptor))
    }

    /// Decode the next packet belonging to our track into interleaved i16.
    /// Returns `Ok(None)` at end of stream.
    fn decode_next(&mut self) -> Result<Option<Vec<i16>>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(e) => return Err(Error::Decode(format!("{e}"))),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = self
                .decoder
                .decode(&packet)
                .map_err(|e| Error::Decode(format!("{e}")))?;

            let spec = *decoded.spec();
            let frames = decoded.frames();
            let mut sample_buf = SampleBuffer::<i16>::new(frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            return Ok(Some(sample_buf.samples().to_vec()));
        }
    }
}

/// Handle to the running decoder thread.
pub struct DecoderHandle {
    join: Option<JoinHandle<()>>,
    finished: Arc<AtomicBool>,
}

impl DecoderHandle {
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn join(mut self) {
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

/// Spawn the decoder thread for an already-opened, already-probed MP3.
/// Takes the format back too, purely so callers can build the push loop's
/// expected-frame math without re-deriving channel count.
pub fn spawn(opened: OpenedMp3, format: AudioFormat, ring: Arc<RingBuffer>, stop: StopFlag) -> DecoderHandle {
    let mut decoder = opened;
    let finished = Arc::new(AtomicBool::new(false));
    let finished_thread = finished.clone();

    let join = std::thread::Builder::new()
        .name("mp3-decoder".into())
        .spawn(move || {
            loop {
                if stop.is_set() {
                    break;
                }
                match decoder.decode_next() {
                    Ok(Some(frames)) => {
                        let wanted = frames.len() / format.channels as usize;
                        if ring.push(&frames, &stop) < wanted {
                            // push returned early only because stop was set.
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "mp3 decode error, ending stream");
                        break;
                    }
                }
            }
            finished_thread.store(true, Ordering::Release);
        })
        .expect("failed to spawn decoder thread");

    DecoderHandle { join: Some(join), finished }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_reports_asset_missing_for_nonexistent_file() {
        let result = OpenedMp3::open(Path::new("/nonexistent/song.mp3"));
        assert!(matches!(result, Err(Error::AssetMissing { .. })));
    }
}
