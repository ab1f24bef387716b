//! Uniform source-stream contract over the WAV-mapped and MP3-decoded paths.
//!
//! One enum, not a trait object: both variants are known at compile time
//! and the writer never branches on file extension — it resolves a `Source`
//! once in the coordinator and then only calls `available`, `read`, and
//! `finished`.

use crate::audio::decode::{self, DecoderHandle, OpenedMp3};
use crate::audio::format::AudioFormat;
use crate::audio::ring_buffer::RingBuffer;
use crate::audio::wav::WavFile;
use crate::error::Result;
use crate::signal::StopFlag;
use std::path::Path;
use std::sync::Arc;

pub enum Source {
    PcmMapped { wav: WavFile, position_frames: usize },
    CompressedDecoded { ring: Arc<RingBuffer>, decoder: DecoderHandle },
}

impl Source {
    /// Open `{base}.mp3` if present, else `{base}.wav`. Returns `None` when
    /// neither asset exists (LED-only playback).
    pub fn resolve(base: &Path, stop: StopFlag) -> Result<Option<(Self, AudioFormat)>> {
        let mp3_path = with_extension(base, "mp3");
        if mp3_path.exists() {
            let (opened, format) = OpenedMp3::open(&mp3_path)?;
            let ring = Arc::new(RingBuffer::new(format.ring_capacity_frames(), format.channels as usize));
            let decoder = decode::spawn(opened, format, ring.clone(), stop);
            return Ok(Some((Source::CompressedDecoded { ring, decoder }, format)));
        }

        let wav_path = with_extension(base, "wav");
        if wav_path.exists() {
            let wav = WavFile::open(&wav_path)?;
            let format = wav.format;
            return Ok(Some((Source::PcmMapped { wav, position_frames: 0 }, format)));
        }

        Ok(None)
    }

    pub fn available_frames(&self) -> usize {
        match self {
            Source::PcmMapped { wav, position_frames } => wav.total_frames() - position_frames,
            Source::CompressedDecoded { ring, .. } => ring.available_frames(),
        }
    }

    pub fn finished(&self) -> bool {
        match self {
            Source::PcmMapped { wav, position_frames } => *position_frames >= wav.total_frames(),
            Source::CompressedDecoded { ring, decoder, .. } => {
                decoder.finished() && ring.available_frames() == 0
            }
        }
    }

    /// Whether a below-one-period `available_frames()` should be treated as
    /// a transient buffer stall (there's a live producer that just hasn't
    /// caught up) rather than a real end-of-data tail.
    ///
    /// The mapped PCM variant has no producer running behind it — whatever
    /// is left in the mapping is final, so its last, shorter-than-one-period
    /// tail must still be read rather than stalled on forever (a prior
    /// version of this check stalled indefinitely on such a tail, since a
    /// `PcmMapped` source never flips `finished` until every frame has
    /// actually been read).
    pub fn awaiting_more_data(&self) -> bool {
        match self {
            Source::PcmMapped { .. } => false,
            Source::CompressedDecoded { decoder, .. } => !decoder.finished(),
        }
    }

    /// Copy up to `out.len() / channels` frames; returns the number copied.
    pub fn read(&mut self, out: &mut [i16]) -> usize {
        match self {
            Source::PcmMapped { wav, position_frames } => {
                let channels = wav.format.channels as usize;
                let requested = out.len() / channels;
                let bytes = wav.samples_from(*position_frames, requested);
                let n = bytes.len() / (channels * 2);
                for i in 0..(n * channels) {
                    let lo = bytes[i * 2] as i16;
                    let hi = bytes[i * 2 + 1] as i16;
                    out[i] = lo | (hi << 8);
                }
                *position_frames += n;
                n
            }
            Source::CompressedDecoded { ring, .. } => ring.pop(out),
        }
    }

    pub fn close(self) {
        if let Source::CompressedDecoded { decoder, .. } = self {
            decoder.join();
        }
    }
}

fn with_extension(base: &Path, ext: &str) -> std::path::PathBuf {
    let mut p = base.to_path_buf();
    p.set_extension(ext);
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_returns_none_when_no_asset_exists() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("missingsong");
        let result = Source::resolve(&base, StopFlag::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn resolve_prefers_mp3_over_wav_when_both_present() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("song");
        std::fs::write(dir.path().join("song.wav"), b"RIFF....WAVE").unwrap();
        // An .mp3 that isn't actually decodable still proves mp3 is tried
        // first: resolve() returns a Decode/FormatRejected error rather than
        // silently falling through to the (invalid) wav.
        std::fs::write(dir.path().join("song.mp3"), b"not really mp3").unwrap();
        let result = Source::resolve(&base, StopFlag::new());
        assert!(result.is_err());
    }
}
