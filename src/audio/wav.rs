//! RIFF/WAVE parsing over a read-only memory mapping.
//!
//! The mapping is created and explicitly checked before any field of it is
//! touched — a prior revision of this loader strung the failure check onto
//! the same line as the file-descriptor close with a comma, which let a
//! failed mapping slip past unnoticed. Here the mapping result is bound to a
//! variable and matched before anything else happens.

use crate::audio::format::{AssetKind, AudioFormat};
use crate::error::{Error, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

const RIFF_HEADER_LEN: usize = 12; // "RIFF" + size(4) + "WAVE"

pub struct WavFile {
    map: Mmap,
    pub format: AudioFormat,
    data_offset: usize,
    data_len: usize,
    /// Set once `mlock` over the data region succeeds; informational only.
    pub locked: bool,
}

impl WavFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|_| Error::AssetMissing { path: path.to_path_buf() })?;

        // SAFETY: the file is not expected to be truncated concurrently by
        // another writer during this process's lifetime.
        let mapped = unsafe { Mmap::map(&file) };
        let map = match mapped {
            Ok(m) => m,
            Err(_) => {
                return Err(Error::FormatRejected { reason: "mmap failed".into() });
            }
        };

        if map.len() < RIFF_HEADER_LEN || &map[0..4] != b"RIFF" || &map[8..12] != b"WAVE" {
            return Err(Error::FormatRejected { reason: "not a RIFF/WAVE file".into() });
        }

        let (format, data_offset, data_len) = Self::parse_chunks(&map)?;

        let locked = unsafe {
            libc::mlock(
                map.as_ptr().add(data_offset) as *const libc::c_void,
                data_len,
            ) == 0
        };

        Ok(WavFile { map, format, data_offset, data_len, locked })
    }

    fn parse_chunks(buf: &[u8]) -> Result<(AudioFormat, usize, usize)> {
        let mut pos = RIFF_HEADER_LEN;
        let mut fmt: Option<AudioFormat> = None;
        let mut data: Option<(usize, usize)> = None;

        while pos + 8 <= buf.len() {
            let id = &buf[pos..pos + 4];
            let size = u32::from_le_bytes(buf[pos + 4..pos + 8].try_into().unwrap()) as usize;
            let body = pos + 8;
            if body + size > buf.len() {
                break;
            }

            if id == b"fmt " {
                if size < 16 {
                    return Err(Error::FormatRejected { reason: "fmt chunk too short".into() });
                }
                let tag = u16::from_le_bytes(buf[body..body + 2].try_into().unwrap());
                let channels = u16::from_le_bytes(buf[body + 2..body + 4].try_into().unwrap());
                let sample_rate = u32::from_le_bytes(buf[body + 4..body + 8].try_into().unwrap());
                let bits_per_sample =
                    u16::from_le_bytes(buf[body + 14..body + 16].try_into().unwrap());
                if tag != 1 {
                    return Err(Error::FormatRejected { reason: format!("format tag {tag} is not PCM") });
                }
                if bits_per_sample != 16 {
                    return Err(Error::FormatRejected {
                        reason: format!("{bits_per_sample}-bit samples unsupported"),
                    });
                }
                fmt = Some(AudioFormat {
                    sample_rate_hz: sample_rate,
                    channels,
                    kind: AssetKind::Pcm,
                });
            } else if id == b"data" {
                data = Some((body, size));
            }

            pos = body + size + (size % 2); // chunks are word-aligned
        }

        let format = fmt.ok_or_else(|| Error::FormatRejected { reason: "missing fmt chunk".into() })?;
        let (data_offset, data_len) =
            data.ok_or_else(|| Error::FormatRejected { reason: "missing data chunk".into() })?;
        Ok((format, data_offset, data_len))
    }

    pub fn total_frames(&self) -> usize {
        let frame_size = self.format.channels as usize * 2;
        self.data_len / frame_size
    }

    /// Raw interleaved i16 PCM, little-endian in the mapping, native-endian here.
    pub fn samples_from(&self, frame_offset: usize, max_frames: usize) -> &[u8] {
        let frame_size = self.format.channels as usize * 2;
        let start = self.data_offset + frame_offset * frame_size;
        let available = self.total_frames().saturating_sub(frame_offset);
        let n = max_frames.min(available);
        &self.map[start..start + n * frame_size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, frames: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in frames {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn parses_valid_pcm16_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.wav");
        write_test_wav(&path, 44_100, 2, &[1, -1, 2, -2, 3, -3]);

        let wav = WavFile::open(&path).unwrap();
        assert_eq!(wav.format.sample_rate_hz, 44_100);
        assert_eq!(wav.format.channels, 2);
        assert_eq!(wav.total_frames(), 3);
    }

    #[test]
    fn rejects_missing_file() {
        let result = WavFile::open(Path::new("/nonexistent/audio.wav"));
        assert!(matches!(result, Err(Error::AssetMissing { .. })));
    }

    #[test]
    fn rejects_non_riff_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"not a wav file at all").unwrap();

        let result = WavFile::open(&path);
        assert!(matches!(result, Err(Error::FormatRejected { .. })));
    }
}
