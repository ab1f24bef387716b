//! ALSA PCM playback sink.
//!
//! Blocking interleaved writes at a negotiated ~10 ms period, with explicit
//! prepare/delay/drain operations so the writer can implement its own
//! under-run recovery rather than relying on ALSA's implicit xrun handling.
//!
//! The device-facing operations are factored into the [`PcmSink`] trait so
//! the writer task (and its tests) can run against a recording/fault-
//! injecting fake instead of a real sound card, the same way [`GpioSink`]
//! decouples the lamp ticker from real hardware.
//!
//! [`GpioSink`]: crate::gpio::GpioSink

use crate::audio::format::AudioFormat;
use crate::error::{Error, Result};
use alsa::pcm::{Access, Format as AlsaFormat, HwParams, PCM};
use alsa::{Direction, ValueOr};

const PREFILL_PERIODS: usize = 4;

/// The sink operations the audio writer needs: blocking writes, explicit
/// prepare/drain, and a pending-frame query. `write` returning
/// `Err(Error::Alsa(_))` signals an under-run the writer must recover from.
pub trait PcmSink {
    fn period_frames(&self) -> usize;
    fn channels(&self) -> u16;
    fn write(&self, frames: &[i16]) -> Result<usize>;
    fn prepare(&self) -> Result<()>;
    fn pending_frames(&self) -> Result<usize>;
    fn drain(&self) -> Result<()>;
}

pub struct Sink {
    pcm: PCM,
    period_frames: usize,
    channels: u16,
}

impl Sink {
    /// Open the default device at `format`'s rate/channels, negotiate a
    /// 10 ms period and a ~120 ms buffer, then prefill and flush per §4.2.
    pub fn open(format: AudioFormat) -> Result<Self> {
        let pcm = PCM::new("default", Direction::Playback, false)
            .map_err(|e| Error::DeviceUnavailable(format!("{e}")))?;

        let period_frames = format.period_frames();
        {
            let hwp = HwParams::any(&pcm).map_err(|e| Error::DeviceUnavailable(format!("{e}")))?;
            hwp.set_access(Access::RWInterleaved)?;
            hwp.set_format(AlsaFormat::s16())?;
            hwp.set_rate(format.sample_rate_hz, ValueOr::Nearest)?;
            hwp.set_channels(format.channels as u32)?;
            hwp.set_period_size(period_frames as i64, ValueOr::Nearest)?;
            hwp.set_buffer_size((period_frames * 12) as i64)?;
            pcm.hw_params(&hwp)?;
        }

        let sink = Sink { pcm, period_frames, channels: format.channels };
        sink.pcm.prepare()?;
        sink.prefill_silence()?;
        sink.pcm.drop()?;
        sink.pcm.prepare()?;
        Ok(sink)
    }

    fn prefill_silence(&self) -> Result<()> {
        let silence = vec![0i16; self.period_frames * self.channels as usize];
        for _ in 0..PREFILL_PERIODS {
            PcmSink::write(self, &silence)?;
        }
        Ok(())
    }

    pub fn close(self) {
        let _ = self.pcm.drop();
    }
}

impl PcmSink for Sink {
    fn period_frames(&self) -> usize {
        self.period_frames
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    /// Write exactly `frames.len() / channels` frames, blocking. Returns the
    /// frame count written, or `Error::Alsa` wrapping an under-run.
    fn write(&self, frames: &[i16]) -> Result<usize> {
        let io = self
            .pcm
            .io_i16()
            .map_err(|e| Error::DeviceUnavailable(format!("{e}")))?;
        match io.writei(frames) {
            Ok(n) => Ok(n),
            Err(e) => Err(Error::Alsa(e)),
        }
    }

    fn prepare(&self) -> Result<()> {
        self.pcm.prepare().map_err(Error::Alsa)
    }

    /// Frames currently queued in the hardware buffer, awaiting playback.
    fn pending_frames(&self) -> Result<usize> {
        self.pcm.status().map(|s| s.get_delay().max(0) as usize).map_err(Error::Alsa)
    }

    fn drain(&self) -> Result<()> {
        self.pcm.drain().map_err(Error::Alsa)
    }
}
