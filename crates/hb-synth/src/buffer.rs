//! Mono 16-bit sample buffer and tone placement.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::SynthError;
use crate::generators::{fade_hf_pulse, hf_pulse, sine_tone};
use crate::sample::MixReport;

/// Number of samples covering `duration_seconds`, truncated down to a whole
/// number of device periods so every transfer moves a full period.
///
/// A `period_size` of zero disables the truncation.
pub fn total_samples_for(sample_rate: u32, duration_seconds: u32, period_size: usize) -> usize {
    let samples = sample_rate as usize * duration_seconds as usize;
    if period_size == 0 {
        return samples;
    }
    samples - samples % period_size
}

/// Convert milliseconds to a sample count (truncating).
///
/// 50 ms at 44100 Hz is 2205 samples, 1 ms is 44.
pub fn samples_for_millis(ms: u32, sample_rate: u32) -> usize {
    (sample_rate as u64 * ms as u64 / 1000) as usize
}

/// Waveform used to render a [`ToneSpec`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    /// Sine at the tone's frequency.
    Sine,
    /// Three-level −1/0/+1 pulse (frequency ignored).
    Hf,
    /// Three-level pulse with linear fade in/out (frequency ignored).
    FadeHf,
}

/// One tone burst to place into a buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneSpec {
    pub frequency_hz: f64,
    /// Integer amplitude multiplier.
    pub volume: i32,
    /// Start sample index.
    pub offset: usize,
    /// Burst length in samples.
    pub length: usize,
}

/// Fixed-length mono PCM buffer.
///
/// Written once during synthesis, then only read during playback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a silent buffer of `total_samples` samples.
    pub fn new(sample_rate: u32, total_samples: usize) -> Self {
        Self {
            samples: vec![0; total_samples],
            sample_rate,
        }
    }

    /// Wrap existing sample data.
    pub fn from_samples(sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// `len` samples starting at `cursor`, or `None` if that runs past the end.
    pub fn chunk(&self, cursor: usize, len: usize) -> Option<&[i16]> {
        let end = cursor.checked_add(len)?;
        self.samples.get(cursor..end)
    }

    /// Mutable access to a bounds-checked region.
    pub fn region_mut(&mut self, offset: usize, length: usize) -> Result<&mut [i16], SynthError> {
        let len = self.samples.len();
        let out_of_bounds = SynthError::OutOfBounds {
            offset,
            length,
            len,
        };
        let end = offset.checked_add(length).ok_or(out_of_bounds)?;
        self.samples.get_mut(offset..end).ok_or(out_of_bounds)
    }

    /// Render `tone` with `waveform`, adding into the existing samples.
    pub fn add_tone(
        &mut self,
        tone: &ToneSpec,
        waveform: Waveform,
    ) -> Result<MixReport, SynthError> {
        let sample_rate = self.sample_rate;
        let region = self.region_mut(tone.offset, tone.length)?;

        Ok(match waveform {
            Waveform::Sine => sine_tone(region, sample_rate, tone.frequency_hz, tone.volume),
            Waveform::Hf => hf_pulse(region, tone.volume),
            Waveform::FadeHf => fade_hf_pulse(region, tone.volume),
        })
    }

    /// Largest absolute amplitude in the buffer.
    pub fn peak(&self) -> u16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_samples_truncates_to_period() {
        // 88200 - 88200 % 1024
        assert_eq!(total_samples_for(44100, 2, 1024), 88064);
        assert_eq!(total_samples_for(44100, 2, 1024) % 1024, 0);
        assert_eq!(total_samples_for(44100, 2, 0), 88200);
        assert_eq!(total_samples_for(48000, 1, 1000), 48000);
    }

    #[test]
    fn millis_to_samples() {
        assert_eq!(samples_for_millis(50, 44100), 2205);
        assert_eq!(samples_for_millis(1, 44100), 44);
        assert_eq!(samples_for_millis(1000, 48000), 48000);
    }

    #[test]
    fn new_is_silent() {
        let buf = SampleBuffer::new(44100, 16);
        assert_eq!(buf.len(), 16);
        assert!(buf.samples().iter().all(|&s| s == 0));
        assert_eq!(buf.peak(), 0);
    }

    #[test]
    fn chunk_respects_bounds() {
        let buf = SampleBuffer::new(44100, 8);
        assert_eq!(buf.chunk(4, 4).map(<[i16]>::len), Some(4));
        assert!(buf.chunk(5, 4).is_none());
        assert!(buf.chunk(usize::MAX, 2).is_none());
    }

    #[test]
    fn add_tone_rejects_out_of_bounds() {
        let mut buf = SampleBuffer::new(44100, 100);
        let tone = ToneSpec {
            frequency_hz: 0.0,
            volume: 1000,
            offset: 90,
            length: 20,
        };
        assert_eq!(
            buf.add_tone(&tone, Waveform::Hf),
            Err(SynthError::OutOfBounds {
                offset: 90,
                length: 20,
                len: 100
            })
        );
        assert!(buf.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn add_tone_writes_at_offset() {
        let mut buf = SampleBuffer::new(44100, 10);
        let tone = ToneSpec {
            frequency_hz: 0.0,
            volume: 7,
            offset: 4,
            length: 3,
        };
        buf.add_tone(&tone, Waveform::Hf).unwrap();
        assert_eq!(buf.samples(), &[0, 0, 0, 0, -7, 0, 7, 0, 0, 0]);
        assert_eq!(buf.peak(), 7);
    }

    #[test]
    fn tones_superimpose() {
        let mut buf = SampleBuffer::new(44100, 100);
        let sine = ToneSpec {
            frequency_hz: 441.0,
            volume: 1000,
            offset: 0,
            length: 100,
        };
        let hf = ToneSpec {
            frequency_hz: 0.0,
            volume: 100,
            offset: 24,
            length: 3,
        };
        buf.add_tone(&sine, Waveform::Sine).unwrap();
        buf.add_tone(&hf, Waveform::Hf).unwrap();
        // sample 25 is the sine peak plus the middle (zero) step
        assert_eq!(buf.samples()[25], 1000);
        assert_eq!(buf.samples()[26], buf_sine_at(26) + 100);
    }

    fn buf_sine_at(i: usize) -> i16 {
        let mut region = alloc::vec![0i16; i + 1];
        crate::sine_tone(&mut region, 44100, 441.0, 1000);
        region[i]
    }
}
