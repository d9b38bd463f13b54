//! Waveform generators.
//!
//! Every generator *adds* into the region it is given, so bursts and tones can
//! overlap. Sums are clamped to the i16 range (see [`mix_into`]) and the number
//! of clamped samples is reported back. Phase always starts at zero for each
//! call; callers that need a continuous tone must render it in one call.

use core::f64::consts::PI;

use crate::sample::{mix_into, MixReport};

/// Length of the linear fade-in and fade-out of [`fade_hf_pulse`], in samples.
pub const FADE_SAMPLES: usize = 10;

/// Add a sine tone of `frequency_hz` scaled by `volume`.
///
/// Sample `i` receives `round(sin(2π·i / (sample_rate / frequency_hz)) · volume)`.
pub fn sine_tone(
    region: &mut [i16],
    sample_rate: u32,
    frequency_hz: f64,
    volume: i32,
) -> MixReport {
    let samples_per_cycle = sample_rate as f64 / frequency_hz;
    let mut report = MixReport::default();

    for (i, sample) in region.iter_mut().enumerate() {
        let val = libm::sin(2.0 * PI * i as f64 / samples_per_cycle);
        if mix_into(sample, libm::round(val * volume as f64) as i64) {
            report.clamped += 1;
        }
    }
    report
}

/// Add the three-level "HF" pulse: a repeating −1, 0, +1 step pattern.
///
/// Roughly a `sample_rate / 3` Hz buzz, cheap and non-sinusoidal.
pub fn hf_pulse(region: &mut [i16], volume: i32) -> MixReport {
    let mut report = MixReport::default();

    for (pos, sample) in region.iter_mut().enumerate() {
        if mix_into(sample, step(pos) * volume as i64) {
            report.clamped += 1;
        }
    }
    report
}

/// Add the three-level pulse with a linear fade at both ends.
///
/// The first [`FADE_SAMPLES`] positions scale the volume by `pos / 10`, the last
/// ones by `remaining / 10`, both with truncating integer division. In regions
/// shorter than twice the fade both ramps apply at once.
pub fn fade_hf_pulse(region: &mut [i16], volume: i32) -> MixReport {
    let len = region.len();
    let mut report = MixReport::default();

    for (pos, sample) in region.iter_mut().enumerate() {
        let mut fade = volume as i64;

        if pos < FADE_SAMPLES {
            fade = fade * pos as i64 / FADE_SAMPLES as i64;
        }

        let remaining = len - (pos + 1);
        if remaining < FADE_SAMPLES {
            fade = fade * remaining as i64 / FADE_SAMPLES as i64;
        }

        if mix_into(sample, step(pos) * fade) {
            report.clamped += 1;
        }
    }
    report
}

#[inline]
fn step(pos: usize) -> i64 {
    (pos % 3) as i64 - 1
}
