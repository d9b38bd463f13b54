//! Signal synthesis for the HF beacon.
//!
//! Builds a fixed-length mono 16-bit PCM buffer: waveform generators add
//! samples into caller-supplied regions, and the pulse scheduler lays out a
//! train of enveloped bursts at a fixed cadence. Nothing here knows about
//! devices or timing beyond sample counts.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod buffer;
mod error;
mod generators;
mod sample;
pub mod scheduler;

pub use buffer::{samples_for_millis, total_samples_for, SampleBuffer, ToneSpec, Waveform};
pub use error::{ScheduleError, SynthError};
pub use generators::{fade_hf_pulse, hf_pulse, sine_tone, FADE_SAMPLES};
pub use sample::{mix_into, MixReport};
pub use scheduler::{PulseSchedule, ScheduleResult};
