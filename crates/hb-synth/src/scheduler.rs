//! Pulse scheduling.
//!
//! Lays out a train of enveloped bursts at a fixed cadence from the start of
//! the buffer. Each burst stands for one beacon bit; only presence is encoded.

use alloc::vec::Vec;

use crate::buffer::{samples_for_millis, SampleBuffer};
use crate::error::ScheduleError;
use crate::generators::fade_hf_pulse;
use crate::sample::MixReport;

/// Validated cadence, burst length and bit count of a beacon train.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseSchedule {
    period_samples: usize,
    burst_length_samples: usize,
    bit_count: usize,
    volume: i32,
}

/// Where bursts were placed and how many samples clipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleResult {
    /// Start offset of every emitted burst, ascending.
    pub offsets: Vec<usize>,
    pub mix: MixReport,
}

impl ScheduleResult {
    pub fn bursts(&self) -> usize {
        self.offsets.len()
    }
}

impl PulseSchedule {
    /// Create a schedule, rejecting empty bursts, bursts that do not fit in
    /// one period and a zero bit count.
    pub fn new(
        period_samples: usize,
        burst_length_samples: usize,
        bit_count: usize,
        volume: i32,
    ) -> Result<Self, ScheduleError> {
        if burst_length_samples == 0 {
            return Err(ScheduleError::EmptyBurst);
        }
        if period_samples <= burst_length_samples {
            return Err(ScheduleError::PeriodTooShort {
                period: period_samples,
                burst: burst_length_samples,
            });
        }
        if bit_count == 0 {
            return Err(ScheduleError::NoBits);
        }
        Ok(Self {
            period_samples,
            burst_length_samples,
            bit_count,
            volume,
        })
    }

    /// Create a schedule from a millisecond cadence and burst duration.
    pub fn from_millis(
        cadence_ms: u32,
        burst_ms: u32,
        sample_rate: u32,
        bit_count: usize,
        volume: i32,
    ) -> Result<Self, ScheduleError> {
        Self::new(
            samples_for_millis(cadence_ms, sample_rate),
            samples_for_millis(burst_ms, sample_rate),
            bit_count,
            volume,
        )
    }

    pub fn period_samples(&self) -> usize {
        self.period_samples
    }

    pub fn burst_length_samples(&self) -> usize {
        self.burst_length_samples
    }

    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    pub fn volume(&self) -> i32 {
        self.volume
    }

    /// Number of cadence ticks that fit in a buffer of `buffer_len` samples.
    pub fn max_bits(&self, buffer_len: usize) -> usize {
        buffer_len / self.period_samples
    }

    /// Render the burst train into `buffer`.
    ///
    /// Bursts start at `0, P, 2P, …` and stop after `bit_count` bursts or when
    /// the next one would run past the end of the buffer.
    pub fn schedule(&self, buffer: &mut SampleBuffer) -> ScheduleResult {
        let mut result = ScheduleResult::default();
        let mut offset = 0;

        while result.offsets.len() < self.bit_count {
            let Ok(region) = buffer.region_mut(offset, self.burst_length_samples) else {
                break;
            };
            result.mix.merge(fade_hf_pulse(region, self.volume));
            result.offsets.push(offset);
            offset += self.period_samples;
        }

        result
    }
}
