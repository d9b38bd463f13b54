//! Synthesis phase: size the buffer from negotiated parameters and render
//! the burst train into it.

use hb_audio::HwParams;
use hb_synth::{total_samples_for, SampleBuffer, ScheduleError};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::BeaconConfig;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SynthesisError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("{seconds} s at {rate} Hz holds no full period of {period} frames")]
    NoFullPeriod { seconds: u32, rate: u32, period: usize },
}

/// Build the beacon buffer for the parameters the device actually accepted.
pub fn synthesize(
    config: &BeaconConfig,
    params: &HwParams,
) -> Result<SampleBuffer, SynthesisError> {
    let total = total_samples_for(params.sample_rate, config.duration_seconds, params.period_size);
    if total == 0 || params.period_size == 0 {
        return Err(SynthesisError::NoFullPeriod {
            seconds: config.duration_seconds,
            rate: params.sample_rate,
            period: params.period_size,
        });
    }

    let schedule = config.schedule_for(params.sample_rate)?;
    let mut buffer = SampleBuffer::new(params.sample_rate, total);
    let result = schedule.schedule(&mut buffer);

    info!(
        total,
        cadence = schedule.period_samples(),
        burst = schedule.burst_length_samples(),
        max_bits = schedule.max_bits(total),
        bursts = result.bursts(),
        "synthesised beacon buffer"
    );
    if result.bursts() < schedule.bit_count() {
        warn!(
            requested = schedule.bit_count(),
            emitted = result.bursts(),
            "buffer too short for every bit"
        );
    }
    if result.mix.clamped > 0 {
        warn!(clamped = result.mix.clamped, "samples clamped to i16 range");
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_beacon_layout() {
        let config = BeaconConfig::default();
        let buffer = synthesize(&config, &config.hints()).unwrap();
        assert_eq!(buffer.len(), 88064);
        assert_eq!(buffer.peak(), 16000);

        let last_burst_end = 9 * 2205 + 44;
        assert!(buffer.samples()[9 * 2205..last_burst_end].iter().any(|&s| s != 0));
        assert!(buffer.samples()[last_burst_end..].iter().all(|&s| s == 0));
    }

    #[test]
    fn sizes_from_negotiated_params() {
        let config = BeaconConfig::default();
        let buffer = synthesize(&config, &HwParams::mono(48000, 940)).unwrap();
        assert_eq!(buffer.sample_rate(), 48000);
        assert_eq!(buffer.len(), 96000 - 96000 % 940);
        // 50 ms at 48 kHz
        assert!(buffer.samples()[2400 + 20] != 0);
    }

    #[test]
    fn rejects_buffer_without_full_period() {
        let config = BeaconConfig {
            duration_seconds: 1,
            ..BeaconConfig::default()
        };
        let err = synthesize(&config, &HwParams::mono(1000, 2048)).unwrap_err();
        assert_eq!(
            err,
            SynthesisError::NoFullPeriod {
                seconds: 1,
                rate: 1000,
                period: 2048
            }
        );
    }
}
