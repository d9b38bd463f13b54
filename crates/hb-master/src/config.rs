//! Beacon constants.

use std::path::PathBuf;

use hb_audio::{HwParams, DEFAULT_DEVICE};
use hb_synth::{PulseSchedule, ScheduleError};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvalidConfig {
    #[error("{0} must be positive")]
    Zero(&'static str),
    #[error("volume {0} outside 0..=32767")]
    Volume(i32),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Everything that shapes a beacon run. Defaults reproduce the classic
/// 10-bit train: 1 ms bursts every 50 ms in a 2 s mono 44.1 kHz loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeaconConfig {
    pub device: String,
    pub channels: u16,
    /// Requested rate; the negotiated one is used for sizing.
    pub sample_rate: u32,
    pub duration_seconds: u32,
    /// Requested period in frames.
    pub period_size: usize,
    /// Spacing between burst starts.
    pub cadence_ms: u32,
    pub burst_ms: u32,
    pub bit_count: usize,
    pub volume: i32,
    /// Write the synthesised buffer here before playing.
    pub dump_path: Option<PathBuf>,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            channels: 1,
            sample_rate: 44100,
            duration_seconds: 2,
            period_size: 1024,
            cadence_ms: 50,
            burst_ms: 1,
            bit_count: 10,
            volume: 16000,
            dump_path: None,
        }
    }
}

impl BeaconConfig {
    /// Check the constants once, before any device is touched.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.channels == 0 {
            return Err(InvalidConfig::Zero("channel count"));
        }
        if self.sample_rate == 0 {
            return Err(InvalidConfig::Zero("sample rate"));
        }
        if self.duration_seconds == 0 {
            return Err(InvalidConfig::Zero("duration"));
        }
        if self.period_size == 0 {
            return Err(InvalidConfig::Zero("period size"));
        }
        if !(0..=i16::MAX as i32).contains(&self.volume) {
            return Err(InvalidConfig::Volume(self.volume));
        }
        self.schedule_for(self.sample_rate)?;
        Ok(())
    }

    /// Hardware parameter hints for the device.
    pub fn hints(&self) -> HwParams {
        HwParams {
            channels: self.channels,
            ..HwParams::mono(self.sample_rate, self.period_size)
        }
    }

    /// Burst schedule at `sample_rate`.
    pub fn schedule_for(&self, sample_rate: u32) -> Result<PulseSchedule, ScheduleError> {
        PulseSchedule::from_millis(
            self.cadence_ms,
            self.burst_ms,
            sample_rate,
            self.bit_count,
            self.volume,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BeaconConfig::default();
        assert_eq!(config.validate(), Ok(()));
        let sched = config.schedule_for(config.sample_rate).unwrap();
        assert_eq!(sched.period_samples(), 2205);
        assert_eq!(sched.burst_length_samples(), 44);
        assert_eq!(sched.bit_count(), 10);
    }

    #[test]
    fn hints_carry_requested_values() {
        let config = BeaconConfig {
            channels: 2,
            ..BeaconConfig::default()
        };
        let hints = config.hints();
        assert_eq!(hints.channels, 2);
        assert_eq!(hints.sample_rate, 44100);
        assert_eq!(hints.period_size, 1024);
    }

    #[test]
    fn rejects_zero_values() {
        let config = BeaconConfig {
            period_size: 0,
            ..BeaconConfig::default()
        };
        assert_eq!(config.validate(), Err(InvalidConfig::Zero("period size")));
    }

    #[test]
    fn rejects_burst_longer_than_cadence() {
        let config = BeaconConfig {
            cadence_ms: 1,
            burst_ms: 2,
            ..BeaconConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(InvalidConfig::Schedule(ScheduleError::PeriodTooShort {
                period: 44,
                burst: 88
            }))
        );
    }

    #[test]
    fn rejects_out_of_range_volume() {
        let config = BeaconConfig {
            volume: 40000,
            ..BeaconConfig::default()
        };
        assert_eq!(config.validate(), Err(InvalidConfig::Volume(40000)));
    }
}
