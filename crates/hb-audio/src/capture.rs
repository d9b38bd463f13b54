//! In-memory output device.
//!
//! Records every write instead of playing it. Used for offline runs and to
//! drive the playback loop in tests, including scripted transfer failures and
//! a shutdown request arriving after a number of writes.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::traits::{
    AudioDevice, ConfigError, DeviceOpenError, HwParams, Negotiation, TransferError,
};

/// Drain and close counters, shared so they survive the device being dropped.
#[derive(Debug, Default)]
pub struct Lifecycle {
    drains: AtomicUsize,
    closes: AtomicUsize,
}

impl Lifecycle {
    pub fn drains(&self) -> usize {
        self.drains.load(Ordering::Relaxed)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::Relaxed)
    }
}

pub struct CaptureDevice {
    name: String,
    params: HwParams,
    /// Parameters the device insists on, if any.
    fixed: Option<HwParams>,
    written: Vec<i16>,
    writes: usize,
    fail_writes: BTreeSet<usize>,
    cancel_after: Option<usize>,
    interrupt_at: Option<usize>,
    closed: bool,
    lifecycle: Arc<Lifecycle>,
}

impl CaptureDevice {
    /// A device that accepts any parameters.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: HwParams::mono(44100, 1024),
            fixed: None,
            written: Vec::new(),
            writes: 0,
            fail_writes: BTreeSet::new(),
            cancel_after: None,
            interrupt_at: None,
            closed: false,
            lifecycle: Arc::new(Lifecycle::default()),
        }
    }

    /// Only accept `params`; differing hints are reported as rejected.
    pub fn with_fixed_params(mut self, params: HwParams) -> Self {
        self.params = params;
        self.fixed = Some(params);
        self
    }

    /// Fail the write with this zero-based index with an underrun.
    pub fn fail_write(mut self, index: usize) -> Self {
        self.fail_writes.insert(index);
        self
    }

    /// Cancel the caller's token once `writes` writes have completed.
    pub fn cancel_after(mut self, writes: usize) -> Self {
        self.cancel_after = Some(writes);
        self
    }

    /// Cancel the caller's token while the write with this zero-based index
    /// is blocked, and fail it as interrupted.
    pub fn interrupt_write(mut self, index: usize) -> Self {
        self.interrupt_at = Some(index);
        self
    }

    /// Samples accepted so far, in order.
    pub fn written(&self) -> &[i16] {
        &self.written
    }

    /// Number of write calls, failed ones included.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        self.lifecycle.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl AudioDevice for CaptureDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, hints: &HwParams) -> Result<Negotiation, DeviceOpenError> {
        let Some(fixed) = self.fixed else {
            self.params = *hints;
            return Ok(Negotiation::accepted(self.params));
        };

        let mut rejected = Vec::new();
        if hints.channels != fixed.channels {
            rejected.push(ConfigError::Channels {
                requested: hints.channels,
                actual: fixed.channels,
            });
        }
        if hints.sample_rate != fixed.sample_rate {
            rejected.push(ConfigError::SampleRate {
                requested: hints.sample_rate,
                actual: fixed.sample_rate,
            });
        }
        if hints.period_size != fixed.period_size {
            rejected.push(ConfigError::PeriodSize {
                requested: hints.period_size,
                actual: fixed.period_size,
            });
        }
        Ok(Negotiation {
            params: fixed,
            rejected,
        })
    }

    fn params(&self) -> HwParams {
        self.params
    }

    fn write(&mut self, samples: &[i16], cancel: &CancelToken) -> Result<usize, TransferError> {
        if self.closed {
            return Err(TransferError::Closed);
        }
        if cancel.is_cancelled() {
            return Err(TransferError::Interrupted);
        }

        let index = self.writes;
        self.writes += 1;
        if self.interrupt_at == Some(index) {
            cancel.cancel();
            return Err(TransferError::Interrupted);
        }
        if self.cancel_after.is_some_and(|n| self.writes >= n) {
            cancel.cancel();
        }

        if self.fail_writes.contains(&index) {
            return Err(TransferError::Underrun {
                frames: samples.len() as u64,
            });
        }
        self.written.extend_from_slice(samples);
        Ok(samples.len())
    }

    fn drain(&mut self) {
        self.lifecycle.drains.fetch_add(1, Ordering::Relaxed);
    }

    fn close(&mut self) {
        self.closed = true;
        self.lifecycle.closes.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_any_hints_by_default() {
        let mut dev = CaptureDevice::new("capture");
        let hints = HwParams::mono(48000, 512);
        let negotiation = dev.configure(&hints).unwrap();
        assert_eq!(negotiation.params, hints);
        assert!(negotiation.rejected.is_empty());
        assert_eq!(dev.params(), hints);
    }

    #[test]
    fn fixed_params_report_rejections() {
        let mut dev = CaptureDevice::new("capture").with_fixed_params(HwParams::mono(48000, 940));
        let negotiation = dev.configure(&HwParams::mono(44100, 1024)).unwrap();
        assert_eq!(negotiation.params.sample_rate, 48000);
        assert_eq!(negotiation.params.period_size, 940);
        assert_eq!(
            negotiation.rejected,
            [
                ConfigError::SampleRate {
                    requested: 44100,
                    actual: 48000
                },
                ConfigError::PeriodSize {
                    requested: 1024,
                    actual: 940
                },
            ]
        );
    }

    #[test]
    fn records_writes_and_scripted_failures() {
        let cancel = CancelToken::new();
        let mut dev = CaptureDevice::new("capture").fail_write(1);
        assert_eq!(dev.write(&[1, 2], &cancel), Ok(2));
        assert_eq!(dev.write(&[3, 4], &cancel), Err(TransferError::Underrun { frames: 2 }));
        assert_eq!(dev.write(&[5, 6], &cancel), Ok(2));
        assert_eq!(dev.written(), &[1, 2, 5, 6]);
        assert_eq!(dev.writes(), 3);
    }

    #[test]
    fn cancel_after_fires_token() {
        let cancel = CancelToken::new();
        let mut dev = CaptureDevice::new("capture").cancel_after(2);
        dev.write(&[0], &cancel).unwrap();
        assert!(!cancel.is_cancelled());
        dev.write(&[0], &cancel).unwrap();
        assert!(cancel.is_cancelled());
        assert_eq!(dev.write(&[0], &cancel), Err(TransferError::Interrupted));
    }

    #[test]
    fn interrupted_write_cancels_token() {
        let cancel = CancelToken::new();
        let mut dev = CaptureDevice::new("capture").interrupt_write(1);
        assert_eq!(dev.write(&[1], &cancel), Ok(1));
        assert_eq!(dev.write(&[2], &cancel), Err(TransferError::Interrupted));
        assert!(cancel.is_cancelled());
        assert_eq!(dev.written(), &[1]);
        assert_eq!(dev.writes(), 2);
    }

    #[test]
    fn closed_device_refuses_writes() {
        let mut dev = CaptureDevice::new("capture");
        let lifecycle = dev.lifecycle();
        dev.close();
        assert!(dev.is_closed());
        assert_eq!(lifecycle.closes(), 1);
        assert_eq!(dev.write(&[0], &CancelToken::new()), Err(TransferError::Closed));
    }
}
