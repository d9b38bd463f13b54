//! CPAL-based audio output device.
//!
//! `write` pushes mono samples into a ring buffer drained by the cpal callback.
//! When the ring is full the writer parks on a condvar that the callback
//! notifies after every block, so the device clock paces the writer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, Device, SampleRate, SizedSample, Stream, StreamConfig, SupportedBufferSize,
    SupportedStreamConfig,
};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::traits::{
    AccessMode, AudioDevice, ConfigError, DeviceOpenError, HwParams, Negotiation, SampleFormat,
    TransferError, DEFAULT_DEVICE,
};

/// Periods of audio the ring buffer holds.
const RING_PERIODS: usize = 4;

/// Longest a blocked writer sleeps before re-checking for cancellation.
const WAIT_SLICE: Duration = Duration::from_millis(2);

/// Period used when the device reports no buffer size range.
const FALLBACK_PERIOD: usize = 1024;

/// State shared with the cpal callback.
#[derive(Default)]
struct Shared {
    wake: Mutex<()>,
    space: Condvar,
    /// Set once the first block has been queued; starvation before that is
    /// not an underrun.
    primed: AtomicBool,
    starved_frames: AtomicU64,
    stream_error: Mutex<Option<String>>,
}

impl Shared {
    fn wait_for_space(&self) {
        let guard = self.wake.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = self
            .space
            .wait_timeout(guard, WAIT_SLICE)
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn take_error(&self) -> Option<String> {
        self.stream_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Frames starved since the last call, advancing `seen`.
    fn take_starved(&self, seen: &mut u64) -> Option<u64> {
        let starved = self.starved_frames.load(Ordering::Relaxed);
        if starved <= *seen {
            return None;
        }
        let frames = starved - *seen;
        *seen = starved;
        Some(frames)
    }

    fn report_error(&self, msg: String) {
        *self.stream_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(msg);
        self.space.notify_all();
    }
}

/// Output device backed by the default cpal host.
pub struct CpalDevice {
    device: Device,
    name: String,
    default_config: SupportedStreamConfig,
    /// Format of the chosen stream config; samples are converted in the callback.
    device_format: cpal::SampleFormat,
    config: StreamConfig,
    params: HwParams,
    stream: Option<Stream>,
    producer: Option<HeapProd<i16>>,
    shared: Arc<Shared>,
    playing: bool,
    starved_seen: u64,
    closed: bool,
}

impl CpalDevice {
    /// Open an output device by name; `"default"` picks the host default.
    pub fn open(name: &str) -> Result<Self, DeviceOpenError> {
        let host = cpal::default_host();
        let device = if name == DEFAULT_DEVICE {
            host.default_output_device()
                .ok_or(DeviceOpenError::NoDefault)?
        } else {
            host.output_devices()
                .map_err(|e| DeviceOpenError::Enumerate(e.to_string()))?
                .find(|d| d.name().is_ok_and(|n| n == name))
                .ok_or_else(|| DeviceOpenError::NotFound(name.to_string()))?
        };

        let default_config = device
            .default_output_config()
            .map_err(|e| DeviceOpenError::Stream(e.to_string()))?;
        let config = default_config.config();
        let period_size = match default_config.buffer_size() {
            SupportedBufferSize::Range { min, max } => {
                FALLBACK_PERIOD.clamp(*min as usize, *max as usize)
            }
            SupportedBufferSize::Unknown => FALLBACK_PERIOD,
        };
        let params = HwParams {
            channels: config.channels,
            sample_rate: config.sample_rate.0,
            period_size,
            format: SampleFormat::S16Le,
            access: AccessMode::Interleaved,
        };

        Ok(Self {
            name: device.name().unwrap_or_else(|_| name.to_string()),
            device,
            device_format: default_config.sample_format(),
            default_config,
            config,
            params,
            stream: None,
            producer: None,
            shared: Arc::new(Shared::default()),
            playing: false,
            starved_seen: 0,
            closed: false,
        })
    }

    /// Pick the supported config closest to `hints`: the rate must be in
    /// range, matching channel count preferred, i16 preferred over f32.
    fn choose_config(
        &self,
        hints: &HwParams,
        rejected: &mut Vec<ConfigError>,
    ) -> SupportedStreamConfig {
        let rate = SampleRate(hints.sample_rate);
        let ranges = match self.device.supported_output_configs() {
            Ok(ranges) => ranges.collect::<Vec<_>>(),
            Err(e) => {
                rejected.push(ConfigError::Query(e.to_string()));
                Vec::new()
            }
        };

        ranges
            .into_iter()
            .filter(|r| r.min_sample_rate() <= rate && rate <= r.max_sample_rate())
            .filter_map(|r| format_rank(r.sample_format()).map(|rank| (r, rank)))
            .min_by_key(|(r, rank)| (r.channels() != hints.channels, *rank))
            .map(|(r, _)| r.with_sample_rate(rate))
            .unwrap_or_else(|| self.default_config.clone())
    }

    fn build_stream(&mut self) -> Result<(), DeviceOpenError> {
        let capacity = self.params.period_size.max(1) * RING_PERIODS;
        let (producer, consumer) = HeapRb::<i16>::new(capacity).split();
        self.shared = Arc::new(Shared::default());

        let stream = match self.device_format {
            cpal::SampleFormat::I16 => self.open_stream::<i16>(consumer),
            cpal::SampleFormat::F32 => self.open_stream::<f32>(consumer),
            other => {
                return Err(DeviceOpenError::Stream(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|e| DeviceOpenError::Stream(e.to_string()))?;

        debug!(
            device = %self.name,
            channels = self.config.channels,
            rate = self.config.sample_rate.0,
            format = ?self.device_format,
            "output stream built"
        );

        self.stream = Some(stream);
        self.producer = Some(producer);
        self.playing = false;
        self.starved_seen = 0;
        Ok(())
    }

    fn open_stream<T>(&self, mut consumer: HeapCons<i16>) -> Result<Stream, cpal::BuildStreamError>
    where
        T: SizedSample + cpal::FromSample<i16>,
    {
        let channels = self.config.channels.max(1) as usize;
        let shared = self.shared.clone();
        let err_shared = self.shared.clone();

        self.device.build_output_stream(
            &self.config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut starved = 0u64;
                // Mono source: the same sample goes to every channel of the frame.
                for frame in data.chunks_mut(channels) {
                    let sample = consumer.try_pop().unwrap_or_else(|| {
                        starved += 1;
                        0
                    });
                    frame.fill(T::from_sample_(sample));
                }
                if starved > 0 && shared.primed.load(Ordering::Relaxed) {
                    shared.starved_frames.fetch_add(starved, Ordering::Relaxed);
                }
                shared.space.notify_all();
            },
            move |err| err_shared.report_error(err.to_string()),
            None,
        )
    }

    fn start(&mut self) -> Result<(), TransferError> {
        if self.playing {
            return Ok(());
        }
        if let Some(stream) = &self.stream {
            stream
                .play()
                .map_err(|e| TransferError::Stream(e.to_string()))?;
            self.shared.primed.store(true, Ordering::Relaxed);
            self.playing = true;
        }
        Ok(())
    }
}

fn format_rank(format: cpal::SampleFormat) -> Option<u8> {
    match format {
        cpal::SampleFormat::I16 => Some(0),
        cpal::SampleFormat::F32 => Some(1),
        _ => None,
    }
}

impl AudioDevice for CpalDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, hints: &HwParams) -> Result<Negotiation, DeviceOpenError> {
        let mut rejected = Vec::new();
        let chosen = self.choose_config(hints, &mut rejected);

        // cpal only does interleaved buffers; mono input is fanned out per frame.
        if hints.access != AccessMode::Interleaved {
            rejected.push(ConfigError::Access {
                requested: hints.access,
            });
        }
        if chosen.sample_format() != cpal::SampleFormat::I16 {
            rejected.push(ConfigError::Format {
                requested: hints.format,
            });
        }
        if chosen.channels() != hints.channels {
            rejected.push(ConfigError::Channels {
                requested: hints.channels,
                actual: chosen.channels(),
            });
        }
        if chosen.sample_rate().0 != hints.sample_rate {
            rejected.push(ConfigError::SampleRate {
                requested: hints.sample_rate,
                actual: chosen.sample_rate().0,
            });
        }

        let (buffer_size, period_size) = match chosen.buffer_size() {
            SupportedBufferSize::Range { min, max } => {
                let period = hints.period_size.clamp(*min as usize, *max as usize);
                (BufferSize::Fixed(period as u32), period)
            }
            SupportedBufferSize::Unknown => (BufferSize::Default, hints.period_size),
        };
        if period_size != hints.period_size {
            rejected.push(ConfigError::PeriodSize {
                requested: hints.period_size,
                actual: period_size,
            });
        }

        self.device_format = chosen.sample_format();
        self.config = StreamConfig {
            channels: chosen.channels(),
            sample_rate: chosen.sample_rate(),
            buffer_size,
        };
        self.params = HwParams {
            channels: chosen.channels(),
            sample_rate: chosen.sample_rate().0,
            period_size,
            format: SampleFormat::S16Le,
            access: AccessMode::Interleaved,
        };

        self.stream = None;
        self.build_stream()?;

        Ok(Negotiation {
            params: self.params,
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
        if self.stream.is_none() {
            let hints = self.params;
            self.configure(&hints)
                .map_err(|e| TransferError::Stream(e.to_string()))?;
        }

        let mut written = 0;
        while written < samples.len() {
            if cancel.is_cancelled() {
                return Err(TransferError::Interrupted);
            }
            let Some(producer) = self.producer.as_mut() else {
                return Err(TransferError::Closed);
            };
            written += producer.push_slice(&samples[written..]);
            if written < samples.len() {
                // Ring is full: make sure the callback is consuming, then wait.
                self.start()?;
                self.shared.wait_for_space();
            }
        }
        self.start()?;

        if let Some(msg) = self.shared.take_error() {
            return Err(TransferError::Stream(msg));
        }
        // This write's samples are queued; an earlier gap is only reported.
        if let Some(frames) = self.shared.take_starved(&mut self.starved_seen) {
            warn!(frames, device = %self.name, "underrun");
        }
        Ok(written)
    }

    fn drain(&mut self) {
        if self.producer.as_ref().map_or(true, |p| p.is_empty()) {
            return;
        }
        if let Err(e) = self.start() {
            warn!("drain: {}", e);
            return;
        }
        let Some(producer) = self.producer.as_ref() else {
            return;
        };

        // Allow twice the ring's play time before giving up.
        let ring_secs = producer.capacity().get() as f64 / self.params.sample_rate.max(1) as f64;
        let deadline = Instant::now() + Duration::from_secs_f64(ring_secs * 2.0);
        while !producer.is_empty() {
            if Instant::now() >= deadline {
                warn!(remaining = producer.occupied_len(), "drain timed out");
                break;
            }
            self.shared.wait_for_space();
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("pause on close failed: {}", e);
            }
        }
        self.producer = None;
        self.playing = false;
        self.closed = true;
        debug!(device = %self.name, "device closed");
    }
}
