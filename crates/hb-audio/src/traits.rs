//! Audio device trait, hardware parameters and error types.

use thiserror::Error;

use crate::cancel::CancelToken;

/// Name that selects the host's default output device.
pub const DEFAULT_DEVICE: &str = "default";

/// Sample encoding handed to the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    /// Signed 16-bit little-endian.
    S16Le,
}

/// How samples are laid out in a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMode {
    /// Read/write transfers with interleaved channels.
    Interleaved,
}

/// Hardware parameters, either requested (hints) or in effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HwParams {
    pub channels: u16,
    pub sample_rate: u32,
    /// Frames per transfer.
    pub period_size: usize,
    pub format: SampleFormat,
    pub access: AccessMode,
}

impl HwParams {
    /// Mono S16LE interleaved parameters.
    pub fn mono(sample_rate: u32, period_size: usize) -> Self {
        Self {
            channels: 1,
            sample_rate,
            period_size,
            format: SampleFormat::S16Le,
            access: AccessMode::Interleaved,
        }
    }
}

/// Result of applying hints to a device.
///
/// `params` are the values in effect and must be used for all sizing;
/// `rejected` lists every hint the device did not accept as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Negotiation {
    pub params: HwParams,
    pub rejected: Vec<ConfigError>,
}

impl Negotiation {
    pub fn accepted(params: HwParams) -> Self {
        Self {
            params,
            rejected: Vec::new(),
        }
    }
}

/// The device could not be acquired. Fatal.
#[derive(Error, Debug)]
pub enum DeviceOpenError {
    #[error("no output device named \"{0}\"")]
    NotFound(String),
    #[error("no default output device available")]
    NoDefault,
    #[error("failed to enumerate output devices: {0}")]
    Enumerate(String),
    #[error("failed to create output stream: {0}")]
    Stream(String),
}

/// A hardware parameter could not be set. Non-fatal: the device keeps
/// whatever value it accepted instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("can't set access mode {requested:?}")]
    Access { requested: AccessMode },
    #[error("can't set format {requested:?}")]
    Format { requested: SampleFormat },
    #[error("can't set {requested} channels, using {actual}")]
    Channels { requested: u16, actual: u16 },
    #[error("can't set rate {requested} Hz, using {actual} Hz")]
    SampleRate { requested: u32, actual: u32 },
    #[error("can't set period of {requested} frames, using {actual}")]
    PeriodSize { requested: usize, actual: usize },
    #[error("can't read supported configurations: {0}")]
    Query(String),
}

/// A single write failed. Non-fatal: playback continues with the next chunk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("underrun: device starved for {frames} frames")]
    Underrun { frames: u64 },
    #[error("stream error: {0}")]
    Stream(String),
    #[error("write interrupted by shutdown")]
    Interrupted,
    #[error("device is closed")]
    Closed,
}

/// An audio output device.
pub trait AudioDevice {
    /// Human readable device name.
    fn name(&self) -> &str;

    /// Apply parameter hints and prepare the device for writing.
    ///
    /// The negotiated parameters may differ from `hints`; refused hints are
    /// listed, not returned as errors. Fails only if the device cannot be
    /// prepared at all.
    fn configure(&mut self, hints: &HwParams) -> Result<Negotiation, DeviceOpenError>;

    /// Parameters currently in effect.
    fn params(&self) -> HwParams;

    /// Write mono samples, blocking until the device has taken all of them
    /// or `cancel` fires. Returns the number of frames written.
    fn write(&mut self, samples: &[i16], cancel: &CancelToken) -> Result<usize, TransferError>;

    /// Block until queued samples have been played.
    fn drain(&mut self);

    /// Release the device. Further writes fail with [`TransferError::Closed`].
    fn close(&mut self);
}
