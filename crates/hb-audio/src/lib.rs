//! Audio output devices for the HF beacon.
//!
//! The playback loop only sees the [`AudioDevice`] trait: open, negotiate
//! hardware parameters, push blocks of mono i16 samples, drain and close.

mod cancel;
mod capture;
mod cpal_backend;
mod traits;

pub use cancel::CancelToken;
pub use capture::{CaptureDevice, Lifecycle};
pub use cpal_backend::CpalDevice;
pub use traits::{
    AccessMode, AudioDevice, ConfigError, DeviceOpenError, HwParams, Negotiation, SampleFormat,
    TransferError, DEFAULT_DEVICE,
};
