//! Headless controller for the HF beacon.
//!
//! Opens and configures the output device, synthesises the beacon buffer
//! for the negotiated parameters, optionally dumps it, and loops it until
//! cancelled.

mod config;
mod dump;
mod playback;
mod synthesis;

use std::io;
use std::path::{Path, PathBuf};

use hb_audio::{AudioDevice, CpalDevice, DeviceOpenError};
use thiserror::Error;
use tracing::{info, warn};

// Re-export common types so callers don't need hb-synth/hb-audio directly.
pub use hb_audio::{CancelToken, HwParams};
pub use hb_synth::SampleBuffer;

pub use config::{BeaconConfig, InvalidConfig};
pub use dump::{buffer_to_raw, dump_buffer, read_raw, write_raw, write_wav, WAV_HEADER_LEN};
pub use playback::{PlaybackError, PlaybackStats, Player, PlayerState, Session, Step};
pub use synthesis::{synthesize, SynthesisError};

#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("invalid configuration: {0}")]
    Config(#[from] InvalidConfig),
    #[error("can't open \"{device}\" PCM device: {source}")]
    Open {
        device: String,
        #[source]
        source: DeviceOpenError,
    },
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("can't write dump {}: {source}", .path.display())]
    Dump {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A validated beacon ready to render or play.
pub struct Beacon {
    config: BeaconConfig,
}

impl Beacon {
    pub fn new(config: BeaconConfig) -> Result<Self, BeaconError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BeaconConfig {
        &self.config
    }

    /// Synthesise at the requested parameters without touching a device.
    pub fn render(&self) -> Result<SampleBuffer, BeaconError> {
        Ok(synthesize(&self.config, &self.config.hints())?)
    }

    /// Write `buffer` to `path` (WAV for `.wav`, raw otherwise).
    pub fn dump(&self, path: &Path, buffer: &SampleBuffer) -> Result<(), BeaconError> {
        dump_buffer(path, buffer).map_err(|source| BeaconError::Dump {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), samples = buffer.len(), "buffer dumped");
        Ok(())
    }

    /// Play on the configured cpal device until `cancel` fires.
    pub fn play(&self, cancel: &CancelToken) -> Result<PlaybackStats, BeaconError> {
        let device = CpalDevice::open(&self.config.device).map_err(|source| BeaconError::Open {
            device: self.config.device.clone(),
            source,
        })?;
        self.play_on(device, cancel)
    }

    /// Configure `device`, synthesise for what it accepted and loop until
    /// `cancel` fires. The device is drained and closed on every return path.
    pub fn play_on<D: AudioDevice>(
        &self,
        device: D,
        cancel: &CancelToken,
    ) -> Result<PlaybackStats, BeaconError> {
        let mut session = Session::new(device);

        let negotiation = session
            .device_mut()
            .configure(&self.config.hints())
            .map_err(|source| BeaconError::Open {
                device: self.config.device.clone(),
                source,
            })?;
        for rejected in &negotiation.rejected {
            warn!("{}", rejected);
        }

        let params = negotiation.params;
        info!(
            device = session.device().name(),
            channels = params.channels,
            rate = params.sample_rate,
            period = params.period_size,
            duration = self.config.duration_seconds,
            "PCM configured"
        );

        let buffer = synthesize(&self.config, &params)?;
        if let Some(path) = &self.config.dump_path {
            self.dump(path, &buffer)?;
        }

        let mut player = Player::new(session, buffer, params.period_size)?;
        info!("playing");
        let stats = player.run(cancel);
        info!(
            laps = stats.laps,
            transfers = stats.transfers,
            errors = stats.transfer_errors,
            "playback stopped"
        );
        Ok(stats)
    }
}
