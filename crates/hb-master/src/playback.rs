//! Looping playback of a finished buffer.
//!
//! The buffer is streamed period by period and wraps back to the start
//! forever; only a cancelled [`CancelToken`] ends playback. Transfer errors
//! are logged and skipped.

use hb_audio::{AudioDevice, CancelToken, TransferError};
use hb_synth::SampleBuffer;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("period size must be positive")]
    ZeroPeriod,
    #[error("buffer of {len} samples is shorter than one period of {period}")]
    BufferTooShort { len: usize, period: usize },
}

/// Owns a device and guarantees it is drained and closed exactly once,
/// either through [`Session::release`] or on drop.
pub struct Session<D: AudioDevice> {
    device: D,
    released: bool,
}

impl<D: AudioDevice> Session<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            released: false,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Drain and close the device. Later calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.device.drain();
        self.device.close();
        debug!(device = self.device.name(), "device released");
    }
}

impl<D: AudioDevice> Drop for Session<D> {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Streaming,
    Terminated,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Successful writes.
    pub transfers: u64,
    /// Writes the device rejected; the period was skipped. Late underruns
    /// on a queued write are logged by the device and count as transfers.
    pub transfer_errors: u64,
    /// Completed traversals of the buffer.
    pub laps: u64,
}

/// Outcome of one [`Player::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// A period was handed to the device (or failed and was skipped).
    Advanced,
    /// As `Advanced`, and the cursor wrapped to the start of the buffer.
    Wrapped,
    /// Playback is not streaming.
    Stopped,
}

/// Playback state machine: Idle, then Streaming until cancelled.
pub struct Player<D: AudioDevice> {
    session: Session<D>,
    buffer: SampleBuffer,
    period_size: usize,
    cursor: usize,
    state: PlayerState,
    stats: PlaybackStats,
}

impl<D: AudioDevice> Player<D> {
    pub fn new(
        session: Session<D>,
        buffer: SampleBuffer,
        period_size: usize,
    ) -> Result<Self, PlaybackError> {
        if period_size == 0 {
            return Err(PlaybackError::ZeroPeriod);
        }
        if buffer.len() < period_size {
            return Err(PlaybackError::BufferTooShort {
                len: buffer.len(),
                period: period_size,
            });
        }
        Ok(Self {
            session,
            buffer,
            period_size,
            cursor: 0,
            state: PlayerState::Idle,
            stats: PlaybackStats::default(),
        })
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn session(&self) -> &Session<D> {
        &self.session
    }

    /// Idle -> Streaming, cursor at the start of the buffer.
    pub fn start(&mut self) {
        if self.state == PlayerState::Idle {
            self.cursor = 0;
            self.state = PlayerState::Streaming;
        }
    }

    /// Transfer one period and advance the cursor.
    pub fn step(&mut self, cancel: &CancelToken) -> Step {
        if self.state != PlayerState::Streaming {
            return Step::Stopped;
        }
        if cancel.is_cancelled() {
            self.terminate();
            return Step::Stopped;
        }

        let Some(chunk) = self.buffer.chunk(self.cursor, self.period_size) else {
            self.cursor = 0;
            return Step::Wrapped;
        };

        match self.session.device_mut().write(chunk, cancel) {
            Ok(_) => self.stats.transfers += 1,
            Err(TransferError::Interrupted) => {
                self.terminate();
                return Step::Stopped;
            }
            Err(e) => {
                self.stats.transfer_errors += 1;
                warn!(cursor = self.cursor, "at playing: {}", e);
            }
        }

        self.cursor += self.period_size;
        if self.cursor + self.period_size > self.buffer.len() {
            self.cursor = 0;
            self.stats.laps += 1;
            debug!(lap = self.stats.laps, "played");
            return Step::Wrapped;
        }
        Step::Advanced
    }

    /// Stream until `cancel` fires, then release the device.
    pub fn run(&mut self, cancel: &CancelToken) -> PlaybackStats {
        self.start();
        while self.step(cancel) != Step::Stopped {}
        self.stats
    }

    fn terminate(&mut self) {
        self.state = PlayerState::Terminated;
        self.session.release();
    }
}
