//! Allocation-free playback path tests.
//!
//! These tests verify that `Player::step()` does not allocate once streaming
//! has started: every transfer only slices the finished buffer.
//!
//! Just run `cargo test`, no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use hb_audio::{AudioDevice, CancelToken, DeviceOpenError, HwParams, Negotiation, TransferError};
use hb_master::{synthesize, BeaconConfig, Player, Session, Step};

/// Device that counts frames and keeps nothing.
struct SinkDevice {
    params: HwParams,
    frames: usize,
}

impl AudioDevice for SinkDevice {
    fn name(&self) -> &str {
        "sink"
    }

    fn configure(&mut self, hints: &HwParams) -> Result<Negotiation, DeviceOpenError> {
        self.params = *hints;
        Ok(Negotiation::accepted(self.params))
    }

    fn params(&self) -> HwParams {
        self.params
    }

    fn write(&mut self, samples: &[i16], _cancel: &CancelToken) -> Result<usize, TransferError> {
        self.frames += samples.len();
        Ok(samples.len())
    }

    fn drain(&mut self) {}

    fn close(&mut self) {}
}

fn sink_player(config: &BeaconConfig) -> Player<SinkDevice> {
    let params = config.hints();
    let buffer = synthesize(config, &params).unwrap();
    let device = SinkDevice { params, frames: 0 };
    Player::new(Session::new(device), buffer, params.period_size).unwrap()
}

/// Stream `laps` laps after a warm-up lap, aborting on any heap allocation.
fn assert_playback_alloc_free(config: &BeaconConfig, laps: u64) {
    let mut player = sink_player(config);
    let cancel = CancelToken::new();
    player.start();

    // Warm-up lap so one-time logging callsite registration happens outside.
    while player.step(&cancel) != Step::Wrapped {}

    assert_no_alloc(|| {
        let target = player.stats().laps + laps;
        while player.stats().laps < target {
            player.step(&cancel);
        }
    });

    assert_eq!(player.stats().laps, laps + 1);
    assert_eq!(
        player.session().device().frames,
        player.stats().transfers as usize * config.period_size
    );
}

#[test]
fn default_beacon_alloc_free() {
    assert_playback_alloc_free(&BeaconConfig::default(), 5);
}

#[test]
fn small_period_alloc_free() {
    let config = BeaconConfig {
        period_size: 64,
        ..BeaconConfig::default()
    };
    assert_playback_alloc_free(&config, 3);
}
