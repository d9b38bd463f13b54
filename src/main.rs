//! hfbeacon: loops a train of short HF bursts on an audio output device.
//!
//! Usage:
//!   hfbeacon
//!   hfbeacon --bits 20 --cadence-ms 25
//!   hfbeacon --dump output.pcm --dry-run

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hb_master::{Beacon, BeaconConfig, CancelToken};

/// Simple HF sound generator
#[derive(Parser, Debug)]
#[command(name = "hfbeacon", version)]
struct Cli {
    /// Output device name
    #[arg(long)]
    device: Option<String>,

    /// Requested sample rate in Hz
    #[arg(long)]
    rate: Option<u32>,

    /// Requested period size in frames
    #[arg(long)]
    period: Option<usize>,

    /// Buffer length in seconds
    #[arg(long)]
    duration: Option<u32>,

    /// Spacing between burst starts in milliseconds
    #[arg(long)]
    cadence_ms: Option<u32>,

    /// Burst length in milliseconds
    #[arg(long)]
    burst_ms: Option<u32>,

    /// Number of bursts
    #[arg(long)]
    bits: Option<usize>,

    /// Burst amplitude (0..=32767)
    #[arg(long)]
    volume: Option<i32>,

    /// Dump the buffer to this file (.wav for WAV, raw s16le otherwise)
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Synthesise (and dump) without opening a device
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn into_config(self) -> BeaconConfig {
        let defaults = BeaconConfig::default();
        BeaconConfig {
            device: self.device.unwrap_or(defaults.device),
            channels: defaults.channels,
            sample_rate: self.rate.unwrap_or(defaults.sample_rate),
            duration_seconds: self.duration.unwrap_or(defaults.duration_seconds),
            period_size: self.period.unwrap_or(defaults.period_size),
            cadence_ms: self.cadence_ms.unwrap_or(defaults.cadence_ms),
            burst_ms: self.burst_ms.unwrap_or(defaults.burst_ms),
            bit_count: self.bits.unwrap_or(defaults.bit_count),
            volume: self.volume.unwrap_or(defaults.volume),
            dump_path: self.dump,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let beacon = Beacon::new(cli.into_config()).context("bad beacon settings")?;

    if dry_run {
        return render_only(&beacon);
    }

    let cancel = CancelToken::new();
    let player_cancel = cancel.clone();
    // cpal streams are not Send, so the device lives entirely on this thread.
    let mut playback = tokio::task::spawn_blocking(move || beacon.play(&player_cancel));

    let stats = tokio::select! {
        res = &mut playback => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
            cancel.cancel();
            playback.await
        }
    }
    .context("playback task panicked")??;

    tracing::info!(laps = stats.laps, "done");
    Ok(())
}

fn render_only(beacon: &Beacon) -> Result<()> {
    let buffer = beacon.render().context("synthesis failed")?;
    match &beacon.config().dump_path {
        Some(path) => beacon.dump(path, &buffer)?,
        None => tracing::info!(
            samples = buffer.len(),
            peak = buffer.peak(),
            "dry run, nothing to dump"
        ),
    }
    Ok(())
}
