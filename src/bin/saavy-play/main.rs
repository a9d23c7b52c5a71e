//! saavy-play - plays a demo timeline through the scheduler
//!
//! Run with: cargo run --bin saavy-play -- --loop --seconds 10
//! Use `--dry-run` to drive the engine from a timer thread instead of an
//! audio device. `RUST_LOG=debug` logs every scheduled event.

mod app;
mod demo;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use saavy_engine::config::{
    EngineConfig, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_VOICES, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SAMPLE_RATE,
};

use app::Player;

#[derive(Parser, Debug)]
#[command(name = "saavy-play", version, about = "Sample-accurate timeline playback")]
struct Args {
    /// Tempo of the demo timeline
    #[arg(long, default_value_t = 120.0)]
    bpm: f64,

    /// Loop the timeline until --seconds runs out
    #[arg(long = "loop")]
    looping: bool,

    /// Stop after this many seconds
    #[arg(long, default_value_t = 8.0)]
    seconds: f64,

    /// Frames per scheduler block
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_VOICES)]
    voices: usize,

    /// Envelope curvature, -1 (logarithmic) to 1 (exponential)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    shape: f32,

    /// Simulate the audio thread instead of opening a device
    #[arg(long)]
    dry_run: bool,

    /// Sample rate for --dry-run; a device uses its own
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: f32,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = EngineConfig {
        sample_rate: args.sample_rate,
        block_size: args.block_size,
        max_voices: args.voices,
        queue_capacity: DEFAULT_QUEUE_CAPACITY,
    };

    Player::new(config, demo::timeline(args.bpm))
        .looping(args.looping)
        .shape(args.shape)
        .run_for(args.seconds, args.dry_run)
}
