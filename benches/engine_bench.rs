//! Benchmarks for the envelope math, the scheduler and full playback.
//!
//! Run with: cargo bench
//!
//! Everything measured here runs on the audio thread and must finish well
//! within the block deadline.
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Curve functions and the envelope generator
//!   - scenarios/*  Scheduler blocks and scheduler + synth playback

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    dsp::bench_curve,
    dsp::bench_envelope,
    scenarios::bench_scheduler,
    scenarios::bench_playback,
);
criterion_main!(benches);
