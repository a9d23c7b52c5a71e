//! Scenario benchmarks.
//!
//! Model a dense timeline played block by block, with and without the synth
//! consuming the events.

mod playback;

pub use playback::{bench_playback, bench_scheduler};
