//! Benchmarks for the envelope curve and generator.

mod curve;
mod envelope;

pub use curve::bench_curve;
pub use envelope::bench_envelope;
