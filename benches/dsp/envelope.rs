//! Benchmarks for the shaped ADSR envelope generator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_engine::dsp::{curve::EnvelopeTiming, envelope::Envelope};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (curved ramp)
        let mut env = Envelope::adsr(SAMPLE_RATE, EnvelopeTiming::new(10.0, 0.1, 0.3), 0.7)
            .with_shape(0.5);
        env.note_on();
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer));
            })
        });

        // Sustain phase (holding steady)
        let mut env = Envelope::adsr(SAMPLE_RATE, EnvelopeTiming::new(0.001, 0.001, 0.3), 0.7);
        env.note_on();
        // Advance past attack/decay
        for _ in 0..200 {
            env.next_sample();
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer));
            })
        });

        // Retrigger (inverse curve lookup every block)
        let mut env = Envelope::adsr(SAMPLE_RATE, EnvelopeTiming::new(0.01, 0.01, 0.1), 0.7)
            .with_shape(-0.5);
        group.bench_with_input(BenchmarkId::new("retrigger", size), &size, |b, _| {
            b.iter(|| {
                env.note_on();
                env.render(black_box(&mut buffer));
                env.note_off();
            })
        });
    }

    group.finish();
}
