//! Benchmarks for the shaping functions.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_engine::dsp::curve::{inv_t_from_u, shaped_t};

pub fn bench_curve(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/curve");
    let inputs: Vec<f32> = (0..1024).map(|i| i as f32 / 1023.0).collect();

    for shape in [0.0f32, 0.5, -0.5] {
        group.bench_with_input(BenchmarkId::new("shaped_t", shape), &shape, |b, &shape| {
            b.iter(|| {
                inputs
                    .iter()
                    .map(|&t| shaped_t(black_box(t), shape))
                    .sum::<f32>()
            })
        });

        group.bench_with_input(
            BenchmarkId::new("inv_t_from_u", shape),
            &shape,
            |b, &shape| {
                b.iter(|| {
                    inputs
                        .iter()
                        .map(|&u| inv_t_from_u(black_box(u), shape))
                        .sum::<f32>()
                })
            },
        );
    }

    group.finish();
}
