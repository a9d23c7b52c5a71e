//! Benchmarks for the scheduler alone and scheduler + synth.

use std::{collections::VecDeque, hint::black_box};

use criterion::{BenchmarkId, Criterion};
use saavy_engine::{
    engine::{allocator::VoiceAllocator, Scheduler, SchedulerCommand, SchedulerEvent, TimedEvent},
    sequencing::{FlattenedTimeline, Timeline},
    synth::{PolySynth, SynthMessage, VoiceSettings},
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

/// Four bars of sixteenth notes on four channels.
fn dense_timeline() -> FlattenedTimeline {
    let ppq = 480u64;
    let mut timeline = Timeline::new(120.0, ppq as u32).with_bars(4, 4);
    for channel in 0..4u8 {
        for step in 0..64u64 {
            let key = 48 + channel * 7 + (step % 12) as u8;
            timeline = timeline.note(step * ppq / 4, ppq / 8, channel, key, 100);
        }
    }
    timeline
        .flatten(SAMPLE_RATE)
        .expect("benchmark timeline should flatten")
}

fn looping_scheduler(events: Vec<TimedEvent>, duration: u64) -> Scheduler {
    let mut scheduler = Scheduler::new();
    let mut sink = Vec::new();
    scheduler.apply(
        SchedulerCommand::Load {
            events,
            duration_samples: duration,
        },
        &mut sink,
    );
    scheduler.set_loop(true);
    scheduler.play();
    scheduler
}

pub fn bench_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/scheduler");
    let (events, duration) = dense_timeline().into_parts();

    for &size in BLOCK_SIZES {
        let mut scheduler = looping_scheduler(events.clone(), duration);
        let mut commands: VecDeque<SchedulerCommand> = VecDeque::new();
        let mut sink: Vec<SchedulerEvent> = Vec::with_capacity(1024);
        let mut clock = 0u64;

        group.bench_with_input(BenchmarkId::new("process_block", size), &size, |b, &size| {
            b.iter(|| {
                sink.clear();
                scheduler.process_block(black_box(clock), size, &mut commands, &mut sink);
                clock += size as u64;
            })
        });
    }

    group.finish();
}

pub fn bench_playback(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/playback");
    let (events, duration) = dense_timeline().into_parts();

    for &size in BLOCK_SIZES {
        let mut scheduler = looping_scheduler(events.clone(), duration);
        let mut synth = PolySynth::new(
            SAMPLE_RATE,
            16,
            VoiceSettings::default(),
            VecDeque::<SynthMessage>::new(),
        );
        let mut commands: VecDeque<SchedulerCommand> = VecDeque::new();
        let mut sink: Vec<SchedulerEvent> = Vec::with_capacity(1024);
        let mut buffer = vec![0.0f32; size];
        let mut clock = 0u64;

        group.bench_with_input(BenchmarkId::new("16_voices", size), &size, |b, &size| {
            b.iter(|| {
                sink.clear();
                scheduler.process_block(clock, size, &mut commands, &mut sink);
                for event in &sink {
                    if let SchedulerEvent::Midi { event, .. } = *event {
                        synth.handle_event(event);
                    }
                }
                synth.render_block(black_box(&mut buffer));
                clock += size as u64;
            })
        });
    }

    group.finish();
}
