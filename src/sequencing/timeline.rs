/*
Timeline Flattening
===================

A `Timeline` is the symbolic form of a score: MIDI events placed on a
tick grid (`ppq` ticks per quarter note) at a fixed tempo. The scheduler knows
nothing about ticks or tempo; it wants absolute sample offsets in ascending
order. `flatten` does that conversion once, off the audio thread.

    samples_per_tick = sample_rate * 60 / (bpm * ppq)
    sample_time      = round(tick * samples_per_tick)

Example: 120 BPM, 480 PPQ, 48 kHz → 50 samples per tick, so beat 2 (tick 480)
lands on sample 24000.


Ordering
--------

Events are sorted by sample time. Ties keep a fixed order: program changes,
then controllers, then pitch bends, then note-offs, then note-ons. A note that
ends exactly where the next one on the same key starts is therefore released
before it is struck again, and a program change at sample 0 is in place before
the first note.


The End Of The Timeline
-----------------------

Nothing may sit at or after `duration_samples`: the scheduler would never fire
it before looping or ending. Note-ons and channel messages past the end are
dropped. Note-offs past the end are pulled back to the last sample, so a note
that overhangs the end is still released.
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    engine::scheduler::{first_unsorted, TimedEvent},
    io::midi::{MidiEvent, MidiEventKind, MIDI_CHANNELS},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    #[error("tempo must be a positive, finite BPM (got {0})")]
    InvalidTempo(f64),
    #[error("ticks per quarter note must be at least 1")]
    InvalidPpq,
    #[error("sample rate must be a positive, finite number of Hz (got {0})")]
    InvalidSampleRate(f32),
    #[error("timeline has zero length")]
    Empty,
    #[error("event {index} is earlier than the event before it")]
    Unsorted { index: usize },
}

/// A MIDI event on the tick grid.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    pub tick: u64,
    pub event: MidiEvent,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    /// Tempo in beats per minute
    pub bpm: f64,
    /// Pulses per quarter note (timing resolution)
    pub ppq: u32,
    /// Explicit length in ticks; `None` ends at the last event
    pub length_ticks: Option<u64>,
    pub events: Vec<TickEvent>,
}

impl Timeline {
    pub fn new(bpm: f64, ppq: u32) -> Self {
        Self {
            bpm,
            ppq,
            length_ticks: None,
            events: Vec::new(),
        }
    }

    /// Fix the length, e.g. to a whole number of bars for looping.
    pub fn with_length(mut self, ticks: u64) -> Self {
        self.length_ticks = Some(ticks);
        self
    }

    /// Length of `bars` bars of `beats_per_bar` quarter notes.
    pub fn with_bars(self, bars: u64, beats_per_bar: u64) -> Self {
        let ticks = bars * beats_per_bar * self.ppq as u64;
        self.with_length(ticks)
    }

    pub fn event(mut self, tick: u64, event: MidiEvent) -> Self {
        self.events.push(TickEvent { tick, event });
        self
    }

    /// A note-on at `tick` and its note-off `duration_ticks` later.
    pub fn note(self, tick: u64, duration_ticks: u64, channel: u8, key: u8, velocity: u8) -> Self {
        self.event(
            tick,
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            },
        )
        .event(
            tick + duration_ticks,
            MidiEvent::NoteOff {
                channel,
                key,
                velocity: 0,
            },
        )
    }

    pub fn control(self, tick: u64, channel: u8, controller: u8, value: u8) -> Self {
        self.event(
            tick,
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            },
        )
    }

    pub fn program(self, tick: u64, channel: u8, program: u8) -> Self {
        self.event(tick, MidiEvent::ProgramChange { channel, program })
    }

    pub fn pitch_bend(self, tick: u64, channel: u8, value: i16) -> Self {
        self.event(tick, MidiEvent::PitchBend { channel, value })
    }

    /// Explicit length, or the tick of the last event.
    pub fn length(&self) -> u64 {
        self.length_ticks
            .unwrap_or_else(|| self.events.iter().map(|e| e.tick).max().unwrap_or(0))
    }

    pub fn samples_per_tick(&self, sample_rate: f32) -> f64 {
        sample_rate as f64 * 60.0 / (self.bpm * self.ppq as f64)
    }

    /// Convert to absolute, sorted sample offsets.
    pub fn flatten(&self, sample_rate: f32) -> Result<FlattenedTimeline, TimelineError> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(TimelineError::InvalidTempo(self.bpm));
        }
        if self.ppq == 0 {
            return Err(TimelineError::InvalidPpq);
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(TimelineError::InvalidSampleRate(sample_rate));
        }

        let samples_per_tick = self.samples_per_tick(sample_rate);
        let to_sample = |tick: u64| (tick as f64 * samples_per_tick).round() as u64;

        let duration_samples = to_sample(self.length());
        if duration_samples == 0 {
            return Err(TimelineError::Empty);
        }
        let last_sample = duration_samples - 1;

        let mut events: Vec<TimedEvent> = self
            .events
            .iter()
            .filter_map(|e| {
                let sample_time = to_sample(e.tick);
                match e.event.kind() {
                    MidiEventKind::NoteOff => {
                        Some(TimedEvent::new(sample_time.min(last_sample), e.event))
                    }
                    _ if sample_time < duration_samples => Some(TimedEvent::new(sample_time, e.event)),
                    _ => None,
                }
            })
            .collect();

        sort_events(&mut events);
        separate_zero_length_notes(&mut events, duration_samples);

        Ok(FlattenedTimeline {
            events,
            duration_samples,
        })
    }
}

// Stable, so same-kind ties keep insertion order
fn sort_events(events: &mut [TimedEvent]) {
    events.sort_by_key(|e| (e.sample_time, e.event.order_rank()));
}

/// A note whose off lands on the sample of its own on would sort the off
/// first and hang. Such offs move one sample later, or the whole note is
/// dropped when that sample is past the end.
///
/// An off only belongs to a same-sample on when no earlier note on that key
/// is still open, so back-to-back notes keep their off-then-on order.
fn separate_zero_length_notes(events: &mut Vec<TimedEvent>, duration_samples: u64) {
    let slot = |channel: u8, key: u8| (channel as usize & 0x0f) * 128 + (key as usize & 0x7f);
    let mut open = vec![0u32; MIDI_CHANNELS as usize * 128];
    let mut remove = vec![false; events.len()];
    let mut closed = vec![false; events.len()];
    let mut moved = false;

    for index in 0..events.len() {
        let timed = events[index];
        match timed.event {
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            } if velocity > 0 => {
                if !closed[index] {
                    open[slot(channel, key)] += 1;
                }
            }
            MidiEvent::NoteOff { channel, key, .. } => {
                let open_notes = &mut open[slot(channel, key)];
                if *open_notes > 0 {
                    *open_notes -= 1;
                    continue;
                }

                let own_on = events[index + 1..]
                    .iter()
                    .take_while(|e| e.sample_time == timed.sample_time)
                    .position(|e| {
                        matches!(e.event, MidiEvent::NoteOn { channel: c, key: k, velocity: v }
                            if c == channel && k == key && v > 0)
                    })
                    .map(|offset| index + 1 + offset);
                let Some(on) = own_on else {
                    continue;
                };

                closed[on] = true;
                if timed.sample_time + 1 < duration_samples {
                    events[index].sample_time += 1;
                    moved = true;
                } else {
                    remove[index] = true;
                    remove[on] = true;
                }
            }
            _ => {}
        }
    }

    if remove.contains(&true) {
        let mut index = 0;
        events.retain(|_| {
            let keep = !remove[index];
            index += 1;
            keep
        });
    }
    if moved {
        sort_events(events);
    }
}

/// Events in absolute samples, guaranteed sorted by `sample_time`.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedTimeline {
    events: Vec<TimedEvent>,
    duration_samples: u64,
}

impl FlattenedTimeline {
    /// Wrap a list produced elsewhere, rejecting it if it is out of order.
    pub fn new(events: Vec<TimedEvent>, duration_samples: u64) -> Result<Self, TimelineError> {
        if let Some(index) = first_unsorted(&events) {
            return Err(TimelineError::Unsorted { index });
        }
        Ok(Self {
            events,
            duration_samples,
        })
    }

    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    pub fn duration_samples(&self) -> u64 {
        self.duration_samples
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_parts(self) -> (Vec<TimedEvent>, u64) {
        (self.events, self.duration_samples)
    }
}
