#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::io::midi::{MidiEvent, MIDI_CHANNELS};

use super::message::{CommandReceiver, EventSink, SchedulerCommand, SchedulerEvent};

/*
Sample-Accurate Event Scheduler
===============================

Replays a precomputed list of MIDI events against the free-running audio
clock. Lives on the audio thread; the control thread talks to it only through
`SchedulerCommand`s and hears back through `SchedulerEvent`s.

Vocabulary
----------

  clock           Absolute sample counter of the audio device. Owned by the
                  audio thread, synced at the start of every block.

  playback_start  Clock value at which sample 0 of the timeline played.

  position        `block_start - playback_start`: where in the timeline the
                  current block begins.

  cursor          Index of the next event that has not been emitted or
                  skipped. Only ever moves forward (except on loop rebase), so
                  each block costs O(events due in this block).


Timing
------

    timeline   0        128       256       384
               |---------|---------|---------|
    events     e0              e200   e300
    blocks     [ block 0 ][ block 1 ][ block 2 ]
                   ↑ e0       ↑ e200     ↑ e300

Each event goes out in the block whose range [position, position + size)
contains it, with two timestamps:

  scheduled_sample  playback_start + sample_time   (exact)
  actual_sample     block_start                    (block-granular)

The gap between them is at most one block and is deliberate: consumers that
can render sub-block offsets use `scheduled_sample`.


Play Uses The Audio Clock
-------------------------

`play()` never takes a timestamp from the caller. A value computed on the
control thread is stale by the time the command is applied, and any event
earlier than that staleness (typically program changes at sample 0) would
land behind `position` and be skipped. Reading `clock` on the audio thread
makes sample 0 fall in the very block the command is applied in.


End Of Timeline
---------------

Once `position >= duration`:

  looping      rebase playback_start to this block, cursor to 0, and process
               this block as block 0 of the next pass.
  not looping  stop and emit PlaybackEnded once.
*/

/// One event at an absolute offset (in samples) from the timeline start.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    pub sample_time: u64,
    pub event: MidiEvent,
}

impl TimedEvent {
    pub fn new(sample_time: u64, event: MidiEvent) -> Self {
        Self { sample_time, event }
    }
}

/// Index of the first event that breaks ascending `sample_time` order.
pub fn first_unsorted(events: &[TimedEvent]) -> Option<usize> {
    events
        .windows(2)
        .position(|pair| pair[1].sample_time < pair[0].sample_time)
        .map(|index| index + 1)
}

#[derive(Debug, Default)]
pub struct Scheduler {
    events: Vec<TimedEvent>,
    duration_samples: u64,
    looping: bool,
    playing: bool,
    playback_start: u64,
    cursor: usize,
    clock: u64,
    dropped_events: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the timeline. Stops playback and rewinds.
    ///
    /// `events` must be sorted ascending by `sample_time`. The scheduler does
    /// not sort or validate them outside debug builds. Returns the previous
    /// list so the caller decides where it is freed.
    pub fn load(&mut self, events: Vec<TimedEvent>, duration_samples: u64) -> Vec<TimedEvent> {
        debug_assert!(
            first_unsorted(&events).is_none(),
            "timeline events must be sorted by sample_time"
        );

        self.duration_samples = duration_samples;
        self.cursor = 0;
        self.playing = false;
        std::mem::replace(&mut self.events, events)
    }

    /// Start from the top at the current clock sample.
    pub fn play(&mut self) {
        self.playback_start = self.clock;
        self.cursor = 0;
        self.playing = true;
    }

    /// Stop and silence every channel.
    ///
    /// Always broadcasts all-sound-off, even when already stopped.
    pub fn stop<S: EventSink + ?Sized>(&mut self, sink: &mut S) {
        self.playing = false;
        for channel in 0..MIDI_CHANNELS {
            self.emit(
                sink,
                SchedulerEvent::Midi {
                    event: MidiEvent::all_sound_off(channel),
                    scheduled_sample: self.clock,
                    actual_sample: self.clock,
                },
            );
        }
    }

    /// Takes effect the next time playback reaches the end of the timeline.
    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Update the absolute clock. Called by the audio thread at block start.
    pub fn sync_clock(&mut self, sample: u64) {
        self.clock = sample;
    }

    pub fn apply<S: EventSink + ?Sized>(&mut self, command: SchedulerCommand, sink: &mut S) {
        match command {
            SchedulerCommand::Load {
                events,
                duration_samples,
            } => {
                let previous = self.load(events, duration_samples);
                // Nothing to free for a never-allocated list
                if previous.capacity() > 0 {
                    sink.retire(previous);
                }
            }
            SchedulerCommand::Play => self.play(),
            SchedulerCommand::Stop => self.stop(sink),
            SchedulerCommand::SetLoop(looping) => self.set_loop(looping),
        }
    }

    /// One render block: sync the clock, apply queued commands in arrival
    /// order, then emit whatever is due.
    pub fn process_block<C, S>(
        &mut self,
        block_start: u64,
        block_size: usize,
        commands: &mut C,
        sink: &mut S,
    ) where
        C: CommandReceiver + ?Sized,
        S: EventSink + ?Sized,
    {
        self.sync_clock(block_start);
        while let Some(command) = commands.pop() {
            self.apply(command, sink);
        }
        self.advance(block_start, block_size, sink);
    }

    /// Emit every event due in `[block_start, block_start + block_size)`.
    pub fn advance<S: EventSink + ?Sized>(
        &mut self,
        block_start: u64,
        block_size: usize,
        sink: &mut S,
    ) {
        if !self.playing || self.events.is_empty() {
            return;
        }

        let mut position = block_start.saturating_sub(self.playback_start);

        if position >= self.duration_samples {
            if self.looping {
                self.playback_start = block_start;
                self.cursor = 0;
                position = 0;
            } else {
                self.playing = false;
                self.emit(sink, SchedulerEvent::PlaybackEnded);
                return;
            }
        }

        let position_end = position.saturating_add(block_size as u64);

        while let Some(&timed) = self.events.get(self.cursor) {
            if timed.sample_time >= position_end {
                break;
            }

            // Behind the block only after a clock jump; never fire those late
            if timed.sample_time >= position {
                self.emit(
                    sink,
                    SchedulerEvent::Midi {
                        event: timed.event,
                        scheduled_sample: self.playback_start + timed.sample_time,
                        actual_sample: block_start,
                    },
                );
            }

            self.cursor += 1;
        }
    }

    fn emit<S: EventSink + ?Sized>(&mut self, sink: &mut S, event: SchedulerEvent) {
        if !sink.emit(event) {
            self.dropped_events = self.dropped_events.saturating_add(1);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn playback_start(&self) -> u64 {
        self.playback_start
    }

    pub fn duration_samples(&self) -> u64 {
        self.duration_samples
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Timeline position of a block, while playing.
    pub fn position(&self, block_start: u64) -> Option<u64> {
        self.playing
            .then(|| block_start.saturating_sub(self.playback_start))
    }

    /// Emissions refused by a full sink since creation.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }
}
