use std::collections::VecDeque;

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

use crate::io::midi::MidiEvent;

use super::scheduler::TimedEvent;

/// Control side → audio side.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerCommand {
    Load {
        events: Vec<TimedEvent>,
        duration_samples: u64,
    },
    Play,
    Stop,
    SetLoop(bool),
}

/// Audio side → control side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    Midi {
        event: MidiEvent,
        /// Exact clock sample the event was scheduled for.
        scheduled_sample: u64,
        /// Start of the render block it was emitted from.
        actual_sample: u64,
    },
    PlaybackEnded,
}

impl SchedulerEvent {
    /// How far behind its scheduled time the event fired, in samples.
    pub fn lateness(&self) -> Option<u64> {
        match *self {
            SchedulerEvent::Midi {
                scheduled_sample,
                actual_sample,
                ..
            } => Some(scheduled_sample.abs_diff(actual_sample)),
            SchedulerEvent::PlaybackEnded => None,
        }
    }
}

pub trait CommandReceiver {
    fn pop(&mut self) -> Option<SchedulerCommand>;
}

/// Where the scheduler pushes emitted events.
///
/// Implementations must never block. Returns `false` if the event was dropped.
pub trait EventSink {
    fn emit(&mut self, event: SchedulerEvent) -> bool;

    /// Take ownership of an event list replaced by a load.
    ///
    /// The default frees it in place. Sinks on the audio thread hand it back
    /// to the control side instead.
    fn retire(&mut self, events: Vec<TimedEvent>) {
        drop(events);
    }
}

impl EventSink for Vec<SchedulerEvent> {
    fn emit(&mut self, event: SchedulerEvent) -> bool {
        self.push(event);
        true
    }
}

/// Plain queue, for offline rendering and tests.
impl CommandReceiver for VecDeque<SchedulerCommand> {
    fn pop(&mut self) -> Option<SchedulerCommand> {
        self.pop_front()
    }
}

#[cfg(feature = "rtrb")]
impl CommandReceiver for Consumer<SchedulerCommand> {
    fn pop(&mut self) -> Option<SchedulerCommand> {
        Consumer::pop(self).ok()
    }
}

#[cfg(feature = "rtrb")]
impl EventSink for Producer<SchedulerEvent> {
    fn emit(&mut self, event: SchedulerEvent) -> bool {
        self.push(event).is_ok()
    }
}
