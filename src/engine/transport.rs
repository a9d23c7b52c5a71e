//! Lock-free link between the control thread and the scheduler.
//!
//! `transport` creates two single-producer single-consumer ring buffers: one
//! for commands, one for emitted events. The `TransportHandle` half stays on
//! the control thread and may log; the `SchedulerEndpoint` half moves into the
//! audio callback and never allocates, blocks or logs.

use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, info, warn};

use crate::sequencing::timeline::FlattenedTimeline;

use super::{
    message::{EventSink, SchedulerCommand, SchedulerEvent},
    scheduler::{Scheduler, TimedEvent},
};

/// Replaced timelines in flight back to the control thread.
const RETIRED_CAPACITY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("command queue is full, {0} was not sent")]
    QueueFull(&'static str),
    #[error("the audio side of the transport has been dropped")]
    Disconnected,
}

/// Build a connected handle/endpoint pair.
///
/// `capacity` bounds both queues. The event queue must hold at least one
/// stop broadcast (16 all-sound-off messages) to never drop one.
pub fn transport(capacity: usize) -> (TransportHandle, SchedulerEndpoint) {
    let (command_tx, command_rx) = RingBuffer::new(capacity);
    let (event_tx, event_rx) = RingBuffer::new(capacity);
    let (retired_tx, retired_rx) = RingBuffer::new(RETIRED_CAPACITY);

    let handle = TransportHandle {
        commands: command_tx,
        events: event_rx,
        retired: retired_rx,
    };
    let endpoint = SchedulerEndpoint {
        scheduler: Scheduler::new(),
        commands: command_rx,
        sink: EndpointSink {
            events: event_tx,
            retired: retired_tx,
        },
    };
    (handle, endpoint)
}

/// Control-thread half.
pub struct TransportHandle {
    commands: Producer<SchedulerCommand>,
    events: Consumer<SchedulerEvent>,
    retired: Consumer<Vec<TimedEvent>>,
}

impl TransportHandle {
    /// Replace the timeline. Playback stops and rewinds on the audio side.
    pub fn load(&mut self, timeline: FlattenedTimeline) -> Result<(), TransportError> {
        let (events, duration_samples) = timeline.into_parts();
        info!(
            events = events.len(),
            duration_samples, "Loading timeline"
        );
        self.send(
            "load",
            SchedulerCommand::Load {
                events,
                duration_samples,
            },
        )
    }

    pub fn play(&mut self) -> Result<(), TransportError> {
        debug!("Requesting play");
        self.send("play", SchedulerCommand::Play)
    }

    pub fn stop(&mut self) -> Result<(), TransportError> {
        debug!("Requesting stop");
        self.send("stop", SchedulerCommand::Stop)
    }

    pub fn set_loop(&mut self, looping: bool) -> Result<(), TransportError> {
        debug!(looping, "Setting loop");
        self.send("set_loop", SchedulerCommand::SetLoop(looping))
    }

    fn send(&mut self, name: &'static str, command: SchedulerCommand) -> Result<(), TransportError> {
        self.collect_retired();
        if self.commands.is_abandoned() {
            return Err(TransportError::Disconnected);
        }
        self.commands.push(command).map_err(|_| {
            warn!(command = name, "Transport command queue full");
            TransportError::QueueFull(name)
        })
    }

    /// Next event emitted by the scheduler, if any.
    pub fn try_recv(&mut self) -> Option<SchedulerEvent> {
        self.events.pop().ok()
    }

    /// Free timelines the audio side has replaced. Returns how many.
    ///
    /// Called on every command; call it directly when loads are frequent.
    pub fn collect_retired(&mut self) -> usize {
        let mut collected = 0;
        while let Ok(events) = self.retired.pop() {
            debug!(events = events.len(), "Freeing replaced timeline");
            collected += 1;
        }
        collected
    }

    /// Everything emitted since the last call.
    pub fn drain(&mut self) -> impl Iterator<Item = SchedulerEvent> + '_ {
        std::iter::from_fn(move || self.try_recv())
    }

    pub fn pending_events(&self) -> usize {
        self.events.slots()
    }

    pub fn is_connected(&self) -> bool {
        !self.commands.is_abandoned()
    }
}

/// Audio-thread half. Owns the scheduler.
pub struct SchedulerEndpoint {
    scheduler: Scheduler,
    commands: Consumer<SchedulerCommand>,
    sink: EndpointSink,
}

/// Emitted events, plus the return path for replaced timelines.
struct EndpointSink {
    events: Producer<SchedulerEvent>,
    retired: Producer<Vec<TimedEvent>>,
}

impl EventSink for EndpointSink {
    fn emit(&mut self, event: SchedulerEvent) -> bool {
        self.events.emit(event)
    }

    fn retire(&mut self, events: Vec<TimedEvent>) {
        // Only if the control side stopped collecting does this free here
        let _ = self.retired.push(events);
    }
}

impl SchedulerEndpoint {
    /// Apply pending commands and emit everything due in this block.
    #[inline]
    pub fn process_block(&mut self, block_start: u64, block_size: usize) {
        self.scheduler.process_block(
            block_start,
            block_size,
            &mut self.commands,
            &mut self.sink,
        );
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Events the control side was too slow to drain.
    pub fn dropped_events(&self) -> u64 {
        self.scheduler.dropped_events()
    }
}
