pub mod config; // Engine parameters and their validation
pub mod dsp; // Envelope curve math and the per-voice envelope
pub mod engine; // Sample-accurate scheduler and its transport
pub mod io; // MIDI events and conversions
pub mod routing; // Voice-index mappings between stages
pub mod sequencing; // Tick-grid timelines
pub mod synth; // Voice management and polyphony

pub use config::{ConfigError, EngineConfig};
pub use engine::{Scheduler, SchedulerCommand, SchedulerEvent, TimedEvent};
pub use io::MidiEvent;
pub use sequencing::{FlattenedTimeline, Timeline, TimelineError};

pub const MAX_BLOCK_SIZE: usize = 2048;
