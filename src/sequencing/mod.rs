//! Musical time: tick-grid timelines and their conversion to sample offsets.

pub mod timeline;

pub use timeline::{FlattenedTimeline, TickEvent, Timeline, TimelineError};
