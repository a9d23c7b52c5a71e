//! Real-time playback core: the scheduler, its message types and the
//! allocator seam it drives.

pub mod allocator;
pub mod clock;
pub mod message;
pub mod scheduler;
#[cfg(feature = "rtrb")]
pub mod transport;

pub use allocator::VoiceAllocator;
pub use clock::BlockClock;
pub use message::{CommandReceiver, EventSink, SchedulerCommand, SchedulerEvent};
pub use scheduler::{Scheduler, TimedEvent};
#[cfg(feature = "rtrb")]
pub use transport::{transport, SchedulerEndpoint, TransportError, TransportHandle};
