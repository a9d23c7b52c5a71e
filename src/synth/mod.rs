// Voice management and polyphony on top of the envelope generator

pub mod message;
pub mod poly;
pub mod voice;

pub use message::{MessageReceiver, SynthMessage};
pub use poly::{PolySynth, VoiceSettings};
pub use voice::{Voice, VoiceState};
