// Purpose - external interfaces, format conversions

pub mod converter;
pub mod midi;

pub use midi::{MidiEvent, MidiEventKind, CC_ALL_SOUND_OFF, MIDI_CHANNELS};
