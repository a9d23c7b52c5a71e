#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of MIDI channels addressed by channel-wide messages.
pub const MIDI_CHANNELS: u8 = 16;

/// Controller number of the "all sound off" channel-mode message.
pub const CC_ALL_SOUND_OFF: u8 = 123;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend { channel: u8, value: i16 },
    ProgramChange { channel: u8, program: u8 },
}

/// Discriminant of a [`MidiEvent`], without its payload.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiEventKind {
    NoteOn,
    NoteOff,
    ControlChange,
    PitchBend,
    ProgramChange,
}

impl MidiEvent {
    /// CC 123 / value 0 on `channel`.
    pub const fn all_sound_off(channel: u8) -> Self {
        MidiEvent::ControlChange {
            channel,
            controller: CC_ALL_SOUND_OFF,
            value: 0,
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. }
            | MidiEvent::ProgramChange { channel, .. } => channel,
        }
    }

    pub fn kind(&self) -> MidiEventKind {
        match self {
            MidiEvent::NoteOn { .. } => MidiEventKind::NoteOn,
            MidiEvent::NoteOff { .. } => MidiEventKind::NoteOff,
            MidiEvent::ControlChange { .. } => MidiEventKind::ControlChange,
            MidiEvent::PitchBend { .. } => MidiEventKind::PitchBend,
            MidiEvent::ProgramChange { .. } => MidiEventKind::ProgramChange,
        }
    }

    /// Ordering rank used when several events share a sample time.
    ///
    /// Channel state (programs, controllers, bends) lands before notes, and
    /// note-offs before note-ons so a repeated key is not cut by its own
    /// predecessor's release.
    pub fn order_rank(&self) -> u8 {
        match self.kind() {
            MidiEventKind::ProgramChange => 0,
            MidiEventKind::ControlChange => 1,
            MidiEventKind::PitchBend => 2,
            MidiEventKind::NoteOff => 3,
            MidiEventKind::NoteOn => 4,
        }
    }

    pub fn is_all_sound_off(&self) -> bool {
        matches!(
            self,
            MidiEvent::ControlChange {
                controller: CC_ALL_SOUND_OFF,
                ..
            }
        )
    }
}
