use crate::{
    io::midi::{MidiEvent, CC_ALL_SOUND_OFF},
    synth::message::SynthMessage,
};

/// Pitch-bend range at full deflection, in cents.
pub const PITCH_BEND_RANGE_CENTS: f32 = 200.0;

/// Translate a scheduled MIDI event into a synth message.
///
/// `channel_filter` of `None` accepts every channel. A note-on with velocity 0
/// is a note-off. Events the synth has no use for map to `None`.
pub fn midi_to_synth(midi: MidiEvent, channel_filter: Option<u8>) -> Option<SynthMessage> {
    if channel_filter.is_some_and(|channel| channel != midi.channel()) {
        return None;
    }

    match midi {
        MidiEvent::NoteOn { key, velocity: 0, .. } => Some(SynthMessage::NoteOff {
            note: key,
            velocity: 0,
        }),
        MidiEvent::NoteOn { key, velocity, .. } => Some(SynthMessage::NoteOn {
            note: key,
            velocity,
        }),
        MidiEvent::NoteOff { key, velocity, .. } => Some(SynthMessage::NoteOff {
            note: key,
            velocity,
        }),
        MidiEvent::ControlChange {
            controller: CC_ALL_SOUND_OFF,
            ..
        } => Some(SynthMessage::AllSoundOff),
        MidiEvent::PitchBend { value, .. } => Some(SynthMessage::PitchBend {
            cents: value as f32 / 8192.0 * PITCH_BEND_RANGE_CENTS,
        }),
        MidiEvent::ControlChange { .. } | MidiEvent::ProgramChange { .. } => None,
    }
}

pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_translate() {
        let on = MidiEvent::NoteOn {
            channel: 2,
            key: 60,
            velocity: 90,
        };
        assert_eq!(
            midi_to_synth(on, None),
            Some(SynthMessage::NoteOn {
                note: 60,
                velocity: 90
            })
        );
        assert_eq!(midi_to_synth(on, Some(1)), None);

        let silent_on = MidiEvent::NoteOn {
            channel: 0,
            key: 60,
            velocity: 0,
        };
        assert_eq!(
            midi_to_synth(silent_on, None),
            Some(SynthMessage::NoteOff {
                note: 60,
                velocity: 0
            })
        );
    }

    #[test]
    fn all_sound_off_cuts_every_voice() {
        for channel in 0..16 {
            assert_eq!(
                midi_to_synth(MidiEvent::all_sound_off(channel), None),
                Some(SynthMessage::AllSoundOff)
            );
        }
    }

    #[test]
    fn pitch_bend_scales_to_cents() {
        let bend = MidiEvent::PitchBend {
            channel: 0,
            value: -8192,
        };
        assert_eq!(
            midi_to_synth(bend, None),
            Some(SynthMessage::PitchBend { cents: -200.0 })
        );
    }

    #[test]
    fn unused_events_are_dropped() {
        let program = MidiEvent::ProgramChange {
            channel: 0,
            program: 4,
        };
        let volume = MidiEvent::ControlChange {
            channel: 0,
            controller: 7,
            value: 100,
        };
        assert_eq!(midi_to_synth(program, None), None);
        assert_eq!(midi_to_synth(volume, None), None);
    }

    #[test]
    fn a4_is_440() {
        assert!((midi_note_to_freq(69) - 440.0).abs() < 1e-3);
        assert!((midi_note_to_freq(81) - 880.0).abs() < 1e-2);
    }
}
