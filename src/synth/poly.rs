use crate::{
    dsp::curve::EnvelopeTiming,
    engine::allocator::VoiceAllocator,
    io::{converter::midi_to_synth, midi::MidiEvent},
    synth::{
        message::{MessageReceiver, SynthMessage},
        voice::{Voice, VoiceState},
    },
};

/// Envelope settings shared by every voice of a `PolySynth`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSettings {
    pub timing: EnvelopeTiming,
    pub sustain: f32,
    pub shape: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            timing: EnvelopeTiming::default(),
            sustain: 0.7,
            shape: 0.0,
        }
    }
}

/// Polyphonic sine synth.
///
/// Messages queued on `rx` are applied at the start of each `render_block`.
/// Voices can also be driven directly through `VoiceAllocator`, e.g. from a
/// `RoutedVoices` stage on the same thread.
pub struct PolySynth<R: MessageReceiver> {
    voices: Vec<Voice>,
    rx: R,
    channel: Option<u8>,
    bend: f32,
    frame_counter: u64,
}

impl<R: MessageReceiver> PolySynth<R> {
    pub fn new(sample_rate: f32, max_voices: usize, settings: VoiceSettings, rx: R) -> Self {
        let voices = (0..max_voices)
            .map(|_| Voice::new(sample_rate, settings.timing, settings.sustain, settings.shape))
            .collect();

        Self {
            voices,
            rx,
            channel: None,
            bend: 1.0,
            frame_counter: 0,
        }
    }

    /// Only react to MIDI on `channel`. Omni by default.
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn render_block(&mut self, out: &mut [f32]) {
        // Process control messages
        while let Some(msg) = self.rx.pop() {
            self.apply(msg);
        }

        // Mix voices
        out.fill(0.0);
        let bend = self.bend;
        for voice in self.voices.iter_mut().filter(|v| v.is_active()) {
            voice.render(out, bend);
        }

        self.frame_counter += out.len() as u64;
    }

    pub fn apply(&mut self, msg: SynthMessage) {
        match msg {
            SynthMessage::NoteOn { note, velocity } => {
                let age = self.frame_counter;
                if let Some(voice) = self.allocate_voice() {
                    voice.start(note, velocity, age);
                }
            }
            SynthMessage::NoteOff { note, .. } => {
                if let Some(voice) = self.find_voice(note) {
                    voice.release();
                }
            }
            SynthMessage::PitchBend { cents } => {
                self.bend = 2.0_f32.powf(cents / 1200.0);
            }
            SynthMessage::AllNotesOff => {
                for voice in &mut self.voices {
                    voice.release();
                }
            }
            SynthMessage::AllSoundOff => {
                for voice in &mut self.voices {
                    voice.silence();
                }
            }
            SynthMessage::Hold { voice } => self.hold(voice),
            SynthMessage::Release { voice } => VoiceAllocator::release(self, voice),
        }
    }

    fn allocate_voice(&mut self) -> Option<&mut Voice> {
        // First pass: find free voice index
        let free_idx = self.voices.iter().position(|v| v.is_free());
        if let Some(idx) = free_idx {
            return Some(&mut self.voices[idx]);
        }

        // Second pass: steal oldest releasing voice
        let steal_idx = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.state() == VoiceState::Releasing)
            .min_by_key(|(_, v)| v.age())
            .map(|(idx, _)| idx);

        steal_idx.map(|idx| &mut self.voices[idx])
    }

    fn find_voice(&mut self, note: u8) -> Option<&mut Voice> {
        self.voices
            .iter_mut()
            .find(|v| v.note() == note && v.state() == VoiceState::Active)
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }
}

impl<R: MessageReceiver> VoiceAllocator for PolySynth<R> {
    fn handle_event(&mut self, event: MidiEvent) {
        if let Some(msg) = midi_to_synth(event, self.channel) {
            self.apply(msg);
        }
    }

    fn hold(&mut self, voice: usize) {
        let age = self.frame_counter;
        if let Some(voice) = self.voices.get_mut(voice) {
            voice.gate(age);
        }
    }

    fn release(&mut self, voice: usize) {
        if let Some(voice) = self.voices.get_mut(voice) {
            voice.release();
        }
    }

    fn advance(&mut self, frames: usize) {
        let bend = self.bend;
        for voice in self.voices.iter_mut().filter(|v| v.is_active()) {
            voice.skip(frames, bend);
        }
        self.frame_counter += frames as u64;
    }
}
