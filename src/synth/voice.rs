use std::f32::consts::TAU;

use crate::{
    dsp::{curve::EnvelopeTiming, envelope::Envelope},
    io::converter::midi_note_to_freq,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,      // Available for allocation
    Active,    // Gate high, envelope in attack/decay/sustain
    Releasing, // Gate low, envelope in release
}

/// A sine oscillator through a shaped envelope.
pub struct Voice {
    note: u8,
    velocity: u8,
    state: VoiceState,
    age: u64,
    sample_rate: f32,
    phase: f32,
    envelope: Envelope,
}

impl Voice {
    pub fn new(sample_rate: f32, timing: EnvelopeTiming, sustain: f32, shape: f32) -> Self {
        let envelope = Envelope::adsr(sample_rate, timing, sustain).with_shape(shape);
        Self {
            note: 0,
            velocity: 0,
            state: VoiceState::Free,
            age: 0,
            sample_rate: sample_rate.max(1.0),
            phase: 0.0,
            envelope,
        }
    }

    pub fn start(&mut self, note: u8, velocity: u8, age: u64) {
        if self.is_free() {
            self.phase = 0.0;
        }
        self.note = note;
        self.velocity = velocity;
        self.gate(age);
    }

    /// Gate high at the current note. A releasing voice resumes its attack
    /// from the level it had reached.
    pub fn gate(&mut self, age: u64) {
        self.state = VoiceState::Active;
        self.age = age;
        self.envelope.note_on();
    }

    pub fn release(&mut self) {
        if self.state == VoiceState::Active {
            self.state = VoiceState::Releasing;
            self.envelope.note_off();
        }
    }

    /// Cut to silence immediately.
    pub fn silence(&mut self) {
        self.envelope.reset();
        self.free();
    }

    /// Add this voice into `out`. `bend` is a frequency ratio.
    pub fn render(&mut self, out: &mut [f32], bend: f32) {
        let increment = midi_note_to_freq(self.note) * bend / self.sample_rate;
        let gain = self.velocity as f32 / 127.0;

        for sample in out.iter_mut() {
            self.envelope.next_sample();
            *sample += (self.phase * TAU).sin() * self.envelope.level() * gain;
            self.phase = (self.phase + increment).fract();
        }

        self.free_if_finished();
    }

    /// Run the envelope without producing audio. `bend` as for `render`.
    pub fn skip(&mut self, frames: usize, bend: f32) {
        for _ in 0..frames {
            if !self.envelope.is_active() {
                break;
            }
            self.envelope.next_sample();
        }

        let increment = midi_note_to_freq(self.note) * bend / self.sample_rate;
        self.phase = (self.phase + increment * frames as f32).fract();
        self.free_if_finished();
    }

    fn free_if_finished(&mut self) {
        if self.state == VoiceState::Releasing && !self.envelope.is_active() {
            self.free();
        }
    }

    // Note and velocity stay, so a freed voice can be re-gated by index
    fn free(&mut self) {
        self.state = VoiceState::Free;
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, VoiceState::Active | VoiceState::Releasing)
    }

    pub fn envelope_level(&self) -> f32 {
        self.envelope.level()
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn voice() -> Voice {
        Voice::new(SAMPLE_RATE, EnvelopeTiming::new(0.001, 0.01, 0.01), 0.5, 0.0)
    }

    #[test]
    fn renders_while_gated_and_frees_after_release() {
        let mut voice = voice();
        voice.start(69, 127, 0);

        let mut out = vec![0.0; 1024];
        voice.render(&mut out, 1.0);
        assert!(out.iter().any(|s| s.abs() > 0.1));
        assert_eq!(voice.state(), VoiceState::Active);

        voice.release();
        assert_eq!(voice.state(), VoiceState::Releasing);

        // 10 ms release at 48 kHz is 480 samples
        let mut out = vec![0.0; 1024];
        voice.render(&mut out, 1.0);
        assert!(voice.is_free());
    }

    #[test]
    fn silence_is_immediate() {
        let mut voice = voice();
        voice.start(60, 100, 0);
        let mut out = vec![0.0; 256];
        voice.render(&mut out, 1.0);

        voice.silence();
        assert!(voice.is_free());
        assert_eq!(voice.envelope_level(), 0.0);
    }

    #[test]
    fn regating_a_releasing_voice_keeps_its_level() {
        let mut voice = voice();
        voice.start(60, 100, 0);
        let mut out = vec![0.0; 2048];
        voice.render(&mut out, 1.0);
        voice.release();
        voice.render(&mut out[..64], 1.0);

        let before = voice.envelope_level();
        voice.gate(10);
        voice.render(&mut out[..1], 1.0);

        assert_eq!(voice.state(), VoiceState::Active);
        assert!((voice.envelope_level() - before).abs() < 0.05);
    }

    #[test]
    fn skip_keeps_the_bent_phase() {
        let bend = 2.0_f32.powf(200.0 / 1200.0);
        let mut rendered = voice();
        let mut skipped = voice();
        rendered.start(60, 100, 0);
        skipped.start(60, 100, 0);

        let mut out = vec![0.0; 300];
        rendered.render(&mut out, bend);
        skipped.skip(300, bend);

        let mut a = [0.0];
        let mut b = [0.0];
        rendered.render(&mut a, bend);
        skipped.render(&mut b, bend);
        assert!((a[0] - b[0]).abs() < 1e-3, "{} vs {}", a[0], b[0]);
    }

    #[test]
    fn release_is_ignored_when_free() {
        let mut voice = voice();
        voice.release();
        assert!(voice.is_free());
    }
}
