use super::curve::{self, EnvelopeTiming, PhaseState};

pub use super::curve::EnvelopePhase as EnvelopeState;

/*
Shaped ADSR Envelope
====================

The per-voice envelope generator. It owns no curve math of its own: every
sample it asks `curve::classify` which phase it is in, then `curve::level_at`
for the level. The only state is a sample counter, a released flag and the
level to release from.

  Level
    1.0 ┐    .-''-.
        │   /      '-.______________
    S   │  /                        \
        │ |                          '.
    0.0 └─'────────────────────────────'──→ Time
         Attack Decay    Sustain      Release

Counting samples instead of accumulating per-sample increments keeps the curve
exact for any length of note: position N always lands on the same level.


Retriggering
------------

A note-on while the voice is still sounding (mid-release, or mid-decay) must
not snap the level to zero. Instead the attack is resumed from where the attack
curve already equals the current level:

    elapsed = inv_t_from_u(level, shape) * attack_time

so the output continues from the current level and climbs the rest of the
attack from there.
*/

pub struct Envelope {
    timing: EnvelopeTiming,
    sustain_level: f32,
    shape: f32,
    sample_rate: f32,

    stage: EnvelopeState,
    level: f32,
    released: bool,
    // Samples since note-on, or since note-off once released
    elapsed_samples: u64,
    release_start_level: f32,
}

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        Self::adsr(sample_rate, EnvelopeTiming::default(), 0.7)
    }

    pub fn adsr(sample_rate: f32, timing: EnvelopeTiming, sustain: f32) -> Self {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            crate::config::DEFAULT_SAMPLE_RATE
        };

        Self {
            timing,
            sustain_level: if sustain.is_finite() {
                sustain.clamp(0.0, 1.0)
            } else {
                0.0
            },
            shape: 0.0,
            sample_rate,

            stage: EnvelopeState::Idle,
            level: 0.0,
            released: true,
            elapsed_samples: 0,
            release_start_level: 0.0,
        }
    }

    /// Set the curvature used by every segment, clamped to [-1, 1].
    pub fn with_shape(mut self, shape: f32) -> Self {
        self.shape = curve::normalize_shape(shape);
        self
    }

    pub fn set_shape(&mut self, shape: f32) {
        self.shape = curve::normalize_shape(shape);
    }

    /// Gate high. Resumes the attack from the current level.
    pub fn note_on(&mut self) {
        let resume_sec = curve::resume_attack_elapsed(self.level, &self.timing, self.shape);
        self.elapsed_samples = (resume_sec * self.sample_rate).round() as u64;
        self.released = false;
        self.stage = EnvelopeState::Attack;
    }

    /// Gate low. Releases from the current level.
    pub fn note_off(&mut self) {
        if matches!(self.stage, EnvelopeState::Idle) {
            return;
        }

        self.release_start_level = self.level;
        self.released = true;
        self.elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    /// Advance the envelope by one sample.
    pub fn next_sample(&mut self) {
        if matches!(self.stage, EnvelopeState::Idle) {
            self.level = 0.0;
            return;
        }

        let state = self.phase_state();
        self.stage = state.phase;
        self.level = curve::level_at(
            state,
            self.sustain_level,
            self.shape,
            self.release_start_level,
        );

        // Sustain holds indefinitely, no need to keep counting
        if !matches!(state.phase, EnvelopeState::Sustain) {
            self.elapsed_samples = self.elapsed_samples.saturating_add(1);
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            self.next_sample();
            *sample = self.level;
        }
    }

    /// Phase and progress at the current position.
    pub fn phase_state(&self) -> PhaseState {
        let elapsed_sec = self.elapsed_samples as f32 / self.sample_rate;
        curve::classify(elapsed_sec, &self.timing, self.released)
    }

    /// Position in milliseconds from note-on, for display and seeking.
    pub fn position_ms(&self) -> f32 {
        curve::phase_to_ms(self.phase_state(), &self.timing)
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.stage, EnvelopeState::Idle)
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.released = true;
        self.elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }

    pub fn timing(&self) -> &EnvelopeTiming {
        &self.timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn render_samples(env: &mut Envelope, samples: usize) {
        for _ in 0..samples {
            env.next_sample();
        }
    }

    fn envelope(attack: f32, decay: f32, sustain: f32, release: f32) -> Envelope {
        Envelope::adsr(SAMPLE_RATE, EnvelopeTiming::new(attack, decay, release), sustain)
    }

    #[test]
    fn attack_reaches_full_level() {
        let mut env = envelope(0.01, 0.1, 0.7, 0.2);

        env.note_on();
        render_samples(&mut env, (0.01 * SAMPLE_RATE) as usize + 1);

        assert!(env.level() > 0.99, "expected attack to reach full level");
        assert!(!matches!(env.state(), EnvelopeState::Attack));
    }

    #[test]
    fn sustain_holds_target_level() {
        let sustain = 0.6;
        let mut env = envelope(0.01, 0.05, sustain, 0.2);

        env.note_on();
        render_samples(&mut env, ((0.01 + 0.05) * SAMPLE_RATE) as usize + 5);

        assert!(matches!(env.state(), EnvelopeState::Sustain));
        assert!((env.level() - sustain).abs() < 1e-5);

        render_samples(&mut env, 5_000);
        assert!((env.level() - sustain).abs() < 1e-5, "sustain should hold indefinitely");
    }

    #[test]
    fn release_falls_back_to_idle() {
        let release = 0.03;
        let mut env = envelope(0.01, 0.05, 0.5, release);

        env.note_on();
        render_samples(&mut env, 20);

        env.note_off();
        render_samples(&mut env, (release * SAMPLE_RATE) as usize + 2);

        assert_eq!(env.level(), 0.0);
        assert!(matches!(env.state(), EnvelopeState::Idle));
        assert!(!env.is_active());
    }

    #[test]
    fn note_off_while_idle_is_ignored() {
        let mut env = envelope(0.01, 0.05, 0.5, 0.1);
        env.note_off();
        assert!(!env.is_active());
    }

    #[test]
    fn retrigger_during_release_continues_from_current_level() {
        for &shape in &[-0.7, 0.0, 0.7] {
            let mut env = envelope(0.05, 0.05, 0.8, 0.2).with_shape(shape);
            env.note_on();
            render_samples(&mut env, 200);
            env.note_off();
            render_samples(&mut env, 60);

            let before = env.level();
            assert!(before > 0.0 && before < 0.8);

            env.note_on();
            env.next_sample();
            assert!(
                (env.level() - before).abs() < 0.05,
                "shape {shape}: jumped from {before} to {}",
                env.level()
            );
            assert!(matches!(env.state(), EnvelopeState::Attack));
        }
    }

    #[test]
    fn shape_bends_the_attack() {
        let mut linear = envelope(0.1, 0.1, 0.5, 0.1);
        let mut fast = envelope(0.1, 0.1, 0.5, 0.1).with_shape(1.0);
        let mut slow = envelope(0.1, 0.1, 0.5, 0.1).with_shape(-1.0);

        for env in [&mut linear, &mut fast, &mut slow] {
            env.note_on();
            render_samples(env, 51);
        }

        assert!(fast.level() > linear.level());
        assert!(slow.level() < linear.level());
    }

    #[test]
    fn zero_release_silences_immediately() {
        let mut env = envelope(0.0, 0.0, 1.0, 0.0);
        env.note_on();
        render_samples(&mut env, 3);
        assert_eq!(env.level(), 1.0);

        env.note_off();
        env.next_sample();
        assert_eq!(env.level(), 0.0);
        assert!(!env.is_active());
    }

    #[test]
    fn position_tracks_elapsed_time() {
        let mut env = envelope(0.1, 0.2, 0.5, 0.3);
        env.note_on();
        render_samples(&mut env, 150);
        assert!((env.position_ms() - 150.0).abs() < 1.5);
    }
}
