/*
Envelope Curve Shaping
======================

Every envelope segment (attack, decay, release) walks a normalized time
fraction `t` from 0 to 1. This module maps that fraction onto a normalized
output fraction `u` along a curve whose bend is set by a single `shape` knob.

Vocabulary
----------

  t         Elapsed time within a segment, as a fraction of its duration.
  u         Output progress within a segment, 0.0 at the start, 1.0 at the end.
  shape     Curvature in [-1, 1]. Negative bends the curve toward ease-in,
            positive toward ease-out, 0 is a straight line.
  k         Curvature gain, `shape * 5`.


The Curves
----------

  u
  1.0 ┐            ....----''''        shape > 0: fast start, slow finish
      │       .-''             .'          u = (1 - e^(-t·k)) / (1 - e^(-k))
      │     .'  ..----''   ..''
      │    /  .'       ..''            shape = 0: u = t
      │   / .'     ..''
      │  /.'   ..''                    shape < 0: slow start, fast finish
      │ //..'''                            u = (e^(t·|k|) - 1) / (e^|k| - 1)
  0.0 └/───────────────────────→ t
      0                       1

All three pass through (0, 0) and (1, 1) and are strictly increasing. Below
|shape| = 0.001 both exponential forms divide by something close to zero, so
that band is treated as exactly linear.

The exponentials are evaluated with `exp_m1` / `ln_1p` so small gains keep
their precision instead of cancelling against 1.0.


Inversion
---------

Retriggering a voice mid-release needs the opposite question: "at what point of
the attack curve is the output already at `u`?" Both branches invert in closed
form:

    k > 0:  t = -ln(1 - u·(1 - e^(-k))) / k
    k < 0:  t =  ln(1 + u·(e^|k| - 1)) / |k|


Phases
------

`classify` turns elapsed seconds plus an `EnvelopeTiming` into the phase the
voice is in and the linear progress through it. The curve above is applied to
that progress by whoever computes the level (`level_at`).
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Below this magnitude the curve is exactly linear.
pub const LINEAR_THRESHOLD: f32 = 0.001;

/// Curvature gain applied to `shape`.
pub const CURVATURE_GAIN: f32 = 5.0;

/// Clamp `shape` into [-1, 1]; non-finite values become 0.
#[inline]
pub fn normalize_shape(shape: f32) -> f32 {
    if shape.is_finite() {
        shape.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[inline]
fn normalize_fraction(x: f32) -> f32 {
    // NaN.clamp() stays NaN; treat it as the start of the segment
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Map a time fraction onto an output fraction along the `shape` curve.
pub fn shaped_t(t: f32, shape: f32) -> f32 {
    let t = normalize_fraction(t);
    let shape = normalize_shape(shape);

    if shape.abs() < LINEAR_THRESHOLD {
        return t;
    }

    let k = shape * CURVATURE_GAIN;
    let u = if k > 0.0 {
        (-t * k).exp_m1() / (-k).exp_m1()
    } else {
        let k_abs = -k;
        (t * k_abs).exp_m1() / k_abs.exp_m1()
    };

    u.clamp(0.0, 1.0)
}

/// Inverse of [`shaped_t`]: the time fraction at which the curve reaches `u`.
pub fn inv_t_from_u(u: f32, shape: f32) -> f32 {
    let u = normalize_fraction(u);
    let shape = normalize_shape(shape);

    if shape.abs() < LINEAR_THRESHOLD {
        return u;
    }

    let k = shape * CURVATURE_GAIN;
    let t = if k > 0.0 {
        -(u * (-k).exp_m1()).ln_1p() / k
    } else {
        let k_abs = -k;
        (u * k_abs.exp_m1()).ln_1p() / k_abs
    };

    t.clamp(0.0, 1.0)
}

/// Segment durations of an envelope, in seconds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeTiming {
    pub attack_sec: f32,
    pub decay_sec: f32,
    pub release_sec: f32,
}

impl EnvelopeTiming {
    /// Negative or non-finite durations collapse to zero.
    pub fn new(attack_sec: f32, decay_sec: f32, release_sec: f32) -> Self {
        Self {
            attack_sec: sanitize_duration(attack_sec),
            decay_sec: sanitize_duration(decay_sec),
            release_sec: sanitize_duration(release_sec),
        }
    }

    pub fn attack_ms(&self) -> f32 {
        self.attack_sec * 1000.0
    }

    pub fn decay_ms(&self) -> f32 {
        self.decay_sec * 1000.0
    }

    pub fn release_ms(&self) -> f32 {
        self.release_sec * 1000.0
    }
}

impl Default for EnvelopeTiming {
    fn default() -> Self {
        Self::new(0.01, 0.1, 0.3)
    }
}

#[inline]
fn sanitize_duration(sec: f32) -> f32 {
    if sec.is_finite() {
        sec.max(0.0)
    } else {
        0.0
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopePhase {
    /// Fully silent, the voice can be reused.
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// A phase plus linear progress through it (0.0 - 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseState {
    pub phase: EnvelopePhase,
    pub progress: f32,
}

impl PhaseState {
    pub const IDLE: PhaseState = PhaseState {
        phase: EnvelopePhase::Idle,
        progress: 0.0,
    };

    pub const SUSTAIN: PhaseState = PhaseState {
        phase: EnvelopePhase::Sustain,
        progress: 1.0,
    };
}

/// Work out which phase a voice is in.
///
/// For a held voice `elapsed_sec` counts from note-on; for a released voice it
/// counts from note-off.
pub fn classify(elapsed_sec: f32, timing: &EnvelopeTiming, released: bool) -> PhaseState {
    let elapsed = sanitize_duration(elapsed_sec);
    let EnvelopeTiming {
        attack_sec,
        decay_sec,
        release_sec,
    } = *timing;

    if released {
        if release_sec <= 0.0 || elapsed >= release_sec {
            return PhaseState::IDLE;
        }
        return PhaseState {
            phase: EnvelopePhase::Release,
            progress: elapsed / release_sec,
        };
    }

    if elapsed < attack_sec {
        return PhaseState {
            phase: EnvelopePhase::Attack,
            progress: if attack_sec > 0.0 {
                elapsed / attack_sec
            } else {
                1.0
            },
        };
    }

    if elapsed < attack_sec + decay_sec {
        return PhaseState {
            phase: EnvelopePhase::Decay,
            progress: if decay_sec > 0.0 {
                (elapsed - attack_sec) / decay_sec
            } else {
                1.0
            },
        };
    }

    PhaseState::SUSTAIN
}

/// Absolute position in milliseconds, measured from note-on, of a phase state.
pub fn phase_to_ms(state: PhaseState, timing: &EnvelopeTiming) -> f32 {
    let progress = normalize_fraction(state.progress);
    match state.phase {
        EnvelopePhase::Idle => 0.0,
        EnvelopePhase::Attack => timing.attack_ms() * progress,
        EnvelopePhase::Decay => timing.attack_ms() + timing.decay_ms() * progress,
        EnvelopePhase::Sustain => timing.attack_ms() + timing.decay_ms(),
        EnvelopePhase::Release => {
            timing.attack_ms() + timing.decay_ms() + timing.release_ms() * progress
        }
    }
}

/// Output level (0.0 - 1.0) for a phase state.
///
/// `release_from` is the level the voice had when it was released.
pub fn level_at(state: PhaseState, sustain: f32, shape: f32, release_from: f32) -> f32 {
    let sustain = normalize_fraction(sustain);
    let curve = shaped_t(state.progress, shape);
    match state.phase {
        EnvelopePhase::Idle => 0.0,
        EnvelopePhase::Attack => curve,
        EnvelopePhase::Decay => 1.0 - (1.0 - sustain) * curve,
        EnvelopePhase::Sustain => sustain,
        EnvelopePhase::Release => normalize_fraction(release_from) * (1.0 - curve),
    }
}

/// Seconds into the attack at which the attack curve already outputs `level`.
pub fn resume_attack_elapsed(level: f32, timing: &EnvelopeTiming, shape: f32) -> f32 {
    inv_t_from_u(level, shape) * timing.attack_sec
}
