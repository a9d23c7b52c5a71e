//! Low-level DSP primitives used by voices.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside voice structs. `curve` is the pure shaping math,
//! `envelope` is the stateful generator built on top of it.

/// Envelope curve shaping, phase classification and inversion.
pub mod curve;
/// Shaped attack/decay/sustain/release envelope generator.
pub mod envelope;

pub use curve::{EnvelopePhase, EnvelopeTiming, PhaseState};
pub use envelope::{Envelope, EnvelopeState};
