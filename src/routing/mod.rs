//! Voice-index routing between allocators and the stages that consume their
//! voices.
//!
//! Mappings are composed once, when a signal path is built, and then queried
//! whenever a downstream consumer needs to address an upstream voice.

/// Hold/release forwarding through a mapping.
pub mod stage;
/// The mapping trait, identity, composition and concrete stages.
pub mod voice_map;

pub use stage::RoutedVoices;
pub use voice_map::{
    compose, compose_chain, Composed, Identity, Offset, SharedMapping, Table, VoiceMapping,
    VoiceMappingExt,
};
