use crate::engine::allocator::VoiceAllocator;

use super::voice_map::VoiceMapping;

/// A consumer's view of an upstream allocator through a (composed) mapping.
///
/// Hold and release commands are issued in the consumer's local numbering and
/// reach the physical voice the allocator knows.
pub struct RoutedVoices<M, A> {
    mapping: M,
    allocator: A,
}

impl<M: VoiceMapping, A: VoiceAllocator> RoutedVoices<M, A> {
    pub fn new(mapping: M, allocator: A) -> Self {
        Self { mapping, allocator }
    }

    pub fn hold(&mut self, local_voice: usize) {
        let voice = self.mapping.to_upstream(local_voice);
        self.allocator.hold(voice);
    }

    pub fn release(&mut self, local_voice: usize) {
        let voice = self.mapping.to_upstream(local_voice);
        self.allocator.release(voice);
    }

    /// The local index of an allocator voice, or `None` if this path does not
    /// carry it.
    pub fn local_voice(&self, upstream_voice: usize) -> Option<usize> {
        self.mapping.to_downstream(upstream_voice)
    }

    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    pub fn into_inner(self) -> (M, A) {
        (self.mapping, self.allocator)
    }
}
