use crate::io::midi::MidiEvent;

/// The component that owns physical voices.
///
/// Voice indices are the allocator's own numbering. Routing stages translate
/// their local indices through a `VoiceMapping` before calling `hold` or
/// `release`. Unknown indices are ignored.
pub trait VoiceAllocator {
    fn handle_event(&mut self, event: MidiEvent);

    /// Gate the voice high (retrigger it if it is releasing).
    fn hold(&mut self, voice: usize);

    /// Gate the voice low.
    fn release(&mut self, voice: usize);

    fn advance(&mut self, frames: usize);
}

impl<A: VoiceAllocator + ?Sized> VoiceAllocator for &mut A {
    fn handle_event(&mut self, event: MidiEvent) {
        (**self).handle_event(event)
    }

    fn hold(&mut self, voice: usize) {
        (**self).hold(voice)
    }

    fn release(&mut self, voice: usize) {
        (**self).release(voice)
    }

    fn advance(&mut self, frames: usize) {
        (**self).advance(frames)
    }
}
