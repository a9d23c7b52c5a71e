use crate::config::DEFAULT_BLOCK_SIZE;

/// Absolute sample counter of the audio device.
///
/// Device callbacks arrive in whatever size the host picks; `quanta` splits
/// each one into fixed render blocks so the scheduler always advances in the
/// same increments.
#[derive(Debug, Clone)]
pub struct BlockClock {
    next_sample: u64,
    quantum: usize,
}

impl BlockClock {
    pub fn new(quantum: usize) -> Self {
        Self {
            next_sample: 0,
            quantum: quantum.max(1),
        }
    }

    /// Start of the next block to be rendered.
    pub fn now(&self) -> u64 {
        self.next_sample
    }

    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Split `frames` into `(block_start, len)` chunks, advancing the clock.
    ///
    /// Every chunk is `quantum` frames long except possibly the last one.
    pub fn quanta(&mut self, frames: usize) -> Quanta<'_> {
        Quanta {
            clock: self,
            remaining: frames,
        }
    }
}

impl Default for BlockClock {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

pub struct Quanta<'a> {
    clock: &'a mut BlockClock,
    remaining: usize,
}

impl Iterator for Quanta<'_> {
    type Item = (u64, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let len = self.remaining.min(self.clock.quantum);
        let start = self.clock.next_sample;
        self.clock.next_sample += len as u64;
        self.remaining -= len;
        Some((start, len))
    }
}
