#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MAX_BLOCK_SIZE;

pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;

/// Frames per render quantum, the granularity of event emission.
pub const DEFAULT_BLOCK_SIZE: usize = 128;

pub const DEFAULT_MAX_VOICES: usize = 16;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("sample rate must be a positive, finite number of Hz (got {0})")]
    InvalidSampleRate(f32),
    #[error("block size must be between 1 and {max} frames (got {actual})")]
    InvalidBlockSize { actual: usize, max: usize },
    #[error("at least one voice is required")]
    NoVoices,
    #[error("queue capacity must be at least {min} (got {actual})")]
    QueueTooSmall { actual: usize, min: usize },
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub block_size: usize,
    pub max_voices: usize,
    /// Slots in each direction of the control/audio queues.
    pub queue_capacity: usize,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::InvalidBlockSize {
                actual: self.block_size,
                max: MAX_BLOCK_SIZE,
            });
        }
        if self.max_voices == 0 {
            return Err(ConfigError::NoVoices);
        }
        // stop() alone pushes one event per MIDI channel
        let min = crate::io::MIDI_CHANNELS as usize;
        if self.queue_capacity < min {
            return Err(ConfigError::QueueTooSmall {
                actual: self.queue_capacity,
                min,
            });
        }
        Ok(())
    }

    /// Duration of one render block in seconds.
    pub fn block_duration(&self) -> f64 {
        self.block_size as f64 / self.sample_rate as f64
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            max_voices: DEFAULT_MAX_VOICES,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
