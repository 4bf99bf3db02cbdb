//! Audio-clocked video synchronization
//!
//! The native sample counter is the authoritative clock. Video follows it:
//! whenever fewer frames have been shown than the produced samples account
//! for, a duplicate frame is emitted instead of running the core.

pub mod input;
pub mod speed;

pub use input::{EdgeTrigger, JoypadButtons, SpeedCombos};
pub use speed::{SpeedChange, SpeedMode, SpeedModeController, StepPlan};

use crate::timing::SOUND_SAMPLES_PER_FRAME;

/// What the current tick should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    /// Redisplay the previous frame; do not run the core
    Duplicate,
    /// Run the core
    Emulate,
}

/// Monotonic sample/frame counters.
///
/// Session-scoped: never persisted with save states.
#[derive(Debug, Clone)]
pub struct SyncCounters {
    /// Native samples per nominal video frame (`F`)
    samples_per_frame: u64,
    /// Native samples produced since session start
    samples_count: u64,
    /// Video frames accounted for since session start
    frames_count: u64,
}

impl SyncCounters {
    /// Create counters for `samples_per_frame` native samples per frame
    pub fn new(samples_per_frame: u64) -> Self {
        SyncCounters {
            samples_per_frame: samples_per_frame.max(1),
            samples_count: 0,
            frames_count: 0,
        }
    }

    /// Start from explicit counter values
    pub fn with_counts(samples_per_frame: u64, samples_count: u64, frames_count: u64) -> Self {
        SyncCounters {
            samples_count,
            frames_count,
            ..Self::new(samples_per_frame)
        }
    }

    /// Frames the produced samples account for (`samples / F`, floored)
    pub fn expected_frames(&self) -> u64 {
        self.samples_count / self.samples_per_frame
    }

    /// Decide between a duplicate frame and a real emulation tick
    pub fn decide(&self) -> FrameDecision {
        if self.frames_count < self.expected_frames() {
            FrameDecision::Duplicate
        } else {
            FrameDecision::Emulate
        }
    }

    /// Account for an emitted duplicate frame
    pub fn record_duplicate(&mut self) {
        self.frames_count += 1;
    }

    /// Account for native samples produced by the core
    pub fn add_samples(&mut self, count: u64) {
        self.samples_count += count;
    }

    /// Account for `count` emulated frames
    pub fn advance_frames(&mut self, count: u64) {
        self.frames_count += count;
    }

    /// Native samples produced so far
    pub fn samples_count(&self) -> u64 {
        self.samples_count
    }

    /// Frames accounted for so far
    pub fn frames_count(&self) -> u64 {
        self.frames_count
    }

    /// Native samples per frame
    pub fn samples_per_frame(&self) -> u64 {
        self.samples_per_frame
    }

    /// Zero both counters (session start only)
    pub fn reset(&mut self) {
        self.samples_count = 0;
        self.frames_count = 0;
    }
}

impl Default for SyncCounters {
    fn default() -> Self {
        Self::new(SOUND_SAMPLES_PER_FRAME)
    }
}
