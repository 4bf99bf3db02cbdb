//! Per-frame audio/video pipeline for libretro-style emulator cores
//!
//! Runs once per emulated video frame: pulls native-rate samples out of the
//! emulation core, converts them to the negotiated output rate, hands them to
//! a backpressured audio consumer and keeps video emission locked to the
//! audio sample clock.
//!
//! # Features
//! - Two interchangeable resamplers (band-limited sinc, fractional decimation)
//! - Sinc construction failure falls back to decimation for the session
//! - Growable output buffer with an explicit never-shrink growth contract
//! - Delivery adapter that ratchets down to what the consumer really accepts
//! - Audio-clocked frame dupe detection
//! - Edge-triggered fast-forward / slow-motion speed modes
//!
//! # Crate feature flags
//! - `streaming` (opt-in): live playback of the delivered stream via `rodio`
//!
//! # Quick start
//! ```no_run
//! use retro_avsync::emulator::ToneCore;
//! use retro_avsync::pipeline::{NullNotifier, Pipeline, PipelineConfig, TickInput};
//! use retro_avsync::video::NullVideoSink;
//!
//! let mut pipeline = Pipeline::new(PipelineConfig::default(), NullNotifier).unwrap();
//! let mut core = ToneCore::new(440.0);
//! let mut audio = |_samples: &[i16], frames: usize| frames;
//! let mut video = NullVideoSink;
//! for _ in 0..60 {
//!     pipeline.run_tick(&mut core, TickInput::default(), &mut audio, &mut video);
//! }
//! ```

#![warn(missing_docs)]

pub mod audio; // Output buffer & delivery adapter
pub mod emulator; // Emulation step collaborator seam
pub mod export; // WAV recording consumer
pub mod pipeline; // Per-tick driver, config, host hooks
pub mod resampler; // Sinc / decimation strategies
pub mod streaming; // Host ring buffer (+ rodio device with `streaming`)
pub mod sync; // Frame dupe counters & speed modes
pub mod timing; // Native clock constants
pub mod video; // Video sink & frame store

/// Error types for the audio/video pipeline
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Resampler state could not be allocated (constrained target)
    #[error("Resampler allocation failed ({bytes} bytes requested)")]
    AllocationFailed {
        /// Estimated footprint of the failed construction
        bytes: usize,
    },

    /// Output buffer could not grow to hold the pending samples
    #[error("Output buffer growth to {frames} frames failed")]
    BufferGrowth {
        /// Capacity (in stereo frames) the buffer tried to grow to
        frames: usize,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error writing audio file
    #[error("Audio file write error: {0}")]
    AudioFileError(String),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file (de)serialization error
    #[error("Settings error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

// Public API exports
pub use audio::{AudioConsumer, DeliveryAdapter, OutputBuffer};
pub use emulator::{EmulationCore, StepOutcome, ToneCore};
pub use pipeline::{Pipeline, PipelineConfig, TickInput, TickKind, TickReport};
pub use resampler::{Resampler, ResamplerKind, SincConfig, StereoFrame};
pub use sync::{FrameDecision, JoypadButtons, SpeedMode, SpeedModeController, SyncCounters};
pub use timing::TimingConfig;
