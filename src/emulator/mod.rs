//! Emulation step collaborator
//!
//! The cycle-accurate core itself lives outside this crate. The pipeline only
//! needs "run until the next frame boundary, producing samples", expressed by
//! [`EmulationCore`].

pub mod tone;

pub use tone::ToneCore;

use crate::resampler::StereoFrame;
use crate::video::Pixel;

/// Result of one call into the core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// Native samples the core reports as produced.
    ///
    /// May exceed the sink's length; only the sink's contents are real.
    pub produced: usize,
    /// A video frame boundary was reached during this call
    pub frame_complete: bool,
}

impl StepOutcome {
    /// Samples produced, no frame boundary yet
    pub fn needs_more(produced: usize) -> Self {
        StepOutcome {
            produced,
            frame_complete: false,
        }
    }

    /// Samples produced, frame boundary reached
    pub fn frame_done(produced: usize) -> Self {
        StepOutcome {
            produced,
            frame_complete: true,
        }
    }
}

/// Common interface for emulation cores driven by the pipeline
pub trait EmulationCore {
    /// Run until `requested` samples are produced or a frame ends.
    ///
    /// # Arguments
    ///
    /// * `video` - Frame buffer to render into, or `None` to skip rendering
    /// * `pitch` - Frame buffer row length in pixels
    /// * `samples` - Sample sink; its length is the sink capacity
    /// * `requested` - Samples wanted from this call
    fn run_for(
        &mut self,
        video: Option<&mut [Pixel]>,
        pitch: usize,
        samples: &mut [StereoFrame],
        requested: usize,
    ) -> StepOutcome;
}

impl<C: EmulationCore + ?Sized> EmulationCore for Box<C> {
    fn run_for(
        &mut self,
        video: Option<&mut [Pixel]>,
        pitch: usize,
        samples: &mut [StereoFrame],
        requested: usize,
    ) -> StepOutcome {
        (**self).run_for(video, pitch, samples, requested)
    }
}
