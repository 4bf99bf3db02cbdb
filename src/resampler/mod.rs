//! Native-rate to output-rate conversion
//!
//! Exactly one strategy is live at a time. Both variants share one contract:
//! [`Resampler::push`] native chunks in, [`Resampler::available`] finished
//! output frames, [`Resampler::read`] drains them.

pub mod decimation;
pub mod sinc;

pub use decimation::DecimationResampler;
pub use sinc::{SincConfig, SincResampler};

use crate::timing::TimingConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One interleaved stereo sample (left, right)
pub type StereoFrame = [i16; 2];

/// Resampling strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResamplerKind {
    /// Band-limited sinc resampler (higher quality, bounded memory)
    #[default]
    Sinc,
    /// Fractional-accumulator decimation (always available)
    Decimation,
}

impl ResamplerKind {
    /// Parse a frontend option value
    pub fn from_option(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "sinc" | "blipper" => Some(ResamplerKind::Sinc),
            "decimation" | "cc" => Some(ResamplerKind::Decimation),
            _ => None,
        }
    }

    /// Option value written back to the frontend
    pub fn as_str(&self) -> &'static str {
        match self {
            ResamplerKind::Sinc => "sinc",
            ResamplerKind::Decimation => "decimation",
        }
    }
}

impl fmt::Display for ResamplerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active resampler
#[derive(Debug)]
pub enum Resampler {
    /// Band-limited sinc strategy
    Sinc(SincResampler),
    /// Decimation strategy
    Decimation(DecimationResampler),
}

impl Resampler {
    /// Construct the requested strategy for `output_rate_hint`.
    ///
    /// Sinc construction may fail with [`crate::Error::AllocationFailed`];
    /// decimation only fails on an unusable rate.
    pub fn construct(
        kind: ResamplerKind,
        output_rate_hint: f64,
        timing: &TimingConfig,
        sinc: &SincConfig,
    ) -> Result<Self> {
        match kind {
            ResamplerKind::Sinc => Ok(Resampler::Sinc(SincResampler::new(
                sinc,
                timing.native_rate(),
                output_rate_hint,
            )?)),
            ResamplerKind::Decimation => Ok(Resampler::Decimation(DecimationResampler::new(
                timing.decimation_ratio(output_rate_hint),
                output_rate_hint,
            )?)),
        }
    }

    /// Strategy of this instance
    pub fn kind(&self) -> ResamplerKind {
        match self {
            Resampler::Sinc(_) => ResamplerKind::Sinc,
            Resampler::Decimation(_) => ResamplerKind::Decimation,
        }
    }

    /// Feed a native-rate chunk
    pub fn push(&mut self, samples: &[StereoFrame]) {
        match self {
            Resampler::Sinc(r) => r.push(samples),
            Resampler::Decimation(r) => r.push(samples),
        }
    }

    /// Finished output frames ready to read
    pub fn available(&self) -> usize {
        match self {
            Resampler::Sinc(r) => r.available(),
            Resampler::Decimation(r) => r.available(),
        }
    }

    /// Drain exactly `out.len()` frames; `out.len()` must not exceed [`Self::available`]
    pub fn read(&mut self, out: &mut [StereoFrame]) {
        debug_assert!(out.len() <= self.available());
        match self {
            Resampler::Sinc(r) => r.read(out),
            Resampler::Decimation(r) => r.read(out),
        }
    }

    /// Effective output sample rate
    pub fn output_rate(&self) -> f64 {
        match self {
            Resampler::Sinc(r) => r.output_rate(),
            Resampler::Decimation(r) => r.output_rate(),
        }
    }

    /// Whether the pipeline should drain before pushing more input
    pub fn wants_drain(&self) -> bool {
        match self {
            Resampler::Sinc(r) => r.available() >= r.ring_frames() / 2,
            Resampler::Decimation(r) => r.available() > 0,
        }
    }

    /// Clear filter state, keeping allocations
    pub fn reset(&mut self) {
        match self {
            Resampler::Sinc(r) => r.reset(),
            Resampler::Decimation(r) => r.reset(),
        }
    }
}
