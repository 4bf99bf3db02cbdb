//! Fractional-accumulator decimation
//!
//! Averages every input frame that falls inside one output period. A
//! non-integer ratio is carried in an `f64` phase, so the output count of a
//! chunk is `floor((phase + n) / ratio)` and the remainder rolls into the next
//! chunk instead of being dropped.

use super::StereoFrame;
use crate::{Error, Result};
use std::collections::VecDeque;

/// Decimating resampler
#[derive(Debug, Clone)]
pub struct DecimationResampler {
    /// Native frames per output frame (> 1 in practice, may be fractional)
    ratio: f64,
    /// Output rate this instance was built for
    output_rate: f64,
    /// Native frames accumulated into the current output period
    phase: f64,
    /// Running sums for the current output period
    sum_l: i64,
    sum_r: i64,
    count: u32,
    /// Finished frames waiting to be read
    ready: VecDeque<StereoFrame>,
}

impl DecimationResampler {
    /// Create a decimator consuming `ratio` native frames per output frame
    pub fn new(ratio: f64, output_rate: f64) -> Result<Self> {
        if !ratio.is_finite() || ratio < 1.0 {
            return Err(Error::InvalidConfig(format!(
                "decimation ratio must be >= 1.0, got {ratio}"
            )));
        }
        Ok(DecimationResampler {
            ratio,
            output_rate,
            phase: 0.0,
            sum_l: 0,
            sum_r: 0,
            count: 0,
            ready: VecDeque::with_capacity(256),
        })
    }

    /// Decimation ratio
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Output sample rate
    pub fn output_rate(&self) -> f64 {
        self.output_rate
    }

    /// Fractional position inside the current output period
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Feed native frames
    pub fn push(&mut self, samples: &[StereoFrame]) {
        for &[l, r] in samples {
            self.sum_l += l as i64;
            self.sum_r += r as i64;
            self.count += 1;
            self.phase += 1.0;

            if self.phase >= self.ratio {
                self.phase -= self.ratio;
                let n = self.count as i64;
                self.ready.push_back([(self.sum_l / n) as i16, (self.sum_r / n) as i16]);
                self.sum_l = 0;
                self.sum_r = 0;
                self.count = 0;
            }
        }
    }

    /// Finished frames
    pub fn available(&self) -> usize {
        self.ready.len()
    }

    /// Drain `out.len()` frames
    pub fn read(&mut self, out: &mut [StereoFrame]) {
        let n = out.len();
        for (slot, frame) in out.iter_mut().zip(self.ready.drain(..n)) {
            *slot = frame;
        }
    }

    /// Clear accumulated state
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.sum_l = 0;
        self.sum_r = 0;
        self.count = 0;
        self.ready.clear();
    }
}
