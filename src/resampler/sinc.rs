//! Band-limited sinc resampler
//!
//! Band-limited step synthesis: every change of the input level is spread
//! over `taps` output slots through a Kaiser-windowed sinc kernel picked for
//! the sub-position of the change, and the accumulated deltas are integrated
//! when read. Emulated audio hardware holds levels for long stretches, so the
//! work is proportional to the number of level changes, not to the ~2 MHz
//! input rate.
//!
//! Output frames are final once no later input can touch them, i.e. every
//! slot behind the current write slot.

use super::StereoFrame;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Sinc kernel and ring parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SincConfig {
    /// Kernel length in output samples
    pub taps: usize,
    /// Pass-band edge as a fraction of the output Nyquist frequency
    pub cutoff: f64,
    /// Kaiser window shape (stop-band attenuation)
    pub beta: f64,
    /// Output ring capacity per channel, in frames.
    ///
    /// Sized so one video frame of output keeps the ring under half full.
    pub ring_frames: usize,
    /// Refuse construction above this footprint (constrained targets)
    pub memory_limit_bytes: Option<usize>,
}

impl Default for SincConfig {
    fn default() -> Self {
        SincConfig {
            taps: 32,
            cutoff: 0.85,
            beta: 6.5,
            ring_frames: 1024 + 512,
            memory_limit_bytes: None,
        }
    }
}

impl SincConfig {
    /// Bytes a resampler with this config needs for `decimation` sub-positions
    pub fn footprint_bytes(&self, decimation: usize) -> usize {
        let kernel = self.taps.saturating_mul(decimation);
        let rings = self.ring_frames.saturating_mul(2);
        kernel.saturating_add(rings).saturating_mul(std::mem::size_of::<f32>())
    }

    fn validate(&self) -> Result<()> {
        if self.taps == 0 {
            return Err(Error::InvalidConfig("sinc taps must be non-zero".into()));
        }
        if !(self.cutoff > 0.0 && self.cutoff <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "sinc cutoff must be in (0, 1], got {}",
                self.cutoff
            )));
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "kaiser beta must be finite and >= 0, got {}",
                self.beta
            )));
        }
        if self.ring_frames < self.taps * 2 {
            return Err(Error::InvalidConfig(format!(
                "sinc ring ({} frames) must hold at least twice the taps ({})",
                self.ring_frames, self.taps
            )));
        }
        Ok(())
    }
}

/// Per-channel accumulation ring
#[derive(Debug, Clone)]
struct Channel {
    /// Pending deltas per output slot
    ring: Vec<f32>,
    /// Running integral of everything already read
    integrator: f32,
    /// Last input level seen
    last: i16,
}

impl Channel {
    fn try_new(frames: usize) -> Result<Self> {
        Ok(Channel {
            ring: try_zeroed(frames)?,
            integrator: 0.0,
            last: 0,
        })
    }

    fn reset(&mut self) {
        self.ring.fill(0.0);
        self.integrator = 0.0;
        self.last = 0;
    }
}

/// Band-limited sinc resampler (stereo)
#[derive(Debug, Clone)]
pub struct SincResampler {
    taps: usize,
    decimation: usize,
    output_rate: f64,
    /// `decimation` phases of `taps` coefficients, each phase summing to 1
    kernel: Vec<f32>,
    left: Channel,
    right: Channel,
    /// Input sub-position inside the current output slot
    phase: usize,
    /// Ring index of the slot currently receiving input
    write: usize,
    /// Ring index of the oldest unread finished slot
    read: usize,
    /// Finished slots not yet read
    available: usize,
    /// Finished frames discarded because the ring was full
    overrun_frames: u64,
}

impl SincResampler {
    /// Build a resampler converting `native_rate` to roughly `output_rate_hint`.
    ///
    /// The decimation factor is rounded to an integer; [`Self::output_rate`]
    /// reports the rate actually produced.
    pub fn new(config: &SincConfig, native_rate: f64, output_rate_hint: f64) -> Result<Self> {
        config.validate()?;
        if !(output_rate_hint.is_finite() && output_rate_hint > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "output rate must be positive, got {output_rate_hint}"
            )));
        }

        let decimation = ((native_rate / output_rate_hint).round() as usize).max(1);
        let bytes = config.footprint_bytes(decimation);
        if let Some(limit) = config.memory_limit_bytes {
            if bytes > limit {
                return Err(Error::AllocationFailed { bytes });
            }
        }

        let kernel = build_kernel(config, decimation)?;
        let left = Channel::try_new(config.ring_frames)?;
        let right = Channel::try_new(config.ring_frames)?;

        Ok(SincResampler {
            taps: config.taps,
            decimation,
            output_rate: native_rate / decimation as f64,
            kernel,
            left,
            right,
            phase: 0,
            write: 0,
            read: 0,
            available: 0,
            overrun_frames: 0,
        })
    }

    /// Integer decimation factor
    pub fn decimation(&self) -> usize {
        self.decimation
    }

    /// Output sample rate actually produced
    pub fn output_rate(&self) -> f64 {
        self.output_rate
    }

    /// Ring capacity per channel
    pub fn ring_frames(&self) -> usize {
        self.left.ring.len()
    }

    /// Finished frames dropped because the ring overflowed
    pub fn overrun_frames(&self) -> u64 {
        self.overrun_frames
    }

    /// Finished frames
    pub fn available(&self) -> usize {
        self.available
    }

    /// Feed native frames
    pub fn push(&mut self, samples: &[StereoFrame]) {
        let cap = self.ring_frames();
        for &[l, r] in samples {
            let base = self.phase * self.taps;
            let coeffs = &self.kernel[base..base + self.taps];
            add_step(&mut self.left, l, coeffs, self.write);
            add_step(&mut self.right, r, coeffs, self.write);

            self.phase += 1;
            if self.phase == self.decimation {
                self.phase = 0;
                self.write = (self.write + 1) % cap;
                self.available += 1;

                // Keep room for the kernel tail in front of the write slot.
                if self.available + self.taps >= cap {
                    self.discard_oldest();
                }
            }
        }
    }

    /// Drain `out.len()` finished frames
    pub fn read(&mut self, out: &mut [StereoFrame]) {
        let cap = self.ring_frames();
        let count = out.len().min(self.available);
        for slot in out.iter_mut().take(count) {
            let l = integrate(&mut self.left, self.read);
            let r = integrate(&mut self.right, self.read);
            *slot = [l, r];
            self.read = (self.read + 1) % cap;
        }
        self.available -= count;
    }

    /// Clear rings and phase
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.phase = 0;
        self.write = 0;
        self.read = 0;
        self.available = 0;
    }

    fn discard_oldest(&mut self) {
        let cap = self.ring_frames();
        // Integrate so the level stays continuous across the gap.
        integrate(&mut self.left, self.read);
        integrate(&mut self.right, self.read);
        self.read = (self.read + 1) % cap;
        self.available -= 1;
        if self.overrun_frames == 0 {
            tracing::warn!("sinc resampler ring overrun; dropping oldest output");
        }
        self.overrun_frames += 1;
    }
}

#[inline]
fn add_step(channel: &mut Channel, level: i16, coeffs: &[f32], write: usize) {
    let delta = level as i32 - channel.last as i32;
    if delta == 0 {
        return;
    }
    channel.last = level;
    let delta = delta as f32;
    let cap = channel.ring.len();
    for (k, &c) in coeffs.iter().enumerate() {
        channel.ring[(write + k) % cap] += delta * c;
    }
}

#[inline]
fn integrate(channel: &mut Channel, index: usize) -> i16 {
    channel.integrator += channel.ring[index];
    channel.ring[index] = 0.0;
    channel
        .integrator
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

fn try_zeroed(len: usize) -> Result<Vec<f32>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailed {
            bytes: len * std::mem::size_of::<f32>(),
        })?;
    v.resize(len, 0.0);
    Ok(v)
}

/// Zeroth-order modified Bessel function of the first kind
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    let half = x / 2.0;
    for k in 1..64 {
        term *= half / k as f64;
        let t2 = term * term;
        sum += t2;
        if t2 < sum * 1e-12 {
            break;
        }
    }
    sum
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

fn build_kernel(config: &SincConfig, decimation: usize) -> Result<Vec<f32>> {
    let taps = config.taps;
    let len = taps * decimation;
    let mut kernel = try_zeroed(len)?;

    let span = len as f64;
    let center = span / 2.0;
    // Cutoff in cycles per native sample.
    let fc = config.cutoff * 0.5 / decimation as f64;
    let norm = bessel_i0(config.beta);

    for phase in 0..decimation {
        let row = &mut kernel[phase * taps..(phase + 1) * taps];
        let mut sum = 0.0f64;
        for (k, coeff) in row.iter_mut().enumerate() {
            // Distance (native samples) from the step to output slot k.
            let t = (k * decimation) as f64 + (decimation - phase) as f64;
            let x = (2.0 * t / span - 1.0).clamp(-1.0, 1.0);
            let window = bessel_i0(config.beta * (1.0 - x * x).sqrt()) / norm;
            let value = 2.0 * fc * sinc(2.0 * fc * (t - center)) * window;
            sum += value;
            *coeff = value as f32;
        }
        if sum.abs() > f64::EPSILON {
            let scale = (1.0 / sum) as f32;
            row.iter_mut().for_each(|c| *c *= scale);
        }
    }
    Ok(kernel)
}
