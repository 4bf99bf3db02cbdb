//! Synthetic square-wave core
//!
//! Stands in for a real emulator in the demo binary and the tests: produces a
//! stereo square wave at the native rate, one frame every
//! `samples_per_frame` samples, and draws a scrolling test pattern.

use super::{EmulationCore, StepOutcome};
use crate::resampler::StereoFrame;
use crate::timing::{SOUND_SAMPLES_PER_FRAME, SOUND_SAMPLE_RATE_NATIVE, VIDEO_HEIGHT, VIDEO_WIDTH};
use crate::video::Pixel;

/// Default wave amplitude
const DEFAULT_AMPLITUDE: i16 = 8_000;

/// Square-wave test core
#[derive(Debug, Clone)]
pub struct ToneCore {
    samples_per_frame: u64,
    /// Samples produced inside the current frame
    frame_position: u64,
    /// Native samples per half wave
    half_period: u64,
    /// Position inside the current half wave
    wave_position: u64,
    high: bool,
    amplitude: i16,
    /// Extra samples claimed per call (over-production hazard)
    overshoot: usize,
    frames_rendered: u64,
    frames_completed: u64,
    calls: u64,
}

impl ToneCore {
    /// Core producing a `frequency` Hz square wave
    pub fn new(frequency: f64) -> Self {
        let half_period = (SOUND_SAMPLE_RATE_NATIVE / (2.0 * frequency.max(1.0))).round() as u64;
        ToneCore {
            samples_per_frame: SOUND_SAMPLES_PER_FRAME,
            frame_position: 0,
            half_period: half_period.max(1),
            wave_position: 0,
            high: true,
            amplitude: DEFAULT_AMPLITUDE,
            overshoot: 0,
            frames_rendered: 0,
            frames_completed: 0,
            calls: 0,
        }
    }

    /// Override the frame length
    pub fn with_samples_per_frame(mut self, samples: u64) -> Self {
        self.samples_per_frame = samples.max(1);
        self
    }

    /// Set the wave amplitude
    pub fn with_amplitude(mut self, amplitude: i16) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Claim `extra` more samples than actually fit on every call
    pub fn with_overshoot(mut self, extra: usize) -> Self {
        self.overshoot = extra;
        self
    }

    /// Frames whose video was rendered
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Frame boundaries reached
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// Calls made into the core
    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn next_level(&mut self) -> i16 {
        let level = if self.high {
            self.amplitude
        } else {
            -self.amplitude
        };
        self.wave_position += 1;
        if self.wave_position >= self.half_period {
            self.wave_position = 0;
            self.high = !self.high;
        }
        level
    }

    fn render(&mut self, video: &mut [Pixel], pitch: usize) {
        let shift = self.frames_completed as usize;
        for y in 0..VIDEO_HEIGHT {
            let Some(row) = video.get_mut(y * pitch..y * pitch + VIDEO_WIDTH) else {
                break;
            };
            for (x, px) in row.iter_mut().enumerate() {
                let band = ((x + shift) / 8 + y / 8) & 1;
                *px = if band == 0 { 0x001F } else { 0xF800 };
            }
        }
        self.frames_rendered += 1;
    }
}

impl EmulationCore for ToneCore {
    fn run_for(
        &mut self,
        video: Option<&mut [Pixel]>,
        pitch: usize,
        samples: &mut [StereoFrame],
        requested: usize,
    ) -> StepOutcome {
        self.calls += 1;
        let remaining = (self.samples_per_frame - self.frame_position) as usize;
        let produced = requested.min(remaining);

        for slot in samples.iter_mut().take(produced) {
            let level = self.next_level();
            *slot = [level, level];
        }
        self.frame_position += produced as u64;

        let reported = produced + self.overshoot;
        if self.frame_position >= self.samples_per_frame {
            self.frame_position = 0;
            if let Some(video) = video {
                self.render(video, pitch);
            }
            self.frames_completed += 1;
            StepOutcome::frame_done(reported)
        } else {
            StepOutcome::needs_more(reported)
        }
    }
}
