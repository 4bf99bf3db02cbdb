//! Native clock constants
//!
//! The emulated handheld runs its audio unit at a very high native rate
//! (2 MiHz) and emits one video frame every 70224 CPU cycles. Everything else
//! in the pipeline is derived from these numbers.

/// CPU clock of the emulated machine (Hz)
pub const CPU_CLOCK_HZ: f64 = 4_194_304.0;

/// CPU cycles per video frame
pub const CYCLES_PER_FRAME: f64 = 70_224.0;

/// Video refresh rate (~59.7275 Hz)
pub const VIDEO_REFRESH_RATE: f64 = CPU_CLOCK_HZ / CYCLES_PER_FRAME;

/// Native stereo samples per video frame
pub const SOUND_SAMPLES_PER_FRAME: u64 = 35_112;

/// Samples requested from each call into the emulation core
pub const SOUND_SAMPLES_PER_RUN: usize = 2_064;

/// Nominal upper bound of one core call's output.
///
/// The core can exceed this; anything past it is discarded.
pub const SOUND_SINK_CAPACITY: usize = SOUND_SAMPLES_PER_RUN + 2_064;

/// Native audio sample rate (2 097 152 Hz)
pub const SOUND_SAMPLE_RATE_NATIVE: f64 = VIDEO_REFRESH_RATE * SOUND_SAMPLES_PER_FRAME as f64;

/// Default output rate hint (native / 65.536)
pub const DEFAULT_OUTPUT_RATE: f64 = 32_000.0;

/// Visible video width in pixels
pub const VIDEO_WIDTH: usize = 160;

/// Visible video height in pixels
pub const VIDEO_HEIGHT: usize = 144;

/// Video buffer pitch in pixels (power of two, wider than the visible area)
pub const VIDEO_PITCH: usize = 256;

/// Timing parameters shared by the sync counters and the resampler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingConfig {
    /// Native samples produced per nominal video frame (`F`)
    pub samples_per_frame: u64,
    /// Video refresh rate in Hz
    pub refresh_rate: f64,
}

impl TimingConfig {
    /// Native sample rate implied by this configuration
    pub fn native_rate(&self) -> f64 {
        self.refresh_rate * self.samples_per_frame as f64
    }

    /// Output-rate frames produced per video frame at `output_rate`
    pub fn output_frames_per_video_frame(&self, output_rate: f64) -> f64 {
        output_rate / self.refresh_rate
    }

    /// Native samples consumed per output sample at `output_rate`
    pub fn decimation_ratio(&self, output_rate: f64) -> f64 {
        self.native_rate() / output_rate
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            samples_per_frame: SOUND_SAMPLES_PER_FRAME,
            refresh_rate: VIDEO_REFRESH_RATE,
        }
    }
}
