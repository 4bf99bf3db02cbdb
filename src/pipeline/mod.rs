//! Per-tick pipeline driver
//!
//! One [`Pipeline::run_tick`] call per host frame. The pipeline owns every
//! piece of mutable audio/video state for the session; nothing is global.
//!
//! A tick is one of:
//! - a duplicate: the sample clock is ahead of video, redisplay and return
//! - an emulated tick: run one super-step (or `k` under fast-forward),
//!   resample, present the frame and deliver the audio
//! - a slow-motion hold: no emulation, the retained frame is shown again

pub mod config;
pub mod host;

pub use config::PipelineConfig;
pub use host::{AvInfo, HostNotifier, NullNotifier, RecordingNotifier, RESAMPLER_OPTION_KEY};

use crate::audio::{AudioConsumer, DeliveryAdapter, DeliveryReport, DeliveryStats, OutputBuffer};
use crate::emulator::EmulationCore;
use crate::resampler::{Resampler, ResamplerKind, StereoFrame};
use crate::sync::{
    FrameDecision, JoypadButtons, SpeedChange, SpeedMode, SpeedModeController, SyncCounters,
};
use crate::timing::{TimingConfig, SOUND_SAMPLES_PER_RUN, SOUND_SINK_CAPACITY};
use crate::video::{VideoFrame, VideoSink};
use crate::{Error, Result};

/// Message shown once when the sinc resampler cannot be built
pub const SINC_FALLBACK_MESSAGE: &str =
    "Sinc resampler unsupported on this platform - using Decimation";

/// How long the fallback message stays up, in video frames
const FALLBACK_MESSAGE_FRAMES: u32 = 120;

/// Message shown once when audio output is disabled
pub const AUDIO_DISABLED_MESSAGE: &str = "Audio output disabled - out of memory";

/// A super-step is abandoned after this many nominal frames without a boundary
const RUNAWAY_FRAME_LIMIT: u64 = 4;

/// Per-tick input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Joypad state polled for this tick
    pub buttons: JoypadButtons,
    /// Host-side fast-forward is active
    pub host_fast_forward: bool,
}

impl TickInput {
    /// Input with the given buttons held
    pub fn with_buttons(buttons: JoypadButtons) -> Self {
        TickInput {
            buttons,
            host_fast_forward: false,
        }
    }
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// Redisplayed the previous frame; the core did not run
    Duplicate,
    /// Ran the core and presented a new frame
    Emulated,
    /// Slow-motion tick without emulation; retained frame shown again
    SlowMotionHold,
}

/// Summary of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Tick outcome
    pub kind: TickKind,
    /// Super-steps run
    pub super_steps: u32,
    /// Native samples accepted from the core (after capping)
    pub samples_produced: u64,
    /// Audio handed to the host; `None` when delivery was skipped
    pub delivery: Option<DeliveryReport>,
    /// Speed-mode transition triggered by this tick's input
    pub speed_change: Option<SpeedChange>,
}

impl TickReport {
    fn new(kind: TickKind, speed_change: Option<SpeedChange>) -> Self {
        TickReport {
            kind,
            super_steps: 0,
            samples_produced: 0,
            delivery: None,
            speed_change,
        }
    }
}

/// Audio/video pipeline context
pub struct Pipeline<N: HostNotifier = NullNotifier> {
    config: PipelineConfig,
    timing: TimingConfig,
    notifier: N,
    resampler: Resampler,
    output: OutputBuffer,
    delivery: DeliveryAdapter,
    counters: SyncCounters,
    speed: SpeedModeController,
    frame: VideoFrame,
    /// Sample sink handed to the core
    sink: Vec<StereoFrame>,
    /// Sinc construction failed once; never tried again this session
    sinc_failed: bool,
    audio_enabled: bool,
}

impl<N: HostNotifier> Pipeline<N> {
    /// Build a pipeline with the native timing
    pub fn new(config: PipelineConfig, notifier: N) -> Result<Self> {
        Self::with_timing(config, TimingConfig::default(), notifier)
    }

    /// Build a pipeline with custom timing
    pub fn with_timing(
        config: PipelineConfig,
        timing: TimingConfig,
        mut notifier: N,
    ) -> Result<Self> {
        config.validate()?;

        let mut config = config;
        let mut sinc_failed = false;
        let resampler = build_resampler(&mut config, &timing, &mut sinc_failed, &mut notifier)?;
        let output = OutputBuffer::for_output_rate(resampler.output_rate(), timing.refresh_rate)?
            .with_growth_limit(config.output_buffer_limit_frames);
        let speed = SpeedModeController::new(
            &config.fast_forward_multipliers,
            &config.slow_motion_divisors,
        )
        .with_frameskip_min_multiplier(config.frameskip_min_multiplier);

        tracing::info!(
            resampler = %resampler.kind(),
            output_rate = resampler.output_rate(),
            "pipeline ready"
        );

        Ok(Pipeline {
            counters: SyncCounters::new(timing.samples_per_frame),
            config,
            timing,
            notifier,
            resampler,
            output,
            delivery: DeliveryAdapter::new(),
            speed,
            frame: VideoFrame::new(),
            sink: vec![[0; 2]; SOUND_SINK_CAPACITY],
            sinc_failed,
            audio_enabled: true,
        })
    }

    /// Effective configuration (reflects a sinc fallback)
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Timing in use
    pub fn timing(&self) -> TimingConfig {
        self.timing
    }

    /// Host notifier
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Mutable host notifier
    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// Strategy of the live resampler
    pub fn resampler_kind(&self) -> ResamplerKind {
        self.resampler.kind()
    }

    /// Sample rate delivered to the host
    pub fn output_rate(&self) -> f64 {
        self.resampler.output_rate()
    }

    /// Timing/geometry for the host
    pub fn av_info(&self) -> AvInfo {
        AvInfo {
            fps: self.timing.refresh_rate,
            sample_rate: self.resampler.output_rate(),
            base_width: self.frame.width(),
            base_height: self.frame.height(),
        }
    }

    /// Sample/frame counters
    pub fn counters(&self) -> &SyncCounters {
        &self.counters
    }

    /// Mutable counters
    pub fn counters_mut(&mut self) -> &mut SyncCounters {
        &mut self.counters
    }

    /// Current speed mode
    pub fn speed_mode(&self) -> SpeedMode {
        self.speed.mode()
    }

    /// Delivery totals and the current request cap
    pub fn delivery_stats(&self) -> DeliveryStats {
        self.delivery.stats()
    }

    /// Current per-call audio request cap
    pub fn max_accepted_frames(&self) -> usize {
        self.delivery.max_accepted_frames()
    }

    /// Output buffer (read access)
    pub fn output_buffer(&self) -> &OutputBuffer {
        &self.output
    }

    /// False once an output buffer growth failed
    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    /// Last rendered frame
    pub fn frame(&self) -> &VideoFrame {
        &self.frame
    }

    /// Apply changed options.
    ///
    /// The resampler is rebuilt only when the strategy, the output rate or the
    /// sinc parameters change; the host is then told the new timing. The
    /// output buffer is kept and only grows if the new rate needs more room.
    /// Nothing changes when the new options are rejected.
    pub fn apply_config(&mut self, config: PipelineConfig) -> Result<()> {
        config.validate()?;

        let mut config = config;
        if config.resampler_strategy == ResamplerKind::Sinc && self.sinc_failed {
            config.resampler_strategy = ResamplerKind::Decimation;
        }

        let rebuilt = if self.config.needs_rebuild(&config) {
            Some(build_resampler(
                &mut config,
                &self.timing,
                &mut self.sinc_failed,
                &mut self.notifier,
            )?)
        } else {
            None
        };

        self.output.set_growth_limit(config.output_buffer_limit_frames);
        self.speed
            .set_speed_lists(&config.fast_forward_multipliers, &config.slow_motion_divisors);
        self.speed
            .set_frameskip_min_multiplier(config.frameskip_min_multiplier);
        self.config = config;

        if let Some(resampler) = rebuilt {
            self.resampler = resampler;
            let needed = OutputBuffer::initial_capacity(
                self.resampler.output_rate(),
                self.timing.refresh_rate,
            );
            if self.audio_enabled {
                if let Err(e) = self.output.ensure_capacity(needed) {
                    self.disable_audio(&e);
                }
            }
            tracing::info!(
                resampler = %self.resampler.kind(),
                output_rate = self.resampler.output_rate(),
                capacity = self.output.capacity(),
                "resampler rebuilt"
            );

            let info = self.av_info();
            self.notifier.av_info_changed(&info);
        }
        Ok(())
    }

    /// Run one host frame
    pub fn run_tick<C, A, V>(
        &mut self,
        core: &mut C,
        input: TickInput,
        audio: &mut A,
        video: &mut V,
    ) -> TickReport
    where
        C: EmulationCore + ?Sized,
        A: AudioConsumer + ?Sized,
        V: VideoSink + ?Sized,
    {
        let speed_change = self.speed.update(input.buttons);

        if self.counters.decide() == FrameDecision::Duplicate {
            self.counters.record_duplicate();
            self.frame.present_duplicate(video);
            tracing::trace!(frames = self.counters.frames_count(), "duplicate frame");
            return TickReport::new(TickKind::Duplicate, speed_change);
        }

        let plan = self.speed.plan();
        if plan.super_steps == 0 {
            self.frame.present(video);
            return TickReport::new(TickKind::SlowMotionHold, speed_change);
        }

        let mut report = TickReport::new(TickKind::Emulated, speed_change);
        for step in 0..plan.super_steps {
            let render = !plan.skip_intermediate_video || step + 1 == plan.super_steps;
            report.samples_produced += self.run_super_step(core, render);
        }
        report.super_steps = plan.super_steps;

        self.frame.present(video);

        let muted = self
            .speed
            .mutes_audio(self.config.deliver_audio_during_non_normal_speed)
            || (input.host_fast_forward && !self.config.deliver_audio_during_non_normal_speed);
        if self.audio_enabled && !muted {
            report.delivery = Some(self.delivery.deliver(self.output.drain(), audio));
        }
        self.output.clear();

        self.counters.advance_frames(u64::from(plan.super_steps));
        report
    }

    /// Run the core up to the next frame boundary; returns native samples taken
    fn run_super_step<C: EmulationCore + ?Sized>(&mut self, core: &mut C, render: bool) -> u64 {
        let limit = self.timing.samples_per_frame * RUNAWAY_FRAME_LIMIT;
        let max_calls = limit / SOUND_SAMPLES_PER_RUN as u64 + 1;
        let pitch = self.frame.pitch();
        let mut total = 0u64;
        let mut calls = 0u64;

        loop {
            let video = if render {
                Some(self.frame.pixels_mut())
            } else {
                None
            };
            let outcome = core.run_for(video, pitch, &mut self.sink, SOUND_SAMPLES_PER_RUN);
            calls += 1;

            let produced = outcome.produced.min(self.sink.len());
            if produced < outcome.produced {
                tracing::warn!(
                    reported = outcome.produced,
                    capacity = self.sink.len(),
                    "core overran the sample sink; excess discarded"
                );
            }

            self.feed_audio(produced);
            self.counters.add_samples(produced as u64);
            total += produced as u64;

            if outcome.frame_complete {
                break;
            }
            if total >= limit || calls >= max_calls {
                tracing::warn!(
                    samples = total,
                    calls,
                    "no frame boundary reached; super-step cut short"
                );
                break;
            }
        }

        self.drain_resampler();
        total
    }

    fn feed_audio(&mut self, produced: usize) {
        if !self.audio_enabled || produced == 0 {
            return;
        }
        self.resampler.push(&self.sink[..produced]);
        if self.resampler.wants_drain() {
            self.drain_resampler();
        }
    }

    fn drain_resampler(&mut self) {
        if !self.audio_enabled {
            return;
        }
        if let Err(e) = self.output.fill_from(&mut self.resampler) {
            self.disable_audio(&e);
        }
    }

    fn disable_audio(&mut self, err: &Error) {
        tracing::error!(error = %err, "disabling audio output for this session");
        self.audio_enabled = false;
        self.output.clear();
        self.resampler.reset();
        self.notifier
            .show_message(AUDIO_DISABLED_MESSAGE, FALLBACK_MESSAGE_FRAMES);
    }
}

impl<N: HostNotifier + std::fmt::Debug> std::fmt::Debug for Pipeline<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("resampler", &self.resampler.kind())
            .field("output_rate", &self.resampler.output_rate())
            .field("counters", &self.counters)
            .field("speed", &self.speed.mode())
            .field("audio_enabled", &self.audio_enabled)
            .field("notifier", &self.notifier)
            .finish()
    }
}

/// Construct the configured resampler, falling back to decimation when sinc
/// cannot be allocated.
///
/// A fallback is announced once, written back to the host and recorded in
/// `config`; later calls with `sinc_failed` set go straight to decimation.
fn build_resampler<N: HostNotifier + ?Sized>(
    config: &mut PipelineConfig,
    timing: &TimingConfig,
    sinc_failed: &mut bool,
    notifier: &mut N,
) -> Result<Resampler> {
    if config.resampler_strategy == ResamplerKind::Sinc {
        if !*sinc_failed {
            match Resampler::construct(
                ResamplerKind::Sinc,
                config.output_rate_hint,
                timing,
                &config.sinc,
            ) {
                Ok(resampler) => return Ok(resampler),
                Err(Error::AllocationFailed { bytes }) => {
                    tracing::warn!(bytes, "sinc resampler allocation failed; using decimation");
                    *sinc_failed = true;
                    notifier.show_message(SINC_FALLBACK_MESSAGE, FALLBACK_MESSAGE_FRAMES);
                    notifier.set_option(RESAMPLER_OPTION_KEY, ResamplerKind::Decimation.as_str());
                }
                Err(e) => return Err(e),
            }
        }
        config.resampler_strategy = ResamplerKind::Decimation;
    }

    Resampler::construct(
        ResamplerKind::Decimation,
        config.output_rate_hint,
        timing,
        &config.sinc,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::{StepOutcome, ToneCore};
    use crate::resampler::SincConfig;
    use crate::video::{NullVideoSink, Pixel};

    /// Core that never produces samples and never finishes a frame
    #[derive(Default)]
    struct StalledCore {
        calls: u64,
    }

    impl EmulationCore for StalledCore {
        fn run_for(
            &mut self,
            _video: Option<&mut [Pixel]>,
            _pitch: usize,
            _samples: &mut [StereoFrame],
            _requested: usize,
        ) -> StepOutcome {
            self.calls += 1;
            StepOutcome::needs_more(0)
        }
    }

    fn decimation_config() -> PipelineConfig {
        PipelineConfig {
            resampler_strategy: ResamplerKind::Decimation,
            ..PipelineConfig::default()
        }
    }

    fn accept_all(_: &[i16], frames: usize) -> usize {
        frames
    }

    #[test]
    fn test_emulated_tick_advances_counters() {
        let mut pipeline = Pipeline::new(decimation_config(), NullNotifier).unwrap();
        let mut core = ToneCore::new(440.0);
        let report = pipeline.run_tick(
            &mut core,
            TickInput::default(),
            &mut accept_all,
            &mut NullVideoSink,
        );
        assert_eq!(report.kind, TickKind::Emulated);
        assert_eq!(report.super_steps, 1);
        assert_eq!(report.samples_produced, 35_112);
        assert_eq!(pipeline.counters().frames_count(), 1);
        assert_eq!(pipeline.counters().samples_count(), 35_112);
        let delivered = report.delivery.unwrap().delivered;
        assert!((535..=536).contains(&delivered), "delivered {delivered}");
    }

    #[test]
    fn test_duplicate_tick_skips_core() {
        let mut pipeline = Pipeline::new(decimation_config(), NullNotifier).unwrap();
        *pipeline.counters_mut() = SyncCounters::with_counts(35_112, 3 * 35_112, 2);
        let mut core = ToneCore::new(440.0);
        let mut shown = Vec::new();
        let mut video = |f: Option<&[u16]>, _: usize, _: usize, _: usize| shown.push(f.is_some());
        let report =
            pipeline.run_tick(&mut core, TickInput::default(), &mut accept_all, &mut video);
        assert_eq!(report.kind, TickKind::Duplicate);
        assert_eq!(core.calls(), 0);
        assert_eq!(pipeline.counters().frames_count(), 3);
        assert_eq!(shown, vec![false]);
    }

    #[test]
    fn test_one_below_boundary_runs_core() {
        let mut pipeline = Pipeline::new(decimation_config(), NullNotifier).unwrap();
        *pipeline.counters_mut() = SyncCounters::with_counts(35_112, 3 * 35_112 - 1, 2);
        let mut core = ToneCore::new(440.0);
        let report = pipeline.run_tick(
            &mut core,
            TickInput::default(),
            &mut accept_all,
            &mut NullVideoSink,
        );
        assert_eq!(report.kind, TickKind::Emulated);
        assert!(core.calls() > 0);
    }

    #[test]
    fn test_stalled_core_is_cut_off() {
        let mut pipeline = Pipeline::new(decimation_config(), NullNotifier).unwrap();
        let mut core = StalledCore::default();
        let report = pipeline.run_tick(
            &mut core,
            TickInput::default(),
            &mut accept_all,
            &mut NullVideoSink,
        );
        // 4 * 35112 / 2064 + 1
        assert_eq!(core.calls, 69);
        assert_eq!(report.kind, TickKind::Emulated);
        assert_eq!(report.samples_produced, 0);
        assert_eq!(pipeline.counters().frames_count(), 1);

        pipeline.run_tick(
            &mut core,
            TickInput::default(),
            &mut accept_all,
            &mut NullVideoSink,
        );
        assert_eq!(core.calls, 138);
    }

    #[test]
    fn test_rejected_sinc_block_leaves_pipeline_untouched() {
        let mut pipeline = Pipeline::new(decimation_config(), NullNotifier).unwrap();
        let bad = PipelineConfig {
            fast_forward_multipliers: vec![2],
            sinc: SincConfig {
                taps: 0,
                ..SincConfig::default()
            },
            ..PipelineConfig::default()
        };
        assert!(pipeline.apply_config(bad).is_err());
        assert_eq!(pipeline.config(), &decimation_config());
        assert_eq!(pipeline.resampler_kind(), ResamplerKind::Decimation);

        let mut core = ToneCore::new(440.0);
        let fast = JoypadButtons::SELECT | JoypadButtons::A;
        pipeline.run_tick(
            &mut core,
            TickInput::with_buttons(fast),
            &mut accept_all,
            &mut NullVideoSink,
        );
        assert_eq!(pipeline.speed_mode(), SpeedMode::FastForward(3));
    }

    #[test]
    fn test_sinc_fallback_on_allocation_failure() {
        let config = PipelineConfig {
            sinc: SincConfig {
                memory_limit_bytes: Some(16),
                ..SincConfig::default()
            },
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config, RecordingNotifier::default()).unwrap();
        assert_eq!(pipeline.resampler_kind(), ResamplerKind::Decimation);
        assert_eq!(pipeline.config().resampler_strategy, ResamplerKind::Decimation);
        assert_eq!(pipeline.notifier().messages, vec![SINC_FALLBACK_MESSAGE.to_string()]);
        assert_eq!(
            pipeline.notifier().options,
            vec![("audio_resampler".to_string(), "decimation".to_string())]
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            slow_motion_divisors: vec![],
            ..PipelineConfig::default()
        };
        assert!(Pipeline::new(config, NullNotifier).is_err());
    }
}
