use retro_avsync::emulator::ToneCore;
use retro_avsync::pipeline::{
    NullNotifier, Pipeline, PipelineConfig, TickInput, TickKind, TickReport,
};
use retro_avsync::resampler::ResamplerKind;
use retro_avsync::sync::{JoypadButtons, SpeedMode};
use retro_avsync::timing::SOUND_SAMPLES_PER_FRAME;
use retro_avsync::video::{NullVideoSink, Pixel};

const FAST: JoypadButtons = JoypadButtons::SELECT.union(JoypadButtons::A);
const SLOW: JoypadButtons = JoypadButtons::SELECT.union(JoypadButtons::B);

fn config(deliver_audio: bool) -> PipelineConfig {
    PipelineConfig {
        resampler_strategy: ResamplerKind::Decimation,
        deliver_audio_during_non_normal_speed: deliver_audio,
        ..PipelineConfig::default()
    }
}

fn accept_all(_: &[i16], frames: usize) -> usize {
    frames
}

fn tick(pipeline: &mut Pipeline, core: &mut ToneCore, buttons: JoypadButtons) -> TickReport {
    pipeline.run_tick(
        core,
        TickInput::with_buttons(buttons),
        &mut accept_all,
        &mut NullVideoSink,
    )
}

#[test]
fn fast_forward_cycles_and_advances_frames_by_multiplier() {
    let mut pipeline = Pipeline::new(config(false), NullNotifier).unwrap();
    let mut core = ToneCore::new(440.0);

    let report = tick(&mut pipeline, &mut core, FAST);
    assert_eq!(pipeline.speed_mode(), SpeedMode::FastForward(3));
    assert_eq!(report.super_steps, 3);
    assert_eq!(report.samples_produced, 3 * SOUND_SAMPLES_PER_FRAME);
    assert_eq!(report.delivery, None);
    assert_eq!(pipeline.counters().frames_count(), 3);
    assert_eq!(core.frames_rendered(), 3);

    // Holding the combo does not re-trigger
    let held = tick(&mut pipeline, &mut core, FAST);
    assert_eq!(held.speed_change, None);
    assert_eq!(pipeline.counters().frames_count(), 6);

    tick(&mut pipeline, &mut core, JoypadButtons::empty());
    let faster = tick(&mut pipeline, &mut core, FAST);
    assert_eq!(pipeline.speed_mode(), SpeedMode::FastForward(5));
    assert_eq!(faster.super_steps, 5);
    // 3 + 3 + 3 rendered, then only the last of the five
    assert_eq!(core.frames_completed(), 14);
    assert_eq!(core.frames_rendered(), 10);

    tick(&mut pipeline, &mut core, JoypadButtons::empty());
    let back = tick(&mut pipeline, &mut core, FAST);
    assert_eq!(pipeline.speed_mode(), SpeedMode::Normal);
    assert_eq!(back.super_steps, 1);
    assert!(back.delivery.is_some());

    // Counters stayed in lockstep: no duplicate frames were needed
    let counters = pipeline.counters();
    assert_eq!(counters.samples_count(), counters.frames_count() * SOUND_SAMPLES_PER_FRAME);
}

#[test]
fn fast_forward_audio_delivered_when_enabled() {
    let mut pipeline = Pipeline::new(config(true), NullNotifier).unwrap();
    let mut core = ToneCore::new(440.0);

    let report = tick(&mut pipeline, &mut core, FAST);
    let delivered = report.delivery.unwrap().delivered;
    assert!((1600..=1610).contains(&delivered), "delivered {delivered}");
}

#[test]
fn slow_motion_holds_between_emulated_ticks() {
    let mut pipeline = Pipeline::new(config(false), NullNotifier).unwrap();
    let mut core = ToneCore::new(440.0);
    let mut shown: Vec<bool> = Vec::new();
    let mut video = |f: Option<&[Pixel]>, _: usize, _: usize, _: usize| shown.push(f.is_some());

    let mut kinds = Vec::new();
    for i in 0..4 {
        let buttons = if i == 0 { SLOW } else { JoypadButtons::empty() };
        let report = pipeline.run_tick(
            &mut core,
            TickInput::with_buttons(buttons),
            &mut accept_all,
            &mut video,
        );
        assert_eq!(report.delivery, None);
        kinds.push(report.kind);
    }

    assert_eq!(pipeline.speed_mode(), SpeedMode::SlowMotion(2));
    assert_eq!(
        kinds,
        vec![
            TickKind::Emulated,
            TickKind::SlowMotionHold,
            TickKind::Emulated,
            TickKind::SlowMotionHold,
        ]
    );
    assert_eq!(core.frames_completed(), 2);
    // Hold ticks show the retained frame and advance neither counter
    assert_eq!(shown, vec![true; 4]);
    assert_eq!(pipeline.counters().frames_count(), 2);
    assert_eq!(pipeline.counters().samples_count(), 2 * SOUND_SAMPLES_PER_FRAME);
}

#[test]
fn slow_motion_fifth_speed() {
    let mut pipeline = Pipeline::new(config(false), NullNotifier).unwrap();
    let mut core = ToneCore::new(440.0);

    tick(&mut pipeline, &mut core, SLOW);
    tick(&mut pipeline, &mut core, JoypadButtons::empty());
    tick(&mut pipeline, &mut core, SLOW);
    assert_eq!(pipeline.speed_mode(), SpeedMode::SlowMotion(5));

    let before = core.frames_completed();
    let kinds: Vec<TickKind> = (0..10)
        .map(|_| tick(&mut pipeline, &mut core, JoypadButtons::empty()).kind)
        .collect();
    assert_eq!(core.frames_completed() - before, 2);
    assert_eq!(kinds.iter().filter(|k| **k == TickKind::Emulated).count(), 2);
}

#[test]
fn fast_forward_cancels_slow_motion_and_back() {
    let mut pipeline = Pipeline::new(config(false), NullNotifier).unwrap();
    let mut core = ToneCore::new(440.0);

    tick(&mut pipeline, &mut core, SLOW);
    tick(&mut pipeline, &mut core, JoypadButtons::empty());
    let report = tick(&mut pipeline, &mut core, FAST);
    let change = report.speed_change.unwrap();
    assert_eq!(change.from, SpeedMode::SlowMotion(2));
    assert_eq!(change.to, SpeedMode::FastForward(3));

    tick(&mut pipeline, &mut core, JoypadButtons::empty());
    tick(&mut pipeline, &mut core, SLOW);
    assert_eq!(pipeline.speed_mode(), SpeedMode::SlowMotion(2));
}

#[test]
fn simultaneous_edges_end_in_slow_motion() {
    let mut pipeline = Pipeline::new(config(false), NullNotifier).unwrap();
    let mut core = ToneCore::new(440.0);

    tick(&mut pipeline, &mut core, FAST | SLOW);
    assert_eq!(pipeline.speed_mode(), SpeedMode::SlowMotion(2));
}

#[test]
fn host_fast_forward_mutes_unless_enabled() {
    let mut core = ToneCore::new(440.0);
    let input = TickInput {
        buttons: JoypadButtons::empty(),
        host_fast_forward: true,
    };

    let mut muted = Pipeline::new(config(false), NullNotifier).unwrap();
    let report = muted.run_tick(&mut core, input, &mut accept_all, &mut NullVideoSink);
    assert_eq!(report.kind, TickKind::Emulated);
    assert_eq!(report.delivery, None);

    let mut audible = Pipeline::new(config(true), NullNotifier).unwrap();
    let report = audible.run_tick(&mut core, input, &mut accept_all, &mut NullVideoSink);
    assert!(report.delivery.unwrap().delivered > 0);
}

#[test]
fn custom_speed_lists_and_frameskip_threshold() {
    let cfg = PipelineConfig {
        fast_forward_multipliers: vec![2],
        slow_motion_divisors: vec![3],
        frameskip_min_multiplier: 2,
        ..config(false)
    };
    let mut pipeline = Pipeline::new(cfg, NullNotifier).unwrap();
    let mut core = ToneCore::new(440.0);

    let report = tick(&mut pipeline, &mut core, FAST);
    assert_eq!(pipeline.speed_mode(), SpeedMode::FastForward(2));
    assert_eq!(report.super_steps, 2);
    assert_eq!(core.frames_rendered(), 1);

    tick(&mut pipeline, &mut core, JoypadButtons::empty());
    tick(&mut pipeline, &mut core, FAST);
    assert_eq!(pipeline.speed_mode(), SpeedMode::Normal);
}
