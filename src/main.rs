//! Headless demo: drives the pipeline with the square-wave test core

use std::env;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use retro_avsync::audio::AudioConsumer;
use retro_avsync::emulator::ToneCore;
use retro_avsync::export::WavRecorder;
use retro_avsync::pipeline::{HostNotifier, Pipeline, PipelineConfig, TickInput, TickKind};
use retro_avsync::resampler::ResamplerKind;
use retro_avsync::sync::{JoypadButtons, SpeedCombos};
use retro_avsync::video::NullVideoSink;

const DEFAULT_FRAMES: u64 = 600;
const TONE_HZ: f64 = 440.0;

const USAGE: &str = "Usage:
  retro-avsync [options]

Options:
  --frames <n>          Host frames to run (default 600)
  --resampler <name>    sinc (default) | decimation
  --rate <hz>           Output sample rate hint (default 32000)
  --config <file.json>  Load settings; the effective settings are written back
  --wav <file.wav>      Record the delivered audio
  --ff-at <tick>        Press the fast-forward combo on this tick
  --slow-at <tick>      Press the slow-motion combo on this tick
  --ff-audio            Deliver audio while fast-forwarding / in slow motion
  --play                Play through the default audio device (feature \"streaming\")
  -h, --help            Show this help
";

#[derive(Debug, Default)]
struct Options {
    frames: Option<u64>,
    resampler: Option<ResamplerKind>,
    rate: Option<f64>,
    config: Option<PathBuf>,
    wav: Option<PathBuf>,
    ff_at: Vec<u64>,
    slow_at: Vec<u64>,
    ff_audio: bool,
    play: bool,
}

fn parse_args() -> anyhow::Result<Option<Options>> {
    let mut opts = Options::default();
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .with_context(|| format!("{flag} requires an argument"))
        };
        match arg.as_str() {
            "--help" | "-h" => return Ok(None),
            "--frames" => {
                opts.frames = Some(value("--frames")?.parse::<u64>().context("--frames")?)
            }
            "--resampler" => {
                let name = value("--resampler")?;
                match ResamplerKind::from_option(&name) {
                    Some(kind) => opts.resampler = Some(kind),
                    None => bail!("Unknown resampler: {name}"),
                }
            }
            "--rate" => opts.rate = Some(value("--rate")?.parse::<f64>().context("--rate")?),
            "--config" => opts.config = Some(value("--config")?.into()),
            "--wav" => opts.wav = Some(value("--wav")?.into()),
            "--ff-at" => opts.ff_at.push(value("--ff-at")?.parse::<u64>().context("--ff-at")?),
            "--slow-at" => opts
                .slow_at
                .push(value("--slow-at")?.parse::<u64>().context("--slow-at")?),
            "--ff-audio" => opts.ff_audio = true,
            "--play" => opts.play = true,
            _ => bail!("Unknown flag: {arg}"),
        }
    }
    Ok(Some(opts))
}

/// Frontend notifications go to the log
#[derive(Debug, Default)]
struct ConsoleNotifier;

impl HostNotifier for ConsoleNotifier {
    fn show_message(&mut self, text: &str, _frames: u32) {
        println!("[frontend] {text}");
    }

    fn set_option(&mut self, key: &str, value: &str) -> bool {
        tracing::info!(key, value, "option written back");
        true
    }
}

/// Where delivered audio ends up
enum Output {
    Discard,
    Wav(WavRecorder),
    #[cfg(feature = "streaming")]
    Device(std::sync::Arc<retro_avsync::streaming::RingBuffer>),
}

impl AudioConsumer for Output {
    fn deliver_audio(&mut self, interleaved: &[i16], frames: usize) -> usize {
        match self {
            Output::Discard => frames,
            Output::Wav(wav) => wav.deliver_audio(interleaved, frames),
            #[cfg(feature = "streaming")]
            Output::Device(ring) => ring.write_frames(interleaved, frames),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let opts = match parse_args() {
        Ok(Some(opts)) => opts,
        Ok(None) => {
            print!("{USAGE}");
            return Ok(());
        }
        Err(e) => {
            eprint!("{e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let mut config = match &opts.config {
        Some(path) => PipelineConfig::load_or_default(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(kind) = opts.resampler {
        config.resampler_strategy = kind;
    }
    if let Some(rate) = opts.rate {
        config.output_rate_hint = rate;
    }
    config.deliver_audio_during_non_normal_speed |= opts.ff_audio;

    let mut pipeline = Pipeline::new(config, ConsoleNotifier).context("building pipeline")?;
    let info = pipeline.av_info();
    println!("Resampler:   {}", pipeline.resampler_kind());
    println!("Output rate: {:.1} Hz", info.sample_rate);
    println!("Refresh:     {:.4} Hz\n", info.fps);

    let sample_rate = info.sample_rate.round() as u32;
    let mut output = open_output(&opts, sample_rate)?;
    #[cfg(feature = "streaming")]
    let _device = match &output {
        Output::Device(ring) => Some(
            retro_avsync::streaming::AudioDevice::new(sample_rate, std::sync::Arc::clone(ring))
                .context("opening audio device")?,
        ),
        _ => None,
    };

    let combos = SpeedCombos::default();
    let tick_period = Duration::from_secs_f64(1.0 / info.fps);
    let mut core = ToneCore::new(TONE_HZ);
    let mut video = NullVideoSink;
    let mut dupes = 0u64;
    let mut holds = 0u64;
    let start = Instant::now();

    for tick in 0..opts.frames.unwrap_or(DEFAULT_FRAMES) {
        let mut buttons = JoypadButtons::empty();
        if opts.ff_at.contains(&tick) {
            buttons |= combos.fast_forward;
        }
        if opts.slow_at.contains(&tick) {
            buttons |= combos.slow_motion;
        }

        let report = pipeline.run_tick(
            &mut core,
            TickInput::with_buttons(buttons),
            &mut output,
            &mut video,
        );
        match report.kind {
            TickKind::Duplicate => dupes += 1,
            TickKind::SlowMotionHold => holds += 1,
            TickKind::Emulated => {}
        }
        if let Some(change) = report.speed_change {
            println!("tick {tick}: {:?} -> {:?}", change.from, change.to);
        }

        if opts.play {
            let due = start + tick_period * (tick as u32 + 1);
            if let Some(wait) = due.checked_duration_since(Instant::now()) {
                std::thread::sleep(wait);
            }
        }
    }

    if let Output::Wav(wav) = output {
        let frames = wav.finalize().context("finalizing WAV")?;
        println!("WAV frames:        {frames}");
    }

    if let Some(path) = &opts.config {
        pipeline
            .config()
            .save(path)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let stats = pipeline.delivery_stats();
    let counters = pipeline.counters();
    println!("\n=== Session Statistics ===");
    println!("Elapsed:           {:.2} s", start.elapsed().as_secs_f32());
    println!("Core frames:       {}", core.frames_completed());
    println!("Frames accounted:  {}", counters.frames_count());
    println!("Native samples:    {}", counters.samples_count());
    println!("Duplicate frames:  {dupes}");
    println!("Slow-motion holds: {holds}");
    println!("Frames delivered:  {}", stats.delivered);
    println!("Frames dropped:    {}", stats.dropped);
    println!("Request cap:       {}", pipeline.max_accepted_frames());
    if !pipeline.audio_enabled() {
        println!("Audio:             disabled");
    }
    Ok(())
}

fn open_output(opts: &Options, sample_rate: u32) -> anyhow::Result<Output> {
    if opts.play {
        #[cfg(feature = "streaming")]
        {
            use retro_avsync::streaming::{RingBuffer, DEFAULT_RING_FRAMES};
            let ring = RingBuffer::new(DEFAULT_RING_FRAMES)?;
            return Ok(Output::Device(std::sync::Arc::new(ring)));
        }
        #[cfg(not(feature = "streaming"))]
        bail!("--play requires the \"streaming\" feature. Rebuild with `--features streaming`.");
    }
    if let Some(path) = &opts.wav {
        let wav = WavRecorder::create(path, sample_rate)
            .with_context(|| format!("creating {}", path.display()))?;
        return Ok(Output::Wav(wav));
    }
    Ok(Output::Discard)
}
