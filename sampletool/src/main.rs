use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};

use media_effects::{EffectDefinition, EffectRegistry};
use media_provider::{PacketQueue, ProviderState, SampleProvider};
use media_types::{
    AudioStreamInfo, ChannelLayout, CodecId, FieldOrder, PixelFormat, Rational, SampleFormat,
    StreamDescriptor, VideoStreamInfo,
};

mod config;
mod input;
mod logging;

use config::JobConfig;

#[derive(Parser, Debug)]
#[command(name = "sampletool")]
#[command(about = "Decode, process and convert raw media through a sample provider")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a raw video file, one tightly packed frame after another
    Video {
        #[command(flatten)]
        stream: VideoArgs,
        #[command(flatten)]
        job: JobArgs,
    },
    /// Process an interleaved little-endian PCM file
    Audio {
        #[command(flatten)]
        stream: AudioArgs,
        #[command(flatten)]
        job: JobArgs,
    },
    /// List the built-in effects
    Effects,
}

#[derive(clap::Args, Debug)]
struct JobArgs {
    /// Input file
    input: PathBuf,

    /// Output file for the converted samples
    output: PathBuf,

    /// JSON file with output formats and effects
    #[arg(long)]
    config: Option<PathBuf>,

    /// Effect as name or name=params, applied after those from --config (repeatable)
    #[arg(short, long = "effect")]
    effects: Vec<String>,

    /// Attach the effects once this many samples have been written
    #[arg(long, default_value = "0")]
    effects_from: usize,
}

#[derive(clap::Args, Debug)]
struct VideoArgs {
    /// Frame width in pixels
    #[arg(long)]
    width: u32,

    /// Frame height in pixels
    #[arg(long)]
    height: u32,

    /// Pixel format of the input frames
    #[arg(long, default_value = "yuv420p")]
    pix_fmt: PixelFormat,

    /// Frame rate of the input
    #[arg(long, default_value = "25")]
    fps: u32,

    /// Field order of the input frames
    #[arg(long, value_enum, default_value = "progressive")]
    field_order: FieldOrderArg,

    /// Output pixel format (nv12 or yuv420p), overrides --config
    #[arg(long)]
    output_format: Option<PixelFormat>,
}

#[derive(clap::Args, Debug)]
struct AudioArgs {
    /// Sample rate in Hz
    #[arg(long, default_value = "48000")]
    rate: u32,

    /// Channel layout of the input
    #[arg(long, default_value = "stereo")]
    layout: ChannelLayout,

    /// Sample format of the input (u8, s16, s32 or f32)
    #[arg(long, default_value = "s16")]
    sample_fmt: SampleFormat,

    /// Sample frames per packet
    #[arg(long, default_value = "1024")]
    samples_per_packet: usize,

    /// Output channel layout, overrides --config
    #[arg(long)]
    output_layout: Option<ChannelLayout>,

    /// Output sample format, overrides --config
    #[arg(long)]
    output_sample_fmt: Option<SampleFormat>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FieldOrderArg {
    Progressive,
    Tff,
    Bff,
}

impl From<FieldOrderArg> for FieldOrder {
    fn from(arg: FieldOrderArg) -> Self {
        match arg {
            FieldOrderArg::Progressive => FieldOrder::Progressive,
            FieldOrderArg::Tff => FieldOrder::TopFirst,
            FieldOrderArg::Bff => FieldOrder::BottomFirst,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    match args.command {
        Command::Video { stream, job } => {
            ensure!(stream.fps > 0, "--fps must be positive");
            let mut config = load_config(&job)?;
            if let Some(format) = stream.output_format {
                config.provider.video.target_format = format;
            }
            let info = VideoStreamInfo::new(stream.width, stream.height, stream.pix_fmt)
                .with_field_order(stream.field_order.into())
                .with_frame_rate(Rational::new(stream.fps as i32, 1));
            let time_base = Rational::new(1, stream.fps as i32);
            let descriptor = StreamDescriptor::video(0, CodecId::RawVideo, time_base, info)?;
            run(descriptor, &job, config, 1)
        }
        Command::Audio { stream, job } => {
            ensure!(stream.rate > 0, "--rate must be positive");
            let mut config = load_config(&job)?;
            if let Some(layout) = stream.output_layout {
                config.provider.audio.channel_layout = Some(layout);
            }
            if let Some(format) = stream.output_sample_fmt {
                config.provider.audio.sample_format = format;
            }
            let codec = input::pcm_codec(stream.sample_fmt)?;
            let info = AudioStreamInfo::new(stream.rate, stream.layout, stream.sample_fmt);
            let descriptor =
                StreamDescriptor::audio(0, codec, Rational::new(1, stream.rate as i32), info)?;
            run(descriptor, &job, config, stream.samples_per_packet)
        }
        Command::Effects => {
            let registry = EffectRegistry::with_builtins();
            println!("audio: {}", registry.audio_names().join(", "));
            println!("video: {}", registry.video_names().join(", "));
            Ok(())
        }
    }
}

fn load_config(job: &JobArgs) -> Result<JobConfig> {
    let mut config = match &job.config {
        Some(path) => JobConfig::load(path)?,
        None => JobConfig::default(),
    };
    for effect in &job.effects {
        let definition = EffectDefinition::parse(effect)
            .with_context(|| format!("invalid --effect '{effect}'"))?;
        config.effects.push(definition);
    }
    Ok(config)
}

fn run(
    stream: StreamDescriptor,
    job: &JobArgs,
    config: JobConfig,
    samples_per_packet: usize,
) -> Result<()> {
    let data = std::fs::read(&job.input)
        .with_context(|| format!("failed to read {}", job.input.display()))?;
    let packets: PacketQueue = input::packetize(&stream, &data, samples_per_packet)?
        .into_iter()
        .collect();
    info!(kind = %stream.kind(), packets = packets.len(), "input loaded");

    let decoder = media_decode::open(stream)?;
    let mut provider = SampleProvider::new(decoder, Box::new(packets), config.provider);
    provider
        .allocate()
        .context("failed to allocate the sample provider")?;

    let attach = |provider: &mut SampleProvider| -> Result<()> {
        provider
            .set_effects(&config.effects)
            .context("failed to build the effect chain")?;
        let names: Vec<_> = config.effects.iter().map(ToString::to_string).collect();
        info!(effects = ?names, "effects attached");
        Ok(())
    };
    let has_effects = !config.effects.is_empty();
    if has_effects && job.effects_from == 0 {
        attach(&mut provider)?;
    }

    let file = File::create(&job.output)
        .with_context(|| format!("failed to create {}", job.output.display()))?;
    let mut out = BufWriter::new(file);
    let mut written = 0usize;
    let mut bytes = 0usize;
    let mut dropped = 0usize;

    loop {
        match provider.get_next_sample() {
            Ok(Some(sample)) => {
                out.write_all(&sample.data)?;
                written += 1;
                bytes += sample.len();
                debug!(
                    timestamp = ?sample.timestamp,
                    interlaced = sample.is_interlaced(),
                    bytes = sample.len(),
                    "sample written"
                );
                if has_effects && written == job.effects_from {
                    attach(&mut provider)?;
                }
            }
            Ok(None) => break,
            Err(e) if provider.state() == ProviderState::Ready => {
                warn!(error = %e, "sample dropped");
                dropped += 1;
            }
            Err(e) => return Err(e).context("sample provider failed"),
        }
    }

    out.flush()?;
    provider.close();
    info!(
        samples = written,
        bytes,
        dropped,
        output = %job.output.display(),
        "done"
    );
    Ok(())
}
