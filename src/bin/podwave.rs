use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use podwave::{
    Canvas, Color, ConcatOpts, Fps, RenderOpts, WaveformVideoOpts, concat_audio,
    create_waveform_video, merge_videos,
};

#[derive(Parser, Debug)]
#[command(name = "podwave", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an animated waveform MP4 for one audio clip (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Merge audio clips from a concat manifest, stamping chapter markers.
    Concat(ConcatArgs),
    /// Merge fragment videos into one episode MP4.
    Merge(MergeArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input audio file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Frame width in pixels (must be even).
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Frame height in pixels (must be even).
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Frame rate.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Waveform color as #RRGGBB hex.
    #[arg(long, default_value = "#00FF00")]
    color: Color,

    /// Background color as #RRGGBB hex.
    #[arg(long, default_value = "#333333")]
    background: Color,

    /// Optional avatar image composited at frame center.
    #[arg(long)]
    avatar: Option<PathBuf>,

    /// Override the worker pool size (defaults to cores minus one).
    #[arg(long)]
    workers: Option<usize>,

    /// Disable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Overwrite the output file if it already exists.
    #[arg(long, default_value_t = true)]
    overwrite: bool,
}

#[derive(Parser, Debug)]
struct ConcatArgs {
    /// Concat manifest file (`file PATH` per line).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Merged audio output path.
    #[arg(long)]
    out: PathBuf,

    /// Output sample rate in Hz.
    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,

    /// Output channel count.
    #[arg(long, default_value_t = 2)]
    channels: u16,

    /// Output bitrate.
    #[arg(long, default_value = "192k")]
    bitrate: String,
}

#[derive(Parser, Debug)]
struct MergeArgs {
    /// Output episode MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Fragment videos in episode order.
    #[arg(required = true)]
    videos: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Concat(args) => cmd_concat(args),
        Command::Merge(args) => cmd_merge(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let opts = WaveformVideoOpts {
        canvas: Canvas {
            width: args.width,
            height: args.height,
        },
        fps: Fps::new(args.fps, 1)?,
        wave_color: args.color,
        background_color: args.background,
        avatar_path: args.avatar,
        render: RenderOpts {
            parallel: !args.sequential,
            workers: args.workers,
            ..RenderOpts::default()
        },
        overwrite: args.overwrite,
    };

    let stats = create_waveform_video(&args.in_path, &args.out, &opts)?;
    eprintln!(
        "wrote {} ({} frames, {} workers)",
        args.out.display(),
        stats.frames_total,
        stats.workers
    );
    Ok(())
}

fn cmd_concat(args: ConcatArgs) -> anyhow::Result<()> {
    let opts = ConcatOpts {
        sample_rate: args.sample_rate,
        channels: args.channels,
        bitrate: args.bitrate,
        ..ConcatOpts::default()
    };

    let timeline = concat_audio(&args.in_path, &args.out, &opts)?;
    eprintln!(
        "wrote {} ({} segments, {})",
        args.out.display(),
        timeline.segments.len(),
        podwave::format_hms(timeline.total_duration_secs)
    );
    Ok(())
}

fn cmd_merge(args: MergeArgs) -> anyhow::Result<()> {
    merge_videos(&args.videos, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}
