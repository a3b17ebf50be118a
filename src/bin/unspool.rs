use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use unspool::{
    DEFAULT_QUEUE_CAPACITY, FfmpegLogLevel, ImageSurface, MediaMetadata, MediaSource, Pipeline,
    PipelineOptions, PlaybackReport, ProgressCallback, ProgressInfo,
};

const CLI_AFTER_HELP: &str = "Examples:\n  unspool probe input.mp4 --json\n  unspool play input.mp4 --progress\n  unspool play input.mp4 --snapshots frames --snapshot-every 25 --duration 0:10\n  unspool completions zsh > _unspool";

/// How often the event loop checks for quit conditions.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Parser)]
#[command(
    name = "unspool",
    version,
    about = "Decode and present the video stream of a media file",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging from the pipeline.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while playing.
    #[arg(long, global = true)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true, value_parser = parse_log_level)]
    log_level: Option<FfmpegLogLevel>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play the video stream of a file into a headless surface.
    #[command(
        about = "Play a media file",
        after_help = "Examples:\n  unspool play input.mp4\n  unspool play input.mkv --queue-capacity 60 --no-flush --json"
    )]
    Play {
        /// Input media path or URL.
        input: String,

        /// Packet queue capacity.
        #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
        queue_capacity: usize,

        /// Directory to write PNG snapshots of presented frames to.
        #[arg(long)]
        snapshots: Option<PathBuf>,

        /// Write a snapshot every Nth presented frame.
        #[arg(long, default_value_t = 30)]
        snapshot_every: u64,

        /// Stop after this much wall-clock time (seconds, MM:SS, or HH:MM:SS).
        #[arg(long, value_parser = parse_duration)]
        duration: Option<Duration>,

        /// Do not flush the decoder's buffered frames at end of stream.
        #[arg(long)]
        no_flush: bool,

        /// Print the playback report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the selected video stream and container details.
    #[command(
        about = "Print media metadata",
        visible_alias = "info",
        after_help = "Examples:\n  unspool probe input.mp4\n  unspool probe input.mp4 --json"
    )]
    Probe {
        /// Input media path or URL.
        input: String,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_log_level(value: &str) -> Result<FfmpegLogLevel, String> {
    value.parse()
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".to_string());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds)
            .map_err(|error| format!("invalid time value {trimmed}: {error}"));
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let invalid = || format!("invalid time format: {trimmed}");
    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => (0, minutes.parse::<u64>().map_err(|_| invalid())?, *seconds),
        [hours, minutes, seconds] => (
            hours.parse::<u64>().map_err(|_| invalid())?,
            minutes.parse::<u64>().map_err(|_| invalid())?,
            *seconds,
        ),
        _ => return Err(invalid()),
    };
    let seconds = seconds.parse::<f64>().map_err(|_| invalid())?;

    Duration::try_from_secs_f64(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
        .map_err(|_| invalid())
}

fn init_logging(global: &GlobalOptions) {
    let filter = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .init();

    if let Some(level) = global.log_level {
        unspool::set_ffmpeg_log_level(level);
    }
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(total: Option<u64>) -> Self {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::with_template(
                    "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames {msg}",
                ) {
                    bar.set_style(style.progress_chars("##-"));
                }
                bar
            }
            None => ProgressBar::new_spinner(),
        };
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.frames_presented);
        if info.frames_dropped > 0 {
            self.bar.set_message(format!("({} dropped)", info.frames_dropped));
        }
    }
}

fn print_metadata(metadata: &MediaMetadata, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let video = &metadata.video;
    if as_json {
        let payload = json!({
            "format": metadata.format,
            "duration_seconds": metadata.duration.as_secs_f64(),
            "stream_count": metadata.stream_count,
            "video": {
                "stream_index": video.stream_index,
                "width": video.width,
                "height": video.height,
                "pixel_format": video.pixel_format.name(),
                "native_pixel_format": video.pixel_format_name,
                "codec": video.codec,
                "fps": video.frames_per_second,
                "frame_count": video.frame_count,
                "time_base": format!("{}/{}", video.time_base.numerator(), video.time_base.denominator()),
            },
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{} {}", "Format:".bold(), metadata.format);
    println!("{} {:.3}s", "Duration:".bold(), metadata.duration.as_secs_f64());
    println!("{} {}", "Streams:".bold(), metadata.stream_count);
    println!(
        "{} #{} {} {}x{} @ {:.3} fps (~{} frames)",
        "Video:".bold(),
        video.stream_index,
        video.codec,
        video.width,
        video.height,
        video.frames_per_second,
        video.frame_count
    );
    let presentable = if video.pixel_format == unspool::PixelFormat::Unknown {
        "not presentable".red().to_string()
    } else {
        video.pixel_format.name().green().to_string()
    };
    println!(
        "{} {} ({})",
        "Pixel format:".bold(),
        video.pixel_format_name,
        presentable
    );
    Ok(())
}

fn print_report(
    report: &PlaybackReport,
    interrupted: bool,
    as_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let demux = &report.demux;
    let decode = &report.decode;

    if as_json {
        let payload = json!({
            "interrupted": interrupted,
            "queue_high_water_mark": report.queue_high_water_mark,
            "demux": {
                "packets_read": demux.packets_read,
                "packets_enqueued": demux.packets_enqueued,
                "packets_discarded": demux.packets_discarded,
                "read_errors": demux.read_errors,
                "reached_end_of_stream": demux.reached_end_of_stream,
            },
            "decode": {
                "packets_received": decode.packets_received,
                "packets_submitted": decode.packets_submitted,
                "packets_rejected": decode.packets_rejected,
                "frames_decoded": decode.frames_decoded,
                "frames_presented": decode.frames_presented,
                "frames_dropped": decode.frames_dropped,
                "decode_errors": decode.decode_errors,
                "flushed": decode.flushed,
            },
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let status = if interrupted {
        "stopped".yellow().bold()
    } else {
        "finished".green().bold()
    };
    println!(
        "{status} {} frames presented, {} dropped",
        decode.frames_presented, decode.frames_dropped
    );
    println!(
        "  packets: {} read, {} queued, {} other-stream, {} read errors",
        demux.packets_read, demux.packets_enqueued, demux.packets_discarded, demux.read_errors
    );
    println!(
        "  decoder: {} submitted, {} rejected, {} errors, flushed: {}",
        decode.packets_submitted, decode.packets_rejected, decode.decode_errors, decode.flushed
    );
    println!("  queue high-water mark: {}", report.queue_high_water_mark);
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    match cli.command {
        Commands::Play {
            input,
            queue_capacity,
            snapshots,
            snapshot_every,
            duration,
            no_flush,
            json,
        } => {
            let source = MediaSource::open(&input)?;
            let mut surface = ImageSurface::new(source.video_format())?;
            if let Some(directory) = snapshots {
                surface = surface.with_snapshots(directory, snapshot_every);
            }

            let mut options = PipelineOptions::new()
                .with_queue_capacity(queue_capacity)
                .with_flush_on_drain(!no_flush);
            let progress = cli.global.progress.then(|| {
                let frame_count = source.metadata().video.frame_count;
                Arc::new(TerminalProgress::new((frame_count > 0).then_some(frame_count)))
            });
            if let Some(progress) = &progress {
                options = options.with_progress(Arc::clone(progress) as Arc<dyn ProgressCallback>);
            }

            let quit = Arc::new(AtomicBool::new(false));
            let quit_handler = Arc::clone(&quit);
            ctrlc::set_handler(move || quit_handler.store(true, Ordering::SeqCst))?;

            let pipeline = Pipeline::start(source, surface, options)?;
            let started = Instant::now();
            let mut interrupted = false;

            while !pipeline.is_finished() {
                if quit.load(Ordering::SeqCst) {
                    interrupted = true;
                    break;
                }
                if duration.is_some_and(|limit| started.elapsed() >= limit) {
                    interrupted = true;
                    break;
                }
                thread::sleep(POLL_INTERVAL);
            }

            pipeline.request_shutdown();
            let report = pipeline.join()?;
            if let Some(progress) = &progress {
                progress.finish();
            }
            print_report(&report, interrupted, json)?;
        }
        Commands::Probe { input, json } => {
            let metadata = MediaSource::probe(&input)?;
            print_metadata(&metadata, json)?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "unspool", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
