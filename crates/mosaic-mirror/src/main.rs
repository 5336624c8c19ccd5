//! mosaic-mirror: run the mosaic mirror over recorded frames.
//!
//! Feeds a directory of images (or one still image) through the mosaic
//! engine, optionally writes every composed frame as a PNG, and prints
//! per-tick diagnostics plus an end-of-run summary. Useful for:
//!
//! - Watching how the library fills up on real footage
//! - Comparing the brightness and color index strategies
//! - Tuning tile size, coarseness, and the refresh decay
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin mosaic-mirror -- [OPTIONS] <INPUT>
//! ```
//!
//! Set `RUST_LOG=debug` for per-tick engine logs.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::{Parser, ValueEnum};
use mosaic_engine::{
    BrightnessIndex, ColorIndex, DisplaySink, FrameFit, FrameSource, IndexKind, IndexStrategy,
    MirrorConfig, MirrorError, MosaicEngine, ResizeFilter, RunSummary, StopReason,
    TickDiagnostics,
};
use mosaic_io::{ImageSequenceSource, IoError, NullSink, PngSequenceSink, StillSource};

/// Mosaic mirror over image files.
///
/// Rebuilds every input frame from tiles recalled out of a growing
/// library of previously seen tiles.
#[derive(Parser)]
#[command(name = "mosaic-mirror", version)]
struct Cli {
    /// Directory of frames (played in file-name order) or a single image.
    input: PathBuf,

    /// Write composed frames as numbered PNGs into this directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// How many times to feed a single input image (0 = forever).
    #[arg(long, default_value_t = 1)]
    repeat: u64,

    /// Restart a directory of frames after the last one.
    #[arg(long = "loop")]
    looping: bool,

    /// Stop after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Seed for the refresh decisions. Random if omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Side length of the square working frame in pixels.
    #[arg(long, default_value_t = MirrorConfig::DEFAULT_FRAME_DIMENSION, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    frame_dimension: u32,

    /// Tile side length in pixels.
    #[arg(long, default_value_t = MirrorConfig::DEFAULT_TILE_SIZE, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    tile_size: u32,

    /// Key quantization step.
    #[arg(long, default_value_t = MirrorConfig::DEFAULT_COARSENESS, value_parser = clap::builder::RangedU64ValueParser::<u8>::new().range(1..))]
    coarseness: u8,

    /// Refresh decay time constant in seconds.
    #[arg(long, default_value_t = MirrorConfig::DEFAULT_TAU)]
    tau: f64,

    /// Weight of the novelty score in the refresh decision.
    #[arg(long, default_value_t = MirrorConfig::DEFAULT_NOVELTY_WEIGHT)]
    novelty_weight: f64,

    /// Library key strategy.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_INDEX)]
    index: Index,

    /// How non-square frames are fitted to the working square.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FIT)]
    fit: Fit,

    /// Resampling filter (nearest, triangle, catmull-rom, gaussian, lanczos3).
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    filter: Filter,

    /// Do not flip frames horizontally.
    #[arg(long)]
    no_mirror: bool,

    /// Output diagnostics as JSON lines instead of human-readable reports.
    #[arg(long)]
    json: bool,

    /// Full mirror config as a JSON string.
    ///
    /// When provided, all other config flags are ignored. Missing fields
    /// take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Library key strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Index {
    /// Mean brightness, floored to the coarseness step.
    Brightness,
    /// Mean color per channel, rounded to the coarseness step.
    Color,
}

/// Frame fit selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Fit {
    /// Resize the whole frame, ignoring aspect ratio.
    Stretch,
    /// Crop the centered square first.
    CenterCrop,
}

/// Resampling filter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

const fn index_from_engine(kind: IndexKind) -> Index {
    match kind {
        IndexKind::Brightness => Index::Brightness,
        IndexKind::Color => Index::Color,
    }
}

const fn fit_from_engine(fit: FrameFit) -> Fit {
    match fit {
        FrameFit::Stretch => Fit::Stretch,
        FrameFit::CenterCrop => Fit::CenterCrop,
    }
}

/// Maps a [`ResizeFilter`] to the local CLI [`Filter`] enum.
const fn filter_from_engine(filter: ResizeFilter) -> Filter {
    match filter {
        ResizeFilter::Nearest => Filter::Nearest,
        ResizeFilter::Triangle => Filter::Triangle,
        ResizeFilter::CatmullRom => Filter::CatmullRom,
        ResizeFilter::Gaussian => Filter::Gaussian,
        ResizeFilter::Lanczos3 => Filter::Lanczos3,
    }
}

// CLI defaults are derived from the engine defaults so the two cannot drift.
const CLI_DEFAULT_INDEX: Index = index_from_engine(MirrorConfig::DEFAULT_INDEX);
const CLI_DEFAULT_FIT: Fit = fit_from_engine(MirrorConfig::DEFAULT_FIT);
const CLI_DEFAULT_FILTER: Filter = filter_from_engine(MirrorConfig::DEFAULT_FILTER);

/// Build a [`MirrorConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual config flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<MirrorConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(MirrorConfig {
        frame_dimension: cli.frame_dimension,
        tile_size: cli.tile_size,
        coarseness: cli.coarseness,
        tau: cli.tau,
        novelty_weight: cli.novelty_weight,
        index: match cli.index {
            Index::Brightness => IndexKind::Brightness,
            Index::Color => IndexKind::Color,
        },
        fit: match cli.fit {
            Fit::Stretch => FrameFit::Stretch,
            Fit::CenterCrop => FrameFit::CenterCrop,
        },
        filter: match cli.filter {
            Filter::Nearest => ResizeFilter::Nearest,
            Filter::Triangle => ResizeFilter::Triangle,
            Filter::CatmullRom => ResizeFilter::CatmullRom,
            Filter::Gaussian => ResizeFilter::Gaussian,
            Filter::Lanczos3 => ResizeFilter::Lanczos3,
        },
        mirror: !cli.no_mirror,
    })
}

/// Open the input as a frame sequence (directory) or a repeated still.
fn open_source(cli: &Cli) -> Result<Box<dyn FrameSource>, IoError> {
    if cli.input.is_dir() {
        Ok(Box::new(ImageSequenceSource::open(&cli.input, cli.looping)?))
    } else {
        let repeat = (cli.repeat != 0).then_some(cli.repeat);
        Ok(Box::new(StillSource::open(&cli.input, repeat)?))
    }
}

fn open_sink(cli: &Cli) -> Result<Box<dyn DisplaySink>, IoError> {
    match &cli.output {
        Some(dir) => Ok(Box::new(PngSequenceSink::create(dir)?)),
        None => Ok(Box::new(NullSink::default())),
    }
}

fn print_tick(tick: &TickDiagnostics, json: bool) {
    if json {
        match serde_json::to_string(tick) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("Error serializing diagnostics: {e}"),
        }
    } else {
        println!("{}", tick.report());
    }
}

/// Run the engine with key strategy `S` until the source or the tick
/// budget is exhausted.
///
/// A source that runs dry after at least one frame ends the run
/// normally; failing on the very first read is an error.
fn run_mirror<S: IndexStrategy>(
    cli: &Cli,
    config: MirrorConfig,
    source: &mut dyn FrameSource,
    sink: &mut dyn DisplaySink,
) -> Result<RunSummary, MirrorError> {
    let mut engine: MosaicEngine<S> = match cli.seed {
        Some(seed) => MosaicEngine::seeded(config, seed)?,
        None => MosaicEngine::from_entropy(config)?,
    };

    let stop = AtomicBool::new(false);
    let mut progress = RunSummary::new(StopReason::Requested);
    let result = engine.run_with(source, sink, &stop, cli.max_ticks, |tick| {
        progress.record(tick);
        print_tick(tick, cli.json);
    });

    match result {
        Err(MirrorError::FrameReadFailure { tick }) if tick > 0 => {
            log::info!("source exhausted after {tick} ticks");
            progress.stop_reason = StopReason::SourceExhausted;
            Ok(progress)
        }
        other => other,
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let mut source = match open_source(&cli) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {}", MirrorError::from(e));
            return ExitCode::FAILURE;
        }
    };
    let mut sink = match open_sink(&cli) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Input: {}", cli.input.display());
    if let Some(ref dir) = cli.output {
        eprintln!("Output: {}", dir.display());
    }
    eprintln!("Config: {config:#?}");
    eprintln!();

    let result = match config.index {
        IndexKind::Brightness => {
            run_mirror::<BrightnessIndex>(&cli, config, source.as_mut(), sink.as_mut())
        }
        IndexKind::Color => run_mirror::<ColorIndex>(&cli, config, source.as_mut(), sink.as_mut()),
    };

    match result {
        Ok(summary) => {
            if cli.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Error serializing summary: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!();
                println!("{}", summary.report());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Mirror error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mosaic-mirror").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_flags_match_default_config() {
        let cli = parse(&["frames"]);
        assert_eq!(config_from_cli(&cli).unwrap(), MirrorConfig::default());
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&[
            "frames",
            "--tile-size",
            "16",
            "--index",
            "color",
            "--fit",
            "center-crop",
            "--filter",
            "lanczos3",
            "--no-mirror",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.tile_size, 16);
        assert_eq!(config.index, IndexKind::Color);
        assert_eq!(config.fit, FrameFit::CenterCrop);
        assert_eq!(config.filter, ResizeFilter::Lanczos3);
        assert!(!config.mirror);
    }

    #[test]
    fn config_json_wins_over_flags() {
        let cli = parse(&[
            "frames",
            "--tile-size",
            "16",
            "--config-json",
            r#"{"tile_size": 27, "index": "Color"}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.tile_size, 27);
        assert_eq!(config.index, IndexKind::Color);
        assert_eq!(config.frame_dimension, MirrorConfig::DEFAULT_FRAME_DIMENSION);
    }

    #[test]
    fn malformed_config_json_is_reported() {
        let cli = parse(&["frames", "--config-json", "{not json"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("--config-json"));
    }

    #[test]
    fn zero_coarseness_is_rejected_by_parser() {
        let args = ["mosaic-mirror", "frames", "--coarseness", "0"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn loop_and_limits_parse() {
        let cli = parse(&["frames", "--loop", "--max-ticks", "30", "--seed", "9"]);
        assert!(cli.looping);
        assert_eq!(cli.max_ticks, Some(30));
        assert_eq!(cli.seed, Some(9));
        assert_eq!(cli.repeat, 1);
    }
}
