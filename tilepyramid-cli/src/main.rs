//! tilepyramid CLI
//!
//! Downloads every tile covering a bounding box, from `--zoomlevel` down to
//! the deepest zoom, into a single MBTiles file.

mod error;
mod progress;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tilepyramid::build::{BuildRequest, PyramidBuilder};
use tilepyramid::config::ConfigFile;
use tilepyramid::coord::{BoundingBox, EdgeClip};
use tilepyramid::logging::{default_log_dir, default_log_file, init_logging};
use tilepyramid::provider::{ReqwestClient, TemplateTileSource, UrlTemplate};
use tokio_util::sync::CancellationToken;
use tracing::info;

use error::CliError;
use progress::{print_plan, print_report, BuildProgress};

/// Download a tile pyramid for a bounding box into an MBTiles file.
#[derive(Debug, Parser)]
#[command(name = "tilepyramid", version, about)]
struct Args {
    /// West edge in degrees longitude
    #[arg(long, default_value_t = 55.397945, allow_negative_numbers = true)]
    xmin: f64,

    /// South edge in degrees latitude
    #[arg(long, default_value_t = 25.291090, allow_negative_numbers = true)]
    ymin: f64,

    /// East edge in degrees longitude
    #[arg(long, default_value_t = 55.402741, allow_negative_numbers = true)]
    xmax: f64,

    /// North edge in degrees latitude
    #[arg(long, default_value_t = 25.292889, allow_negative_numbers = true)]
    ymax: f64,

    /// Shallowest zoom level; every level down to the max zoom is fetched
    #[arg(long, default_value_t = 19)]
    zoomlevel: u8,

    /// Output MBTiles file (replaced if it exists)
    #[arg(long)]
    filename: PathBuf,

    /// Tile URL template with {z}, {x}, {y} and optionally {s}
    #[arg(long)]
    url_template: Option<String>,

    /// Concurrent fetchers
    #[arg(long)]
    workers: Option<usize>,

    /// Fetch attempts per tile, including the first
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Refuse requests covering more tiles than this
    #[arg(long)]
    max_tiles: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Tile grid edge handling
    #[arg(long, value_enum)]
    edge_clip: Option<EdgeClipArg>,

    /// Skip ANALYZE/VACUUM after loading
    #[arg(long)]
    no_optimize: bool,

    /// Print tile counts per zoom level and exit without fetching
    #[arg(long)]
    dry_run: bool,

    /// Directory for the log file
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.tilepyramid/config.ini)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Edge clipping selection for CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EdgeClipArg {
    /// Keep tile indices in [0, 2^z)
    Exact,
    /// Also keep index 2^z on the east and south edges
    Inclusive,
}

impl From<EdgeClipArg> for EdgeClip {
    fn from(arg: EdgeClipArg) -> Self {
        match arg {
            EdgeClipArg::Exact => EdgeClip::Exact,
            EdgeClipArg::Inclusive => EdgeClip::Inclusive,
        }
    }
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        e.exit();
    }
}

fn load_config(args: &Args) -> Result<ConfigFile, CliError> {
    let config = match args.config {
        Some(ref path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Applies CLI overrides on top of the config file.
fn builder_for(
    args: &Args,
    config: &ConfigFile,
    cancel: CancellationToken,
) -> Result<PyramidBuilder, CliError> {
    let grid = config.tile_grid()?;
    let edge_clip = args
        .edge_clip
        .map(EdgeClip::from)
        .unwrap_or(config.grid.edge_clip);

    let mut download = config.download_config();
    if let Some(workers) = args.workers {
        download = download.with_workers(workers);
    }
    if let Some(max_attempts) = args.max_attempts {
        download = download.with_backoff(
            max_attempts,
            Duration::from_millis(config.download.initial_backoff_ms),
            Duration::from_millis(config.download.max_backoff_ms),
        );
    }

    let template = args
        .url_template
        .as_deref()
        .unwrap_or(&config.source.url_template);
    let template = UrlTemplate::parse(template)?;
    let timeout = args.timeout.unwrap_or(config.source.timeout);
    let client = ReqwestClient::with_options(timeout, &config.source.user_agent)?;
    let source = TemplateTileSource::new(client, template);

    let max_tiles = args.max_tiles.unwrap_or(config.download.max_tiles);

    Ok(PyramidBuilder::new(Arc::new(source), grid, download)
        .with_edge_clip(edge_clip)
        .with_max_tiles(max_tiles)
        .with_cancellation(cancel))
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(&args)?;

    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_log_dir()));
    let _logging_guard = init_logging(&log_dir, default_log_file())
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let bbox = BoundingBox::new(args.xmin, args.ymin, args.xmax, args.ymax)?;
    let cancel = CancellationToken::new();
    let builder = builder_for(&args, &config, cancel.clone())?;

    let plan = builder.plan(&bbox, args.zoomlevel).map_err(|error| CliError::Build {
        path: args.filename.clone(),
        error,
    })?;
    print_plan(&plan);
    if args.dry_run {
        return Ok(());
    }
    builder.check_plan(&plan).map_err(|error| CliError::Build {
        path: args.filename.clone(),
        error,
    })?;

    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, stopping workers...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::SignalHandler(e.to_string()))?;

    let progress = BuildProgress::new(plan.total_tiles());
    let builder = builder.with_progress(progress.callback());
    let request = BuildRequest::new(bbox, args.zoomlevel, &args.filename)
        .with_optimize(!args.no_optimize);

    info!(output = %args.filename.display(), tiles = plan.total_tiles(), "Starting build");
    let result = builder.build(&request);
    progress.finish(result.is_ok());

    let report = result.map_err(|error| CliError::Build {
        path: args.filename.clone(),
        error,
    })?;
    print_report(&report);
    Ok(())
}
