//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tilepyramid::build::BuildError;
use tilepyramid::config::ConfigFileError;
use tilepyramid::coord::CoordError;
use tilepyramid::provider::ProviderError;

/// Exit status after Ctrl-C, as shells report SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file error
    Config(ConfigFileError),
    /// Bounding box or zoom rejected
    InvalidRequest(CoordError),
    /// URL template or HTTP client setup failed
    Source(ProviderError),
    /// Failed to install the Ctrl-C handler
    SignalHandler(String),
    /// The build itself failed
    Build { path: PathBuf, error: BuildError },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Build { error, .. } if error.is_cancelled() => {
                eprintln!();
                eprintln!("The build was interrupted; the output file is incomplete.");
                process::exit(EXIT_INTERRUPTED)
            }
            CliError::Build {
                error: BuildError::InvalidRequest(CoordError::TooManyTiles { .. }),
                ..
            } => {
                eprintln!();
                eprintln!("Use a smaller box or a higher --zoomlevel; --max-tiles raises the limit.");
            }
            CliError::Build { path, error } => {
                if let (Some(tile), Some(stage)) = (error.tile(), error.stage()) {
                    eprintln!();
                    eprintln!("Failed tile: {} (stage: {})", tile, stage);
                }
                if !matches!(error, BuildError::InvalidRequest(_)) {
                    eprintln!(
                        "'{}' has no metadata and should not be used; re-run to rebuild it.",
                        path.display()
                    );
                }
            }
            CliError::InvalidRequest(_) => {
                eprintln!();
                eprintln!("Bounding boxes are --xmin --ymin --xmax --ymax in degrees:");
                eprintln!("  longitudes within [-180, 180], latitudes within ±85.0511,");
                eprintln!("  with xmin < xmax and ymin < ymax.");
            }
            CliError::Source(ProviderError::InvalidTemplate(_)) => {
                eprintln!();
                eprintln!("URL templates need {{z}}, {{x}} and {{y}}; {{s}} selects a subdomain.");
                eprintln!("Example: https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidRequest(e) => write!(f, "Invalid request: {}", e),
            CliError::Source(e) => write!(f, "Tile source error: {}", e),
            CliError::SignalHandler(msg) => write!(f, "Failed to set signal handler: {}", msg),
            CliError::Build { path, error } => {
                write!(f, "Failed to build '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::InvalidRequest(e) => Some(e),
            CliError::Source(e) => Some(e),
            CliError::Build { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::InvalidRequest(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Source(e)
    }
}
