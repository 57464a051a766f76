//! confcache CLI: inspect and manage configuration snapshots.
//!
//! Provides `confcache resolve` to show where dependency names resolve to,
//! `confcache path` to print a snapshot's location, `confcache status` to check
//! a snapshot against its dependencies, and `confcache clear` to delete one.

#![warn(missing_docs)]

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use confcache_config::CacheConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// confcache: reuse serialized configuration objects across runs.
#[derive(Parser, Debug)]
#[command(name = "confcache", version, about = "Configuration snapshot cache")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to a `confcache.toml` settings file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve dependency names to file paths.
    Resolve {
        /// Names or partial paths to resolve.
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print the snapshot file location for a key.
    Path {
        /// Logical cache key.
        key: String,
    },
    /// Check whether a snapshot is current.
    Status(StatusArgs),
    /// Delete the snapshot for a key.
    Clear {
        /// Logical cache key.
        key: String,
    },
}

/// Arguments for the `confcache status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Logical cache key.
    pub key: String,

    /// Primary configuration file.
    pub config_path: String,

    /// Mapping sources the configuration is built from.
    pub mappings: Vec<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags and the settings file.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Verbosity level from `-v` flags.
    pub verbose: u8,
    /// Loaded settings.
    pub config: CacheConfig,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let config = match load_settings(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(2);
        }
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config,
    };

    let result = match cli.command {
        Command::Resolve { ref names } => commands::resolve(names, &global),
        Command::Path { ref key } => commands::path(key, &global),
        Command::Status(ref args) => commands::status(args, &global),
        Command::Clear { ref key } => commands::clear(key, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match (quiet, verbose) {
            (true, _) => "confcache=error",
            (false, 0) => "confcache=warn",
            (false, 1) => "confcache=info",
            (false, _) => "confcache=debug",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Loads `--config` if given, else `./confcache.toml` if present, else defaults.
fn load_settings(
    explicit: Option<&std::path::Path>,
) -> Result<CacheConfig, confcache_config::ConfigError> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading settings");
        return confcache_config::load_config(path);
    }
    let local = PathBuf::from(confcache_config::CONFIG_FILE_NAME);
    if local.is_file() {
        debug!(path = %local.display(), "loading local settings");
        return confcache_config::load_config(&local);
    }
    Ok(CacheConfig::default())
}
