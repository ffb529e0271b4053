//! droidplan - build-variant resolver
//!
//! Command-line entry point: parses arguments, loads configuration,
//! initializes logging and dispatches to a command.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use droidplan::commands::{
    render_error, BatchCommand, CheckCommand, ConfigCommand, ConvertCommand, ConvertTarget,
    PlanCommand, Report, ResolveCommand,
};
use droidplan::core::{ResolverConfig, APP_NAME, VERSION};

/// Resolve Flutter/Android app manifests into build plans
#[derive(Parser, Debug)]
#[command(name = "droidplan")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Treat warnings as failures (exit code 2)
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the artifact descriptor of a variant
    Resolve {
        /// Project directory or manifest file
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Variant to resolve (defaults to the configured default variant)
        #[arg(short, long)]
        variant: Option<String>,
    },

    /// Print the full build plan of a variant
    Plan {
        /// Project directory or manifest file
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(short, long)]
        variant: Option<String>,
        /// Write the plan to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve every variant the manifest declares
    Check {
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Convert between droidplan.toml and build.gradle.kts
    Convert {
        /// Project directory or manifest file
        input: PathBuf,
        /// Output file (format inferred from its name)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Target format
        #[arg(long, value_enum)]
        to: Option<ConvertTarget>,
    },

    /// Resolve several projects concurrently
    Batch {
        /// Project directories or manifest files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        variant: Option<String>,
        /// Maximum resolutions in flight
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Print the effective configuration
    Config {
        /// Print the config file location instead
        #[arg(long)]
        path: bool,
    },
}

fn init_logging(config: &ResolverConfig, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

async fn load_config(path: Option<&PathBuf>) -> Result<ResolverConfig> {
    let config = match path {
        Some(path) => ResolverConfig::load_from(path).await?,
        None => ResolverConfig::load().await?,
    };
    Ok(config)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_ref()).await?;
    init_logging(&config, cli.debug);
    debug!("{} v{}", APP_NAME, VERSION);

    let report: Report = match cli.command {
        Command::Resolve { path, variant } => {
            ResolveCommand { path, variant }.execute(&config).await?
        }
        Command::Plan {
            path,
            variant,
            output,
        } => {
            PlanCommand {
                path,
                variant,
                output,
            }
            .execute(&config)
            .await?
        }
        Command::Check { path } => CheckCommand { path }.execute(&config).await?,
        Command::Convert { input, output, to } => {
            ConvertCommand { input, output, to }.execute().await?
        }
        Command::Batch {
            paths,
            variant,
            jobs,
        } => {
            BatchCommand {
                paths,
                variant,
                jobs,
            }
            .execute(&config)
            .await?
        }
        Command::Config { path } => {
            ConfigCommand { show_path: path }
                .execute(&config, cli.config.as_ref())
                .await?
        }
    };

    let strict = cli.strict || config.fail_on_warnings;
    if report.failures > 0 {
        Ok(ExitCode::from(1))
    } else if strict && report.warnings > 0 {
        eprintln!("error: {} warning(s) in strict mode", report.warnings);
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Main entry point
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", render_error(&err));
            ExitCode::from(1)
        }
    }
}
