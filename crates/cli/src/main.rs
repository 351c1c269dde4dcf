mod commands;
mod dataset;

use std::path::{Path, PathBuf};
use std::process;

use annals_core::LoadConfig;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Validate simulation data directories and resolve dated history.
#[derive(Parser)]
#[command(
    name = "annals",
    version,
    about = "Validate simulation data and resolve dated history"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log loading progress at debug level
    #[arg(long, global = true)]
    verbose: bool,

    /// TOML file with the timeline bounds (start_date, end_date)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a data directory and report every defect
    Check {
        /// Directory holding catalog.txt and history/
        dir: PathBuf,
    },

    /// Print the effective history state at a date
    Resolve {
        /// Directory holding catalog.txt and history/
        dir: PathBuf,
        /// Date to resolve at, e.g. 1850.1.1
        #[arg(long)]
        date: String,
        /// Province identifier to resolve
        #[arg(long, conflicts_with = "country")]
        province: Option<String>,
        /// Country tag to resolve
        #[arg(long)]
        country: Option<String>,
    },

    /// Validate a date literal and print its canonical form
    Date {
        /// Date text, e.g. 1836.1.1
        text: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Check { dir } => {
            let config = load_config(cli.config.as_deref(), cli.output, cli.quiet);
            commands::check::cmd_check(&dir, &config, cli.output, cli.quiet);
        }
        Commands::Resolve {
            dir,
            date,
            province,
            country,
        } => {
            let config = load_config(cli.config.as_deref(), cli.output, cli.quiet);
            let selection = match (province, country) {
                (Some(id), _) => commands::resolve::Selection::Province(id),
                (None, Some(tag)) => commands::resolve::Selection::Country(tag),
                (None, None) => commands::resolve::Selection::All,
            };
            commands::resolve::cmd_resolve(
                &dir,
                &date,
                &selection,
                &config,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Date { text } => {
            commands::date::cmd_date(&text, cli.output, cli.quiet);
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over the flags.
fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "annals=debug"
    } else if quiet {
        "annals=error"
    } else {
        "annals=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Read the optional TOML config; exits on any defect.
fn load_config(path: Option<&Path>, output: OutputFormat, quiet: bool) -> LoadConfig {
    let Some(path) = path else {
        return LoadConfig::default();
    };
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading config '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let config: LoadConfig = match toml::from_str(&text) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!("error parsing config '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    if let Err(d) = config.validate() {
        let msg = format!("invalid config '{}': {}", path.display(), d);
        report_error(&msg, output, quiet);
        process::exit(1);
    }
    tracing::debug!(
        start = %config.start_date,
        end = %config.end_date,
        "loaded config"
    );
    config
}

/// Report an error message in the appropriate format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            let json = serde_json::json!({ "error": msg });
            eprintln!("{}", json);
        }
    }
}
