//! changelog-dsl CLI
//!
//! Parses a DSL changelog (and everything it includes) and prints the
//! resulting change sets.
//!
//! Exit codes:
//! - 0: The changelog parsed successfully
//! - 2: Tool error (config error, parse failure, I/O error, etc.)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use changelog_dsl::Config;
use changelog_dsl::input::ChangeLogParser;
use changelog_dsl::output::{JsonReporter, Reporter, TextReporter};

/// Default config file name used when --config is not explicitly provided.
const DEFAULT_CONFIG_FILE: &str = "changelog-dsl.toml";

#[derive(Parser, Debug)]
#[command(name = "changelog-dsl")]
#[command(about = "Parse declarative database changelogs into change sets", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override output format (text, json)
    #[arg(long)]
    format: Option<String>,

    /// Comma-separated runtime contexts for property selection
    #[arg(long)]
    contexts: Option<String>,

    /// Comma-separated runtime labels for property selection
    #[arg(long)]
    labels: Option<String>,

    /// Target database short name (e.g. postgresql)
    #[arg(long, env = "CHANGELOG_DSL_DATABASE")]
    database: Option<String>,

    /// Log debug diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Changelog to parse, relative to the configured search path
    changelog: String,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("Error: {:#}", err);
        std::process::exit(2);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new(default_level)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    // Load configuration.
    // If --config is explicitly provided and the file doesn't exist, that's a tool error.
    // If using the default path and it doesn't exist, warn and use defaults.
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid command-line options")?;

    let filters = config
        .filter_registry()
        .context("Failed to build resource filters")?;
    let parser = ChangeLogParser::from_dir(config.parser.search_path.clone())
        .with_options(config.parser_options())
        .with_filters(filters);

    let document = parser
        .parse(&args.changelog)
        .with_context(|| format!("Failed to parse changelog {}", args.changelog))?;

    let use_stdout = config.output.dir.is_none();
    let output_dir = config.output.dir.clone().unwrap_or_default();
    let reporter: Box<dyn Reporter> = match config.output.format.as_str() {
        "json" => Box::new(JsonReporter::new(use_stdout)),
        _ => Box::new(TextReporter::new(use_stdout)),
    };
    reporter
        .emit(&document, &output_dir)
        .context(format!("Failed to write {} report", config.output.format))?;

    eprintln!(
        "changelog-dsl: {} change set(s) from {}",
        document.change_sets.len(),
        document.physical_file_path
    );
    Ok(())
}

/// Command-line values take precedence over the config file.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(format) = &args.format {
        config.output.format = format.clone();
    }
    if let Some(contexts) = &args.contexts {
        config.parser.contexts = split_list(contexts);
    }
    if let Some(labels) = &args.labels {
        config.parser.labels = split_list(labels);
    }
    if let Some(database) = &args.database {
        config.parser.database = Some(database.clone());
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load configuration from file.
///
/// If `config_path` is `Some`, the user explicitly passed `--config` and the file
/// must exist (error if not found). If `None`, the default config path is used;
/// a missing default config file is not an error (falls back to defaults with a warning).
fn load_config(config_path: &Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::from_file(path).context("Failed to load configuration")
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                Config::from_file(&default_path).context("Failed to load configuration")
            } else {
                tracing::warn!(
                    path = %default_path.display(),
                    "config file not found, using defaults"
                );
                Ok(Config::default())
            }
        }
    }
}
