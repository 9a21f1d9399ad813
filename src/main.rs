use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};
use walletconf::config::{keys, ConfigMap, FINAL_CONFIG_VERSION};
use walletconf::{ConfigError, ConfigStore, DirectoryLocator, FixedLocator, StandardLocator};

/// Inspect and edit a wallet client configuration directory
#[derive(Parser, Debug)]
#[command(name = "walletconf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data directory holding the `config` file
    ///
    /// Defaults to the platform user data directory.
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Use the testnet subdirectory
    #[arg(long)]
    testnet: bool,

    /// Command-line override, as key=value (value parsed as JSON when possible)
    #[arg(short = 'o', long = "override", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "warn")]
    log_level: Level,

    /// Log to file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective value of a key
    Get { key: String },
    /// Store a value in the user config
    Set { key: String, value: String },
    /// Remove a key from the user config
    Unset { key: String },
    /// Print the merged configuration
    List,
    /// Print the resolved data directory
    Path,
    /// Print the stored and current config versions
    Version,
}

/// Install the fmt subscriber. Store events go to stderr, or to
/// `log_file` when given, without timestamps.
fn setup_logging(level: Level, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let writer = match log_file {
        Some(path) => BoxMakeWriter::new(Arc::new(File::create(path)?)),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .with_target(false)
        .without_time()
        .init();

    Ok(())
}

/// Parse a value as JSON, falling back to a plain string
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn parse_override(text: &str) -> Result<(String, Value), ConfigError> {
    match text.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), parse_value(value))),
        _ => Err(ConfigError::InvalidOverride(text.to_string())),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.log_level, args.log_file.as_deref())?;

    let mut overrides = ConfigMap::new();
    for text in &args.overrides {
        let (key, value) = parse_override(text)?;
        overrides.insert(key, value);
    }
    if args.testnet {
        overrides.insert(keys::TESTNET.to_string(), Value::Bool(true));
    }

    let locator: Box<dyn DirectoryLocator> = match args.dir {
        Some(dir) => Box::new(FixedLocator::new(dir)),
        None => Box::new(StandardLocator),
    };

    let store = ConfigStore::open(overrides, locator.as_ref())?;
    debug!("Config store ready");

    match args.command {
        Command::Get { key } => match store.get(&key) {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => bail!("Config key '{}' is not set", key),
        },
        Command::Set { key, value } => {
            if !store.is_modifiable(&key) {
                bail!("Config key '{}' is set on the command line", key);
            }
            store.set(&key, parse_value(&value))?;
        }
        Command::Unset { key } => {
            if !store.is_modifiable(&key) {
                bail!("Config key '{}' is set on the command line", key);
            }
            store.remove(&key)?;
        }
        Command::List => {
            println!("{}", serde_json::to_string_pretty(&store.merged())?);
        }
        Command::Path => match store.data_dir() {
            Some(dir) => println!("{}", dir.display()),
            None => bail!("No data directory available"),
        },
        Command::Version => {
            println!("config_version: {}", store.config_version());
            println!("current: {}", FINAL_CONFIG_VERSION);
        }
    }

    Ok(())
}
