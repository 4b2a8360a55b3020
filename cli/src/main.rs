//! clipwise CLI - Roman numeral conversions and CPU diagnostics.
//!
//! ```text
//! clipwise encode 1994        ->  1994 = MCMXCIV
//! clipwise decode MCMXCIV     ->  1994 = MCMXCIV
//! clipwise cpu --samples 3    ->  one line per sample, noting probe reuse
//! ```
//!
//! Logs go to `~/.clipwise/logs/clipwise.log` so stdout stays clean for the
//! conversion output.

use std::fs::{self, File, OpenOptions};
use std::io::{self, stderr};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use clipwise_config::{ClipwiseConfig, ConfigError, log_file_candidates};
use clipwise_core::{Diagnostics, RomanConversion};

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser)]
#[command(name = "clipwise")]
#[command(about = "Convert Roman numerals and sample CPU usage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a number (0-3999) to a Roman numeral; 0 encodes to an empty
    /// numeral
    Encode {
        /// Number to convert
        number: u32,
    },
    /// Convert a Roman numeral to a number
    Decode {
        /// Numeral to convert (letters IVXLCDM, upper case)
        numeral: String,
    },
    /// Sample CPU usage through the idle-expiring probe
    Cpu {
        /// Number of samples to take
        #[arg(long, default_value_t = 3)]
        samples: u32,
        /// Delay between samples in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = match ClipwiseConfig::load() {
        Ok(config) => (config.unwrap_or_default(), None),
        Err(err) => (ClipwiseConfig::default(), Some(err)),
    };
    init_tracing(config.log_filter());
    if let Some(err) = config_error {
        report_config_error(&err);
    }

    match cli.command {
        Commands::Encode { number } => encode(number),
        Commands::Decode { numeral } => decode(&numeral),
        Commands::Cpu {
            samples,
            interval_ms,
        } => sample_cpu(&config, samples, Duration::from_millis(interval_ms)).await,
    }
}

fn report_config_error(err: &ConfigError) {
    tracing::warn!(path = %err.path().display(), "Using default config: {err}");
    eprintln!("warning: {err}; using defaults");
}

fn encode(number: u32) -> Result<()> {
    let conversion =
        RomanConversion::from_number(number).with_context(|| format!("cannot encode {number}"))?;
    tracing::debug!(%conversion, "Encoded");
    println!("{conversion}");
    if conversion.numeral.is_empty() {
        eprintln!("note: {number} has no Roman numeral; it encodes to an empty string");
    }
    Ok(())
}

fn decode(numeral: &str) -> Result<()> {
    let conversion = RomanConversion::from_numeral(numeral)
        .with_context(|| format!("cannot decode {numeral:?}"))?;
    tracing::debug!(%conversion, "Decoded");
    println!("{conversion}");
    if !conversion.is_canonical() {
        eprintln!(
            "note: {} is not a canonical numeral; {} is written {}",
            conversion.numeral,
            conversion.number,
            conversion.canonical()
        );
    }
    Ok(())
}

async fn sample_cpu(config: &ClipwiseConfig, samples: u32, interval: Duration) -> Result<()> {
    let diagnostics = Diagnostics::start(&config.diagnostics());

    for i in 0..samples {
        if i > 0 {
            tokio::time::sleep(interval).await;
        }
        let reused = diagnostics.is_probe_live();
        // Sampling blocks for sysinfo's minimum refresh interval.
        let sample = tokio::task::block_in_place(|| diagnostics.cpu_sample())
            .context("failed to open CPU probe")?;
        let probe = if reused { "reused" } else { "opened" };
        println!("{sample} (probe {probe})");
    }

    Ok(())
}

fn init_tracing(configured_filter: Option<&str>) {
    let default_filter = configured_filter.unwrap_or(DEFAULT_LOG_FILTER);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let mut skipped = Vec::new();
    let log_file = log_file_candidates()
        .into_iter()
        .find_map(|path| match open_append(&path) {
            Ok(file) => Some((path, file)),
            Err(err) => {
                skipped.push(format!("Cannot log to {}: {err}", path.display()));
                None
            }
        });

    // Without a writable log file, stderr keeps stdout free for results.
    let (log_path, layer) = match log_file {
        Some((path, file)) => (
            Some(path),
            fmt::layer()
                .with_ansi(false)
                .with_writer(BoxMakeWriter::new(Mutex::new(file))),
        ),
        None => (None, fmt::layer().with_writer(BoxMakeWriter::new(stderr))),
    };
    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .init();

    if let Some(path) = log_path {
        tracing::info!(path = %path.display(), "Logging initialized");
    }
    for warning in skipped {
        tracing::warn!("{warning}");
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
