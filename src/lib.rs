//! Feature scraper for Android applications.
//!
//! Decompiles a batch of application packages with an external decompiler and records, for each
//! of them, which platform features it uses.

#![forbid(anonymous_parameters, unsafe_code)]
#![warn(
    clippy::pedantic,
    missing_docs,
    unused_results,
    unused_qualifications,
    unused_import_braces,
    trivial_numeric_casts,
    trivial_casts,
    unused_extern_crates,
    variant_size_differences
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod analysis;
pub mod app;
pub mod artifact;
pub mod batch;
pub mod checks;
pub mod cli;
pub mod config;
pub mod decompilation;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod store;

pub use crate::{
    analysis::Analyzer,
    batch::{BatchCoordinator, JobRecord, JobState},
    config::Config,
    error::Kind,
};

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use env_logger::{Builder, Target};
use log::{warn, Level, LevelFilter};
use std::{env, fs::OpenOptions, io::Write, path::PathBuf};

/// Initialize the config with the config files and command line options.
///
/// A file given with `--config` always wins. Otherwise, on UNIX, if the local file
/// (`config.toml`) does not exist but the global one does
/// (`/etc/feature-scraper/config.toml`), the latter is used. Otherwise, the local file is used.
/// Finally, if none of the files could be loaded, the default config is used.
pub fn initialize_config(cli: &ArgMatches<'_>) -> Result<Config> {
    let config_path = PathBuf::from("config.toml");
    let global_config_path = PathBuf::from("/etc/feature-scraper/config.toml");

    let mut config = if let Some(path) = cli.value_of("config") {
        Config::from_file(path)
            .with_context(|| format!("there was an error when reading the {} file", path))?
    } else if cfg!(target_family = "unix") && !config_path.exists() && global_config_path.exists()
    {
        Config::from_file(&global_config_path).context(
            "there was an error when reading the /etc/feature-scraper/config.toml file",
        )?
    } else if config_path.exists() {
        Config::from_file(&config_path)
            .context("there was an error when reading the config.toml file")?
    } else {
        Config::default()
    };

    config
        .decorate_with_cli(cli)
        .context("there was an error reading config from CLI")?;

    Ok(config)
}

/// Initializes the logger.
///
/// `RUST_LOG` takes precedence over the verbosity settings. When a log file is configured, the
/// records are appended to it with a timestamp and without colors.
pub fn initialize_logger(config: &Config) -> Result<()> {
    let log_level = if config.is_verbose() {
        LevelFilter::Debug
    } else if config.is_quiet() {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    if let Ok(env_log) = env::var("RUST_LOG") {
        let _ = builder.parse_filters(&env_log);
    } else {
        let _ = builder.filter(Some("feature_scraper_core"), log_level);
        let _ = builder.filter(Some("feature_scraper"), log_level);
    }

    if let Some(path) = config.log_file() {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("could not open the log file {}", path.display()))?;
        let _ = builder
            .target(Target::Pipe(Box::new(file)))
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} - {} - {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                    record.level(),
                    record.args()
                )
            });
    } else {
        let _ = builder.format(|buf, record| match record.level() {
            Level::Warn => writeln!(
                buf,
                "{}{}",
                "Warning: ".bold().yellow(),
                record.args().to_string().yellow()
            ),
            Level::Error => writeln!(
                buf,
                "{}{}",
                "Error: ".bold().red(),
                record.args().to_string().red()
            ),
            Level::Debug => writeln!(
                buf,
                "{}{}",
                "Debug: ".bold(),
                record.args().to_string().bold()
            ),
            Level::Info => writeln!(buf, "{}", record.args()),
            Level::Trace => writeln!(buf, "{}: {}", record.level(), record.args()),
        });
    }

    builder.try_init().context("could not initialize the logger")?;

    if config.loaded_from().is_none() {
        warn!("Config file not found. Using default configuration");
    }

    Ok(())
}
