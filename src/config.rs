//! Configuration module.
//!
//! Handles and configures the initial settings and variables needed to run the program. The
//! configuration is read from a TOML file and can then be decorated with command line options,
//! which always take precedence.

use crate::error::Kind;
use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default wall-clock bound for one decompiler run, in seconds (a bit over an hour).
pub const DEFAULT_DECOMPILE_TIMEOUT: u64 = 3700;

/// What the batch does when a job fails with an unclassified error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Clean up the failing job and stop the whole batch.
    Abort,
    /// Log the failure, clean up and move on to the next job.
    Continue,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Abort
    }
}

impl FromStr for FailurePolicy {
    type Err = Kind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "continue" => Ok(FailurePolicy::Continue),
            _ => Err(Kind::Config {
                message: format!("unknown failure policy `{}`", s),
            }),
        }
    }
}

/// Settings of the results store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    results_folder: PathBuf,
}

impl StoreConfig {
    /// Creates a store configuration writing into the given folder.
    pub fn new<P: Into<PathBuf>>(results_folder: P) -> Self {
        Self {
            results_folder: results_folder.into(),
        }
    }

    /// Returns the folder where the results are stored.
    pub fn results_folder(&self) -> &Path {
        &self.results_folder
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("results")
    }
}

/// Config structure.
///
/// Contains configuration related fields. It is used for storing the configuration parameters and
/// checking their values. Implements the `Default` trait.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    verbose: bool,
    quiet: bool,
    decompile_timeout: u64,
    on_failure: FailurePolicy,
    keep_blank_lines: bool,
    log_file: Option<PathBuf>,
    ledger: Option<PathBuf>,
    store: StoreConfig,
    #[serde(skip)]
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Loads the configuration from the given TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml = fs::read_to_string(path.as_ref())
            .with_context(|| format!("could not read `{}`", path.as_ref().display()))?;
        let mut config: Self = toml::from_str(&toml)
            .with_context(|| format!("could not parse `{}`", path.as_ref().display()))?;
        config.check()?;
        config.loaded_from = Some(path.as_ref().to_path_buf());

        Ok(config)
    }

    /// Modifies the options from the command line arguments.
    pub fn decorate_with_cli(&mut self, cli: &ArgMatches<'_>) -> Result<()> {
        self.verbose = self.verbose || cli.is_present("verbose");
        self.quiet = self.quiet || cli.is_present("quiet");
        if self.verbose {
            self.quiet = false;
        }

        if let Some(log_file) = cli.value_of("log-file") {
            self.log_file = Some(PathBuf::from(log_file));
        }
        if let Some(results) = cli.value_of("results") {
            self.store = StoreConfig::new(results);
        }

        if let Some(batch) = cli.subcommand_matches("batch") {
            if let Some(policy) = batch.value_of("on-failure") {
                self.on_failure = policy.parse()?;
            }
            if batch.is_present("keep-blank-lines") {
                self.keep_blank_lines = true;
            }
            if let Some(timeout) = batch.value_of("timeout") {
                self.decompile_timeout = timeout
                    .parse()
                    .with_context(|| format!("invalid timeout `{}`", timeout))?;
            }
            if let Some(ledger) = batch.value_of("ledger") {
                self.ledger = Some(PathBuf::from(ledger));
            }
        }

        self.check()
    }

    /// Checks that the configuration values make sense together.
    pub fn check(&self) -> Result<()> {
        if self.decompile_timeout == 0 {
            return Err(Kind::Config {
                message: "the decompilation timeout must be at least one second".to_owned(),
            }
            .into());
        }
        if self.verbose && self.quiet {
            return Err(Kind::Config {
                message: "`verbose` and `quiet` can not be enabled at the same time".to_owned(),
            }
            .into());
        }

        Ok(())
    }

    /// Returns the file the configuration was loaded from, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    /// Returns true if the application is running in `--verbose` mode, false otherwise.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Returns true if the application is running in `--quiet` mode, false otherwise.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Returns the wall-clock bound for each decompiler run, in seconds.
    pub fn decompile_timeout(&self) -> u64 {
        self.decompile_timeout
    }

    /// Sets the wall-clock bound for each decompiler run, in seconds.
    pub fn set_decompile_timeout(&mut self, seconds: u64) {
        self.decompile_timeout = seconds;
    }

    /// Returns the policy applied to unclassified job failures.
    pub fn on_failure(&self) -> FailurePolicy {
        self.on_failure
    }

    /// Sets the policy applied to unclassified job failures.
    pub fn set_on_failure(&mut self, policy: FailurePolicy) {
        self.on_failure = policy;
    }

    /// Returns true if blank worklist lines become jobs.
    pub fn keeps_blank_lines(&self) -> bool {
        self.keep_blank_lines
    }

    /// Sets whether blank worklist lines become jobs.
    pub fn set_keep_blank_lines(&mut self, keep: bool) {
        self.keep_blank_lines = keep;
    }

    /// Returns the file the logs are appended to, if any.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Returns the job ledger file, if any.
    pub fn ledger(&self) -> Option<&Path> {
        self.ledger.as_deref()
    }

    /// Sets the job ledger file.
    pub fn set_ledger(&mut self, ledger: Option<PathBuf>) {
        self.ledger = ledger;
    }

    /// Returns the results store configuration.
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// Sets the results store configuration.
    pub fn set_store(&mut self, store: StoreConfig) {
        self.store = store;
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: false,
            quiet: false,
            decompile_timeout: DEFAULT_DECOMPILE_TIMEOUT,
            on_failure: FailurePolicy::default(),
            keep_blank_lines: false,
            log_file: None,
            ledger: None,
            store: StoreConfig::default(),
            loaded_from: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, FailurePolicy, DEFAULT_DECOMPILE_TIMEOUT};
    use crate::cli;
    use std::{fs, path::Path, str::FromStr};

    #[test]
    fn it_config() {
        let config = Config::default();

        assert!(!config.is_verbose());
        assert!(!config.is_quiet());
        assert_eq!(config.decompile_timeout(), DEFAULT_DECOMPILE_TIMEOUT);
        assert_eq!(config.on_failure(), FailurePolicy::Abort);
        assert!(!config.keeps_blank_lines());
        assert!(config.log_file().is_none());
        assert!(config.ledger().is_none());
        assert_eq!(config.store().results_folder(), Path::new("results"));
        assert!(config.loaded_from().is_none());
        assert!(config.check().is_ok());
    }

    #[test]
    fn it_config_sample() {
        let config = Config::from_file("config.toml.sample").unwrap();
        assert_eq!(config.loaded_from(), Some(Path::new("config.toml.sample")));

        assert!(!config.is_verbose());
        assert!(!config.is_quiet());
        assert_eq!(config.decompile_timeout(), 3700);
        assert_eq!(config.on_failure(), FailurePolicy::Abort);
        assert!(!config.keeps_blank_lines());
        assert_eq!(config.log_file(), Some(Path::new("out.batch.log")));
        assert_eq!(config.ledger(), None);
        assert_eq!(config.store().results_folder(), Path::new("results"));
    }

    #[test]
    fn it_config_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "decompile_timeout = 60\non_failure = \"continue\"\n\n[store]\nresults_folder = \"out\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.decompile_timeout(), 60);
        assert_eq!(config.on_failure(), FailurePolicy::Continue);
        assert_eq!(config.store().results_folder(), Path::new("out"));
        assert!(!config.keeps_blank_lines());
    }

    #[test]
    fn it_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "decompile_timeout = 0\n").unwrap();
        assert!(Config::from_file(&path).is_err());

        fs::write(&path, "verbose = true\nquiet = true\n").unwrap();
        assert!(Config::from_file(&path).is_err());

        fs::write(&path, "on_failure = \"retry\"\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn it_decorates_with_cli() {
        let matches = cli::generate_cli().get_matches_from(vec![
            "feature-scraper",
            "-v",
            "--results",
            "scraped",
            "batch",
            "--on-failure",
            "continue",
            "--keep-blank-lines",
            "--timeout",
            "10",
            "--ledger",
            "run.jsonl",
            "apps",
            "apps.txt",
            "decompiler.sh",
        ]);

        let mut config = Config::default();
        config.decorate_with_cli(&matches).unwrap();

        assert!(config.is_verbose());
        assert_eq!(config.decompile_timeout(), 10);
        assert_eq!(config.on_failure(), FailurePolicy::Continue);
        assert!(config.keeps_blank_lines());
        assert_eq!(config.ledger(), Some(Path::new("run.jsonl")));
        assert_eq!(config.store().results_folder(), Path::new("scraped"));
    }

    #[test]
    fn it_failure_policy() {
        assert_eq!(
            FailurePolicy::from_str("abort").unwrap(),
            FailurePolicy::Abort
        );
        assert_eq!(
            FailurePolicy::from_str("Continue").unwrap(),
            FailurePolicy::Continue
        );
        assert!(FailurePolicy::from_str("retry").is_err());
    }
}
