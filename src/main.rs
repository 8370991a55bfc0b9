//! Feature scraper command line interface.

#![forbid(anonymous_parameters, unsafe_code)]
#![warn(clippy::pedantic, missing_docs, unused_results)]

use anyhow::{Context, Error, Result};
use colored::Colorize;
use feature_scraper_core::{
    cli, initialize_config, initialize_logger, pipeline::Pipeline, store::JsonStore, Analyzer,
    BatchCoordinator, Config, JobState,
};
use log::{error, info};
use std::process;

fn main() {
    let matches = cli::generate_cli().get_matches();

    if let Err(e) = run(&matches) {
        print_error(&e);
        process::exit(1);
    }
}

fn run(matches: &clap::ArgMatches<'_>) -> Result<()> {
    let config = initialize_config(matches)?;
    initialize_logger(&config)?;

    let res = execute(matches, &config);
    // `main` only prints the final error to the terminal.
    if let (Err(e), Some(_)) = (&res, config.log_file()) {
        error!("{:#}", e);
    }
    res
}

fn execute(matches: &clap::ArgMatches<'_>, config: &Config) -> Result<()> {
    let store = JsonStore::new(config.store());
    let mut analyzer = Analyzer::new(Pipeline::new(), Box::new(store));

    match matches.subcommand() {
        ("batch", Some(batch)) => {
            let skip = batch
                .value_of("skip")
                .map(str::parse::<usize>)
                .transpose()
                .context("invalid skip count")?
                .unwrap_or(0);
            // Required arguments, checked by clap.
            let archives = batch.value_of("archives").unwrap_or_default();
            let worklist = batch.value_of("worklist").unwrap_or_default();
            let decompiler = batch.value_of("decompiler").unwrap_or_default();

            let records =
                BatchCoordinator::new(config, analyzer).run(archives, worklist, decompiler, skip)?;

            let count = |state: JobState| records.iter().filter(|r| r.state == state).count();
            info!(
                "Batch finished: {} analyzed, {} skipped, {} empty, {} timed out, {} failed",
                count(JobState::Succeeded),
                count(JobState::Skipped),
                count(JobState::FailedEmpty),
                count(JobState::FailedTimeout),
                count(JobState::Failed)
            );
        }
        ("analyze", Some(analyze)) => {
            let path = analyze.value_of("path").unwrap_or_default();
            let _ = analyzer.analyze(path, analyze.is_present("persist"))?;
        }
        _ => {}
    }

    Ok(())
}

/// Prints the error and its causes to the standard error output.
fn print_error(e: &Error) {
    eprintln!("{} {}", "Error:".bold().red(), e.to_string().red());
    for cause in e.chain().skip(1) {
        eprintln!("\t{} {}", "Caused by:".bold(), cause);
    }
}
