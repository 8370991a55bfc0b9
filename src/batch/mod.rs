//! Batch analysis of a worklist of applications.
//!
//! Every application in the worklist is decompiled and analyzed in order, one after the other.
//! A prefix of the worklist can be skipped to resume a batch that was interrupted.


use crate::{
    analysis::Analyzer,
    app::absolute,
    artifact::ArtifactGuard,
    config::{Config, FailurePolicy},
    decompilation::Decompiler,
    error::{FailureClass, Kind},
    store::Ledger,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// State of one job of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    /// Not started yet.
    Pending,
    /// Skipped because it was part of the skipped prefix.
    Skipped,
    /// The decompiler is running.
    Decompiling,
    /// The feature checks are running.
    Analyzing,
    /// Analyzed and stored.
    Succeeded,
    /// The decompiled application had nothing to analyze.
    FailedEmpty,
    /// The decompiler was killed after the timeout.
    FailedTimeout,
    /// Failed for any other reason.
    Failed,
}

impl JobState {
    /// Returns true if the job can not change its state anymore.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            JobState::Pending | JobState::Decompiling | JobState::Analyzing
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Final record of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    /// Position of the job in the worklist, starting at 1.
    pub index: usize,
    /// Package file name, as read from the worklist.
    pub archive: String,
    /// Terminal state of the job.
    pub state: JobState,
}

#[derive(Serialize)]
struct LedgerEntry<'r> {
    #[serde(flatten)]
    record: &'r JobRecord,
    timestamp: DateTime<Local>,
}

/// One application of the worklist.
#[derive(Debug)]
struct AppJob {
    index: usize,
    archive: String,
    state: JobState,
}

impl AppJob {
    fn new(index: usize, archive: String) -> Self {
        Self {
            index,
            archive,
            state: JobState::Pending,
        }
    }

    fn transition(&mut self, state: JobState) {
        debug!(
            "job #{} `{}`: {} -> {}",
            self.index, self.archive, self.state, state
        );
        self.state = state;
    }

    fn into_record(self) -> JobRecord {
        debug_assert!(self.state.is_terminal());
        JobRecord {
            index: self.index,
            archive: self.archive,
            state: self.state,
        }
    }
}

/// Decompiles and analyzes the applications of a worklist.
pub struct BatchCoordinator {
    analyzer: Analyzer,
    timeout: Duration,
    on_failure: FailurePolicy,
    keep_blank_lines: bool,
    ledger: Option<Ledger>,
}

impl BatchCoordinator {
    /// Creates a new coordinator with the given configuration.
    pub fn new(config: &Config, analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            timeout: Duration::from_secs(config.decompile_timeout()),
            on_failure: config.on_failure(),
            keep_blank_lines: config.keeps_blank_lines(),
            ledger: config.ledger().map(Ledger::new),
        }
    }

    /// Runs the batch.
    ///
    /// The first `skip` applications of the worklist are skipped. Empty applications and
    /// decompilation timeouts are logged and the batch goes on. Any other failure either stops
    /// the batch or is logged, depending on the configured failure policy. In every case, the
    /// decompiled output of the job is removed before moving to the next one.
    ///
    /// Returns the record of every job, in worklist order.
    pub fn run<A, W, D>(
        &mut self,
        archives_root: A,
        worklist: W,
        decompiler: D,
        skip: usize,
    ) -> Result<Vec<JobRecord>>
    where
        A: AsRef<Path>,
        W: AsRef<Path>,
        D: AsRef<Path>,
    {
        let archives_root = absolute(archives_root)?;
        let worklist = absolute(worklist)?;
        let decompiler = Decompiler::new(absolute(decompiler)?, self.timeout);

        info!("* BATCH RUN CONFIG *");
        info!("APPS:     {}", archives_root.display());
        info!("DECOMPLR: {}", decompiler.program().display());
        info!("APPNAMES: {}", worklist.display());
        info!("TIMEOUT:  {}", self.timeout.as_secs());
        info!("********************");

        let entries = read_worklist(&worklist, self.keep_blank_lines)?;
        let mut records = Vec::with_capacity(entries.len());
        let mut to_skip = skip;

        for (i, archive) in entries.into_iter().enumerate() {
            let mut job = AppJob::new(i + 1, archive);
            info!("*************** Starting #{} ***************", job.index);

            if to_skip > 0 {
                warn!("Skipping the app, {} skips to go", to_skip);
                to_skip -= 1;
                job.transition(JobState::Skipped);
                self.record(job.into_record(), &mut records);
                continue;
            }

            info!("Assessing: \t{}", job.archive);
            let package = archives_root.join(&job.archive);
            let artifact = ArtifactGuard::new(decompiler.output_path(&package));
            artifact.clear_leftover();

            let res = self.process(&mut job, &decompiler, &package, artifact.path());
            let state = match res {
                Ok(()) => JobState::Succeeded,
                Err(e) => match FailureClass::of(&e) {
                    FailureClass::Empty => {
                        error!("It seems the app is empty, skipping.");
                        JobState::FailedEmpty
                    }
                    FailureClass::Timeout => {
                        error!(
                            "De-compilation process has taken over {} seconds. Skipping",
                            self.timeout.as_secs()
                        );
                        error!("{:#}", e);
                        JobState::FailedTimeout
                    }
                    FailureClass::Unclassified => match self.on_failure {
                        FailurePolicy::Continue => {
                            error!("The analysis of {} failed, skipping: {:#}", job.archive, e);
                            JobState::Failed
                        }
                        FailurePolicy::Abort => {
                            job.transition(JobState::Failed);
                            drop(artifact);
                            self.record(job.into_record(), &mut records);
                            return Err(e.context("the batch was aborted"));
                        }
                    },
                },
            };
            job.transition(state);
            drop(artifact);
            info!("*************** DONE ***************");

            self.record(job.into_record(), &mut records);
        }

        Ok(records)
    }

    /// Decompiles and analyzes one application.
    fn process(
        &mut self,
        job: &mut AppJob,
        decompiler: &Decompiler,
        package: &Path,
        artifact: &Path,
    ) -> Result<()> {
        job.transition(JobState::Decompiling);
        info!("\tDecompiling…");
        decompiler
            .decompile(package)
            .with_context(|| format!("could not decompile `{}`", package.display()))?;

        job.transition(JobState::Analyzing);
        info!("Uncompressed Path: {}", artifact.display());
        let _ = self.analyzer.analyze(artifact, true)?;

        Ok(())
    }

    fn record(&self, record: JobRecord, records: &mut Vec<JobRecord>) {
        if let Some(ledger) = &self.ledger {
            let entry = LedgerEntry {
                record: &record,
                timestamp: Local::now(),
            };
            if let Err(e) = ledger.append(&entry) {
                warn!("could not write job #{} to the ledger: {:#}", record.index, e);
            }
        }
        records.push(record);
    }
}

/// Reads the package file names of the worklist, in order.
///
/// Trailing whitespace is removed from every name. Blank lines are dropped unless
/// `keep_blank_lines` is set.
pub fn read_worklist<P: AsRef<Path>>(path: P, keep_blank_lines: bool) -> Result<Vec<String>> {
    let content = fs::read_to_string(path.as_ref()).with_context(|| Kind::Worklist {
        path: PathBuf::from(path.as_ref()),
    })?;

    Ok(content
        .lines()
        .map(str::trim_end)
        .filter(|name| keep_blank_lines || !name.is_empty())
        .map(str::to_owned)
        .collect())
}
