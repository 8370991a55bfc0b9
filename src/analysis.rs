//! Analysis of a decompiled application.

use crate::{app::ApplicationHandle, pipeline::Pipeline, store::ResultStore};
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Runs the feature pipeline on decompiled applications and stores the results.
pub struct Analyzer {
    pipeline: Pipeline,
    store: Box<dyn ResultStore>,
}

impl Analyzer {
    /// Creates a new analyzer.
    pub fn new(pipeline: Pipeline, store: Box<dyn ResultStore>) -> Self {
        Self { pipeline, store }
    }

    /// Analyzes the decompiled application at the given path.
    ///
    /// Fails with `Kind::AppEmpty` if there is nothing to analyze. If `persist` is set, the
    /// resulting feature vector is written to the store; store errors are returned as is.
    pub fn analyze<P: AsRef<Path>>(&mut self, path: P, persist: bool) -> Result<ApplicationHandle> {
        let mut app = ApplicationHandle::open(path)?;
        info!("Starting feature scraper");
        info!("App name:\t{}", app.name());

        let features = self.pipeline.run(&app)?;
        info!("==== FINAL RESULTS ====");
        info!("{}", features);
        app.set_features(features);

        if persist {
            info!("Saving findings to the store…");
            self.store
                .write(&app)
                .with_context(|| format!("could not store the results of `{}`", app.name()))?;
        }

        Ok(app)
    }
}
