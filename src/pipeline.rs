//! Conditional feature pipeline.
//!
//! The pipeline is a fixed list of stages. Each stage pairs a check with a guard; a stage whose
//! guard does not hold is not executed and its feature keeps the default `false`.

use crate::{
    app::ApplicationHandle,
    checks::{Check, FeatureCheck},
    features::{Feature, FeatureVector},
};
use anyhow::{Context, Result};
use log::debug;

/// Condition for a stage to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// The stage always runs.
    Always,
    /// The stage only runs if the given feature was already detected.
    When(Feature),
}

impl Guard {
    /// Evaluates the guard against the features found so far.
    pub fn holds(self, found: &FeatureVector) -> bool {
        match self {
            Guard::Always => true,
            Guard::When(feature) => found.get(feature),
        }
    }
}

/// One check of the pipeline, with the guard that enables it.
pub struct Stage {
    check: Box<dyn FeatureCheck>,
    guard: Guard,
}

impl Stage {
    /// Creates a new stage.
    pub fn new(check: Box<dyn FeatureCheck>, guard: Guard) -> Self {
        Self { check, guard }
    }

    /// Gets the feature the stage computes.
    pub fn feature(&self) -> Feature {
        self.check.feature()
    }

    /// Gets the guard of the stage.
    pub fn guard(&self) -> Guard {
        self.guard
    }
}

/// Ordered, guarded list of feature checks.
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Creates the pipeline with the built-in checks.
    pub fn new() -> Self {
        Self::with_checks(
            Box::new(Check::InternetUse),
            Box::new(Check::AccountManagerUse),
            Box::new(Check::UseSsl),
            Box::new(Check::SharingCenterUse),
            Box::new(Check::Internationalization),
        )
    }

    /// Creates the pipeline with the given checks, keeping the fixed order and gating.
    ///
    /// The account manager and SSL checks only run if the application uses the internet. The
    /// sharing and internationalization checks always run.
    pub fn with_checks(
        internet: Box<dyn FeatureCheck>,
        account_manager: Box<dyn FeatureCheck>,
        ssl: Box<dyn FeatureCheck>,
        sharing: Box<dyn FeatureCheck>,
        internationalization: Box<dyn FeatureCheck>,
    ) -> Self {
        Self {
            stages: vec![
                Stage::new(internet, Guard::Always),
                Stage::new(account_manager, Guard::When(Feature::Internet)),
                Stage::new(ssl, Guard::When(Feature::Internet)),
                Stage::new(sharing, Guard::Always),
                Stage::new(internationalization, Guard::Always),
            ],
        }
    }

    /// Gets the stages of the pipeline, in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs every enabled stage on the application and returns the resulting vector.
    pub fn run(&self, app: &ApplicationHandle) -> Result<FeatureVector> {
        let mut features = FeatureVector::default();

        for stage in &self.stages {
            let feature = stage.feature();
            if !stage.guard.holds(&features) {
                debug!("skipping the {} check, its guard does not hold", feature);
                continue;
            }

            let found = stage
                .check
                .execute(app)
                .with_context(|| format!("the {} check failed on `{}`", feature, app.name()))?;
            features.set(feature, found);
        }

        Ok(features)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
