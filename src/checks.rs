//! Feature checks.
//!
//! Each check inspects the decompiled application and tells if it uses one feature. Checks only
//! read the application files, so running them twice on the same folder gives the same answer.

use crate::{app::ApplicationHandle, features::Feature};
use anyhow::{Context, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::{fmt, fs, path::Path};

lazy_static! {
    static ref INTERNET_PERMISSION: Regex =
        Regex::new(r#"android:name\s*=\s*"android\.permission\.INTERNET""#).unwrap();
    static ref ACCOUNT_MANAGER: Regex = Regex::new(
        r"android\.accounts\.AccountManager\b|Landroid/accounts/AccountManager;|AccountManager\.get\("
    )
    .unwrap();
    static ref SSL: Regex = Regex::new(
        r#"javax\.net\.ssl\.|Ljavax/net/ssl/|HttpsURLConnection|"https://"#
    )
    .unwrap();
    static ref SHARING: Regex = Regex::new(
        r"android\.intent\.action\.SEND(_MULTIPLE)?\b|Intent\.ACTION_SEND(_MULTIPLE)?\b|Intent\.createChooser\("
    )
    .unwrap();
    static ref LOCALIZED_STRINGS: Regex =
        Regex::new(r"[/\\]res[/\\]values-[a-z]{2,3}(-r[A-Z]{2})?[/\\]strings\.xml$").unwrap();
}

/// Capability of inspecting an application for one feature.
pub trait FeatureCheck {
    /// The feature this check detects.
    fn feature(&self) -> Feature;

    /// Runs the check on the application.
    fn execute(&self, app: &ApplicationHandle) -> Result<bool>;
}

/// Built-in checks, one per feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Looks for the internet permission in the manifest.
    InternetUse,
    /// Looks for uses of the account manager in the code.
    AccountManagerUse,
    /// Looks for SSL/TLS connections in the code.
    UseSsl,
    /// Looks for sharing intents in the code and the manifest.
    SharingCenterUse,
    /// Looks for localized string resources.
    Internationalization,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Check::InternetUse => "InternetUse",
            Check::AccountManagerUse => "AccountManagerUse",
            Check::UseSsl => "UseSSL",
            Check::SharingCenterUse => "SharingCenterUse",
            Check::Internationalization => "Internationalization",
        };
        f.write_str(name)
    }
}

impl FeatureCheck for Check {
    fn feature(&self) -> Feature {
        match self {
            Check::InternetUse => Feature::Internet,
            Check::AccountManagerUse => Feature::AccountManager,
            Check::UseSsl => Feature::UseSsl,
            Check::SharingCenterUse => Feature::Sharing,
            Check::Internationalization => Feature::Internationalization,
        }
    }

    fn execute(&self, app: &ApplicationHandle) -> Result<bool> {
        let found = match self {
            Check::InternetUse => manifest_matches(app, &INTERNET_PERMISSION)?,
            Check::AccountManagerUse => code_matches(app, &ACCOUNT_MANAGER)?,
            Check::UseSsl => code_matches(app, &SSL)?,
            Check::SharingCenterUse => {
                manifest_matches(app, &SHARING)? || code_matches(app, &SHARING)?
            }
            Check::Internationalization => app
                .sources()
                .any(|s| LOCALIZED_STRINGS.is_match(&s.to_string_lossy())),
        };
        debug!("{} on `{}`: {}", self, app.name(), found);

        Ok(found)
    }
}

fn manifest_matches(app: &ApplicationHandle, regex: &Regex) -> Result<bool> {
    Ok(app
        .read_manifest()?
        .map_or(false, |manifest| regex.is_match(&manifest)))
}

fn code_matches(app: &ApplicationHandle, regex: &Regex) -> Result<bool> {
    for source in app.sources().filter(|s| is_code(s)) {
        let bytes = fs::read(source).with_context(|| format!("could not read `{}`", source.display()))?;
        if regex.is_match(&String::from_utf8_lossy(&bytes)) {
            debug!("`{}` matches `{}`", source.display(), regex.as_str());
            return Ok(true);
        }
    }

    Ok(false)
}

fn is_code(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext == "java" || ext == "smali")
}
