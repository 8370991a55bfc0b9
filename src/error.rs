//! Module containing the definition of error types.

use std::path::PathBuf;
use thiserror::Error;

/// Enumeration of the distinguished error kinds.
///
/// Everything else travels as a plain `anyhow::Error` and is treated as an unclassified failure
/// by the batch loop.
#[derive(Debug, Error)]
pub enum Kind {
    /// The decompiled application has no analyzable content.
    #[error("the application at `{}` is empty", path.display())]
    AppEmpty {
        /// Path of the decompiled application.
        path: PathBuf,
    },
    /// The decompiler did not finish within the configured bound and was killed.
    #[error("decompilation took more than {seconds} seconds")]
    DecompileTimeout {
        /// Configured timeout, in seconds.
        seconds: u64,
    },
    /// Configuration error.
    #[error("there was an error in the configuration: {message}")]
    Config {
        /// Error message.
        message: String,
    },
    /// The worklist could not be read.
    #[error("could not read the worklist `{}`", path.display())]
    Worklist {
        /// Path of the worklist file.
        path: PathBuf,
    },
}

/// Failure classes as seen by the batch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The application had nothing to analyze.
    Empty,
    /// The decompiler was killed after the timeout.
    Timeout,
    /// Any other failure.
    Unclassified,
}

impl FailureClass {
    /// Classifies an error coming out of a single job.
    pub fn of(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<Kind>() {
            Some(Kind::AppEmpty { .. }) => FailureClass::Empty,
            Some(Kind::DecompileTimeout { .. }) => FailureClass::Timeout,
            Some(Kind::Config { .. }) | Some(Kind::Worklist { .. }) | None => {
                FailureClass::Unclassified
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FailureClass, Kind};
    use anyhow::{anyhow, Context};

    #[test]
    fn it_classifies_expected_failures() {
        let empty: anyhow::Error = Kind::AppEmpty {
            path: "foo.apk.uncompressed".into(),
        }
        .into();
        assert_eq!(FailureClass::of(&empty), FailureClass::Empty);

        let timeout: anyhow::Error = Kind::DecompileTimeout { seconds: 3700 }.into();
        assert_eq!(FailureClass::of(&timeout), FailureClass::Timeout);
        assert_eq!(
            format!("{}", timeout),
            "decompilation took more than 3700 seconds"
        );
    }

    #[test]
    fn it_classifies_through_context() {
        let res: Result<(), Kind> = Err(Kind::DecompileTimeout { seconds: 1 });
        let err = res.context("could not decompile `a.apk`").unwrap_err();
        assert_eq!(FailureClass::of(&err), FailureClass::Timeout);
    }

    #[test]
    fn it_classifies_other_failures() {
        let other = anyhow!("disk on fire");
        assert_eq!(FailureClass::of(&other), FailureClass::Unclassified);

        let config: anyhow::Error = Kind::Config {
            message: "bad".to_owned(),
        }
        .into();
        assert_eq!(FailureClass::of(&config), FailureClass::Unclassified);
    }
}
