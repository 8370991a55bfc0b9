//! Decompilation module.
//!
//! Runs the external decompiler on an application package. The decompiler is expected to leave
//! its output in a folder next to itself, named after the package plus `.uncompressed`.

use crate::{app::UNCOMPRESSED_SUFFIX, error::Kind};
use anyhow::{Context, Result};
use log::{debug, warn};
use std::{
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

/// How often the running decompiler is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// External decompiler, bounded by a wall-clock timeout.
#[derive(Debug, Clone)]
pub struct Decompiler {
    program: PathBuf,
    timeout: Duration,
}

impl Decompiler {
    /// Creates a new decompiler for the given program.
    pub fn new<P: Into<PathBuf>>(program: P, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Gets the decompiler program.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Gets the timeout of each decompilation.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Gets the folder where the decompiled output of the given package will be.
    ///
    /// Only the file name of the package counts, wherever the package is.
    pub fn output_path<P: AsRef<Path>>(&self, package: P) -> PathBuf {
        let mut name = package
            .as_ref()
            .file_name()
            .unwrap_or_default()
            .to_os_string();
        name.push(UNCOMPRESSED_SUFFIX);

        self.program
            .parent()
            .map_or_else(|| PathBuf::from(&name), |dir| dir.join(&name))
    }

    /// Decompiles the package at the given absolute path.
    ///
    /// The standard output of the decompiler is discarded. If it runs for longer than the timeout
    /// it gets killed, along with every process it started, and `Kind::DecompileTimeout` is
    /// returned. A non-zero exit status is only reported as a warning.
    pub fn decompile<P: AsRef<Path>>(&self, package: P) -> Result<()> {
        let package = package.as_ref();
        let mut command = Command::new(&self.program);
        let _ = command
            .arg(package)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group, killed as a whole on timeout.
            let _ = command.process_group(0);
        }
        let mut child = command.spawn().with_context(|| {
            format!(
                "there was an error when executing the decompiler `{}`",
                self.program.display()
            )
        })?;

        let start = Instant::now();
        loop {
            let status = child
                .try_wait()
                .context("could not get the status of the decompiler")?;
            if let Some(status) = status {
                if !status.success() {
                    warn!(
                        "the decompiler exited with {} for `{}`",
                        status,
                        package.display()
                    );
                }
                debug!(
                    "`{}` decompiled in {:.1}s",
                    package.display(),
                    start.elapsed().as_secs_f64()
                );
                return Ok(());
            }

            if start.elapsed() >= self.timeout {
                kill(&mut child);

                return Err(Kind::DecompileTimeout {
                    seconds: self.timeout.as_secs(),
                }
                .into());
            }

            thread::sleep(POLL_INTERVAL.min(self.timeout));
        }
    }
}

/// Kills the decompiler and every process in its group, then reaps it.
#[cfg(unix)]
fn kill(child: &mut Child) {
    use nix::{
        sys::signal::{killpg, Signal},
        unistd::Pid,
    };
    use std::convert::TryFrom;

    match i32::try_from(child.id()) {
        Ok(pid) => {
            if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                warn!("could not kill the decompiler process group: {}", e);
                if let Err(e) = child.kill() {
                    warn!("could not kill the decompiler: {}", e);
                }
            }
        }
        Err(_) => {
            if let Err(e) = child.kill() {
                warn!("could not kill the decompiler: {}", e);
            }
        }
    }
    let _ = child.wait();
}

/// Kills the decompiler, then reaps it.
#[cfg(not(unix))]
fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("could not kill the decompiler: {}", e);
    }
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::Decompiler;
    use std::{path::Path, time::Duration};

    #[test]
    fn it_output_path() {
        let decompiler = Decompiler::new("/opt/tools/decompile.sh", Duration::from_secs(1));
        assert_eq!(
            decompiler.output_path("com.example.apk"),
            Path::new("/opt/tools/com.example.apk.uncompressed")
        );
        assert_eq!(
            decompiler.output_path("/srv/apps/sub/com.example.apk"),
            Path::new("/opt/tools/com.example.apk.uncompressed")
        );
        assert_eq!(
            decompiler.output_path("sub/com.example.apk"),
            Path::new("/opt/tools/com.example.apk.uncompressed")
        );
        assert_eq!(decompiler.timeout(), Duration::from_secs(1));
        assert_eq!(decompiler.program(), Path::new("/opt/tools/decompile.sh"));
    }

    #[test]
    fn it_fails_on_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let decompiler = Decompiler::new(dir.path().join("missing.sh"), Duration::from_secs(1));
        let err = decompiler.decompile(dir.path().join("a.apk")).unwrap_err();
        assert_eq!(
            crate::error::FailureClass::of(&err),
            crate::error::FailureClass::Unclassified
        );
    }

    #[cfg(unix)]
    mod unix {
        use super::super::Decompiler;
        use crate::error::{FailureClass, Kind};
        use std::{
            fs,
            os::unix::fs::PermissionsExt,
            path::Path,
            thread,
            time::{Duration, Instant},
        };

        fn script<P: AsRef<Path>>(path: P, body: &str) {
            fs::write(path.as_ref(), format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(path.as_ref(), fs::Permissions::from_mode(0o755)).unwrap();
        }

        #[test]
        fn it_decompiles() {
            let dir = tempfile::tempdir().unwrap();
            let program = dir.path().join("decompile.sh");
            script(
                &program,
                "mkdir -p \"$(dirname \"$0\")/$(basename \"$1\").uncompressed\"\necho noise\nexit 3",
            );

            let decompiler = Decompiler::new(&program, Duration::from_secs(10));
            decompiler.decompile(dir.path().join("a.apk")).unwrap();
            assert!(decompiler.output_path("a.apk").is_dir());
        }

        #[test]
        fn it_kills_on_timeout() {
            let dir = tempfile::tempdir().unwrap();
            let program = dir.path().join("decompile.sh");
            script(&program, "exec sleep 30");

            let decompiler = Decompiler::new(&program, Duration::from_secs(1));
            let start = Instant::now();
            let err = decompiler.decompile(dir.path().join("a.apk")).unwrap_err();

            assert!(start.elapsed() < Duration::from_secs(10));
            assert_eq!(FailureClass::of(&err), FailureClass::Timeout);
            match err.downcast_ref::<Kind>() {
                Some(Kind::DecompileTimeout { seconds }) => assert_eq!(*seconds, 1),
                _ => panic!("unexpected error: {}", err),
            }
        }

        #[test]
        fn it_kills_the_workers_on_timeout() {
            let dir = tempfile::tempdir().unwrap();
            let program = dir.path().join("decompile.sh");
            let late = dir.path().join("late");
            script(
                &program,
                &format!("(sleep 2; mkdir -p \"{}\")\necho done", late.display()),
            );

            let decompiler = Decompiler::new(&program, Duration::from_secs(1));
            let err = decompiler.decompile(dir.path().join("a.apk")).unwrap_err();
            assert_eq!(FailureClass::of(&err), FailureClass::Timeout);

            thread::sleep(Duration::from_secs(3));
            assert!(!late.exists());
        }
    }
}
