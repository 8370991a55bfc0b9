//! Command line behaviour of the binary.

use std::{fs, process::Command};

#[test]
fn it_reports_fatal_errors_on_stderr_with_a_log_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("apps")).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_feature-scraper"))
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .args(&[
            "--log-file",
            "out.batch.log",
            "batch",
            "apps",
            "missing.txt",
            "decompile.sh",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("could not read the worklist"), "{}", stderr);

    let log = fs::read_to_string(dir.path().join("out.batch.log")).unwrap();
    assert!(log.contains(" - ERROR - "), "{}", log);
    assert!(log.contains("could not read the worklist"), "{}", log);
}
