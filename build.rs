use clap::Shell;
use std::{env, path::PathBuf};

#[path = "src/cli.rs"]
mod cli;

fn main() {
    let mut cli = cli::generate_cli();
    let mut out_dir = PathBuf::from(env::var_os("OUT_DIR").expect("cargo always sets OUT_DIR"));
    let _ = out_dir.pop();
    let _ = out_dir.pop();
    let _ = out_dir.pop();

    cli.gen_completions("feature-scraper", Shell::Bash, &out_dir);
    cli.gen_completions("feature-scraper", Shell::Fish, &out_dir);
}
