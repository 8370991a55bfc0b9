//! Command line interface definition.
//!
//! Shared with the build script, which generates the shell completions from it.

use clap::{crate_authors, crate_version, App, AppSettings, Arg, SubCommand};

/// Generates the command line interface.
pub fn generate_cli() -> App<'static, 'static> {
    App::new("feature-scraper")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Decompiles Android applications in batch and records the platform features they use")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .conflicts_with("quiet")
                .help("If you'd like the auditor to talk more than necessary"),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .help("If you'd like a zen auditor that only talks about problems"),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .help("Configuration file to use instead of config.toml"),
        )
        .arg(
            Arg::with_name("log-file")
                .long("log-file")
                .value_name("FILE")
                .takes_value(true)
                .help("Appends the log to the given file instead of the terminal"),
        )
        .arg(
            Arg::with_name("results")
                .long("results")
                .value_name("DIR")
                .takes_value(true)
                .help("Folder where the feature vectors will be stored"),
        )
        .subcommand(
            SubCommand::with_name("batch")
                .about("Decompiles and analyzes every application listed in a worklist")
                .arg(
                    Arg::with_name("archives")
                        .value_name("ARCHIVES_ROOT")
                        .required(true)
                        .help("Folder where all the application packages are located"),
                )
                .arg(
                    Arg::with_name("worklist")
                        .value_name("WORKLIST")
                        .required(true)
                        .help("File with the names of the packages to analyze, one per line"),
                )
                .arg(
                    Arg::with_name("decompiler")
                        .value_name("DECOMPILER")
                        .required(true)
                        .help("Decompiler program, called with the absolute path of each package"),
                )
                .arg(
                    Arg::with_name("skip")
                        .value_name("SKIP_COUNT")
                        .validator(|s| {
                            s.parse::<usize>()
                                .map(|_| ())
                                .map_err(|_| format!("`{}` is not a valid skip count", s))
                        })
                        .help("Number of leading worklist entries to skip, to resume a batch"),
                )
                .arg(
                    Arg::with_name("on-failure")
                        .long("on-failure")
                        .value_name("POLICY")
                        .takes_value(true)
                        .possible_values(&["abort", "continue"])
                        .help("What to do when an application fails for an unexpected reason"),
                )
                .arg(
                    Arg::with_name("keep-blank-lines")
                        .long("keep-blank-lines")
                        .help("Treats blank worklist lines as applications"),
                )
                .arg(
                    Arg::with_name("timeout")
                        .long("timeout")
                        .value_name("SECONDS")
                        .takes_value(true)
                        .help("Seconds a single decompilation may take before it is killed"),
                )
                .arg(
                    Arg::with_name("ledger")
                        .long("ledger")
                        .value_name("FILE")
                        .takes_value(true)
                        .help("Appends the final state of every job to the given JSON lines file"),
                ),
        )
        .subcommand(
            SubCommand::with_name("analyze")
                .about("Analyzes an application that has already been decompiled")
                .arg(
                    Arg::with_name("path")
                        .value_name("DECOMPILED_PATH")
                        .required(true)
                        .help("Folder with the decompiled application"),
                )
                .arg(
                    Arg::with_name("persist")
                        .long("persist")
                        .help("Stores the resulting feature vector"),
                ),
        )
}
