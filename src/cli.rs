
use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

use crate::{config::DEFAULT_CONFIG_PATH, report::DEFAULT_REPORT_PATH, run::RunOptions};

pub fn cli() -> Command {
    Command::new("jinja-migrate")
        .about("Migrates Jinja templates to a new layout, renaming variables and blocks")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_CONFIG_PATH)
                .help("Path to the migration configuration file"),
        )
        .arg(
            Arg::new("dry-run")
                .short('d')
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Show what would be migrated without writing any files"),
        )
        .arg(
            Arg::new("template")
                .short('t')
                .long("template")
                .value_name("PATH")
                .action(ArgAction::Append)
                .help("Template to migrate, relative to the source directory (repeatable)"),
        )
        .arg(
            Arg::new("report")
                .short('r')
                .long("report")
                .action(ArgAction::SetTrue)
                .help("Write a Markdown migration report"),
        )
        .arg(
            Arg::new("report-path")
                .long("report-path")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_REPORT_PATH)
                .help("Where to write the report"),
        )
        .arg(
            Arg::new("auto")
                .short('a')
                .long("auto")
                .action(ArgAction::SetTrue)
                .help("Use automatic mappings without asking"),
        )
        .arg(
            Arg::new("print")
                .short('p')
                .long("print")
                .action(ArgAction::SetTrue)
                .requires("dry-run")
                .help("Print the rewritten templates during a dry run"),
        )
        .arg(
            Arg::new("init")
                .long("init")
                .action(ArgAction::SetTrue)
                .help("Create a sample configuration file and exit"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Log more details to stderr (repeatable)"),
        )
}

pub fn run_options(matches: &ArgMatches) -> RunOptions {
    RunOptions {
        config_path: path_arg(matches, "config", DEFAULT_CONFIG_PATH),
        dry_run: matches.get_flag("dry-run"),
        templates: matches
            .get_many::<String>("template")
            .map(|templates| templates.cloned().collect())
            .unwrap_or_default(),
        report: matches.get_flag("report"),
        report_path: path_arg(matches, "report-path", DEFAULT_REPORT_PATH),
        auto: matches.get_flag("auto"),
        print: matches.get_flag("print"),
    }
}

pub fn is_init(matches: &ArgMatches) -> bool {
    matches.get_flag("init")
}

pub fn log_level(matches: &ArgMatches) -> Level {
    match matches.get_count("verbose") {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn path_arg(matches: &ArgMatches, id: &str, default: &str) -> PathBuf {
    matches
        .get_one::<PathBuf>(id)
        .cloned()
        .unwrap_or_else(|| PathBuf::from(default))
}
