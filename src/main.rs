mod ast;
mod cli;
mod config;
mod conflict;
mod discovery;
mod error;
mod migrate;
mod parser;
mod prompt;
mod record;
mod report;
mod resolver;
mod rewrite;
mod run;
mod suggest;
mod walker;

use std::{io, process::ExitCode};

use anyhow::{anyhow, Error};
use clap::ArgMatches;

use crate::record::MigrationStatus;

fn main() -> ExitCode {
    let matches = cli::cli().get_matches();

    tracing_subscriber::fmt()
        .with_max_level(cli::log_level(&matches))
        .with_writer(io::stderr)
        .init();

    match main_inner(&matches) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn main_inner(matches: &ArgMatches) -> Result<ExitCode, Error> {
    let options = cli::run_options(matches);

    if cli::is_init(matches) {
        config::write_sample_config(&options.config_path)?;
        println!("Sample configuration created: {}", options.config_path.display());
        println!("Edit it, then run the migration again.");
        return Ok(ExitCode::SUCCESS);
    }

    if !options.config_path.exists() {
        return Err(anyhow!(
            "configuration file {} not found (create one with --init)",
            options.config_path.display()
        ));
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let log = run::run(&options, stdin.lock(), stdout.lock())?;

    match log.count(MigrationStatus::Failed) {
        0 => Ok(ExitCode::SUCCESS),
        _ => Ok(ExitCode::FAILURE),
    }
}
