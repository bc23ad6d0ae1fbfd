
use std::{
    fs,
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};
use tracing::{info, warn};

use crate::{
    config::Config,
    migrate::{AutoMapping, Migrator, TemplateOutcome},
    prompt::InteractiveMapping,
    record::{MigrationLog, MigrationRecord, MigrationStatus},
    report::{render_report, write_report},
    walker::discover_templates,
};

#[derive(Clone, Debug)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub dry_run: bool,
    /// Templates to migrate instead of everything under the source directory.
    pub templates: Vec<String>,
    pub report: bool,
    pub report_path: PathBuf,
    pub auto: bool,
    /// Show the rewritten templates during a dry run.
    pub print: bool,
}

/// Runs a whole migration, prompting on `input`/`output` unless in auto mode.
pub fn run<R: BufRead, W: Write>(options: &RunOptions, input: R, output: W) -> Result<MigrationLog, Error> {
    let config = Config::load(&options.config_path)?;
    let mut prompts = InteractiveMapping::new(input, output);
    let mut log = MigrationLog::new();

    let templates = select_templates(options, &config)?;
    if templates.is_empty() {
        writeln!(prompts.output_mut(), "No templates found to migrate.")?;
        return Ok(log);
    }

    writeln!(prompts.output_mut(), "Found {} template(s) to migrate:", templates.len())?;
    for template in &templates {
        writeln!(prompts.output_mut(), "  - {}", template)?;
    }

    if options.dry_run {
        writeln!(prompts.output_mut(), "DRY RUN MODE - no files will be modified")?;
    } else if !options.auto && !prompts.confirm("Proceed with migration?", true)? {
        writeln!(prompts.output_mut(), "Migration cancelled.")?;
        return Ok(log);
    }

    let migrator = Migrator::new(config.policy(), config.synonyms.clone());

    for template in &templates {
        info!("migrating {}", template);
        let source_file = config.source_dir.join(template);
        let text = match fs::read_to_string(&source_file) {
            Ok(text) => text,
            Err(err) => {
                warn!("cannot read {}: {}", source_file.display(), err);
                let record = MigrationRecord::failed(template, None, format!("cannot read template: {}", err));
                report_outcome(prompts.output_mut(), &record, options.dry_run)?;
                log.push(record);
                continue;
            }
        };

        let outcome = match options.auto {
            true => migrator.migrate(template, &text, &mut AutoMapping)?,
            false => migrator.migrate(template, &text, &mut prompts)?,
        };

        let record = finish_outcome(options, &config, outcome, prompts.output_mut())?;
        report_outcome(prompts.output_mut(), &record, options.dry_run)?;
        log.push(record);
    }

    let out = prompts.output_mut();
    writeln!(out)?;
    writeln!(out, "Migration Summary:")?;
    writeln!(out, "  Applied: {}", log.count(MigrationStatus::Applied))?;
    writeln!(out, "  Skipped: {}", log.count(MigrationStatus::Skipped))?;
    writeln!(out, "  Failed: {}", log.count(MigrationStatus::Failed))?;

    if options.report {
        let report = render_report(&config, &log, options.dry_run);
        write_report(&options.report_path, &report)?;
        writeln!(out, "Migration report saved: {}", options.report_path.display())?;
    }

    Ok(log)
}

fn select_templates(options: &RunOptions, config: &Config) -> Result<Vec<String>, Error> {
    if options.templates.is_empty() {
        return discover_templates(config);
    }

    let mut templates = Vec::new();
    for template in &options.templates {
        let template = template.replace('\\', "/");
        if config.is_excluded(&template) {
            info!("skipping excluded template {}", template);
            continue;
        }
        templates.push(template);
    }
    Ok(templates)
}

/// Writes or previews an applied template. A failed write turns the record into a failure.
fn finish_outcome<W: Write>(
    options: &RunOptions,
    config: &Config,
    outcome: TemplateOutcome,
    out: &mut W,
) -> Result<MigrationRecord, Error> {
    let TemplateOutcome { record, output } = outcome;
    let (Some(output), Some(target_path)) = (output, record.target_path.clone()) else {
        return Ok(record);
    };

    if options.dry_run {
        if options.print {
            writeln!(out, "--- {} -> {}", record.source_path, target_path)?;
            writeln!(out, "{}", output)?;
        }
        return Ok(record);
    }

    let target_file = config.target_dir.join(&target_path);
    match persist(&target_file, &output) {
        Ok(()) => Ok(record),
        Err(err) => {
            warn!("{:#}", err);
            Ok(record.into_failed(format!("{:#}", err)))
        }
    }
}

fn persist(target_file: &Path, output: &str) -> Result<(), Error> {
    if let Some(parent) = target_file.parent() {
        fs::create_dir_all(parent).with_context(|| format!("cannot create {}", parent.display()))?;
    }
    fs::write(target_file, output).with_context(|| format!("cannot write {}", target_file.display()))
}

fn report_outcome<W: Write>(out: &mut W, record: &MigrationRecord, dry_run: bool) -> Result<(), Error> {
    match (record.status, &record.target_path) {
        (MigrationStatus::Applied, Some(target_path)) => {
            let verb = match dry_run {
                true => "Would migrate",
                false => "Migrated",
            };
            writeln!(out, "{}: {} -> {}", verb, record.source_path, target_path)?;
        }
        (MigrationStatus::Failed, _) => {
            let reason = record.failure_reason.as_deref().unwrap_or("unknown error");
            writeln!(out, "Failed: {}: {}", record.source_path, reason)?;
        }
        _ => {
            writeln!(out, "Skipped: {}", record.source_path)?;
            for conflict in &record.conflicts {
                writeln!(out, "  - {}", conflict)?;
            }
        }
    }
    Ok(())
}
