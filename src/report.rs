#[cfg(test)]
mod tests;

use std::{fmt::Write as _, fs, path::Path};

use anyhow::{Context, Error};
use hashlink::LinkedHashMap;

use crate::{
    config::Config,
    record::{MigrationLog, MigrationRecord, MigrationStatus},
};

pub const DEFAULT_REPORT_PATH: &str = "migration_report.md";

/// Renders the run as a Markdown report.
pub fn render_report(config: &Config, log: &MigrationLog, dry_run: bool) -> String {
    let mut report = String::new();

    report.push_str("# Jinja Template Migration Report\n\n");

    report.push_str("## Configuration\n");
    let _ = writeln!(report, "- Source Directory: {}", config.source_dir.display());
    let _ = writeln!(report, "- Target Directory: {}", config.target_dir.display());
    let _ = writeln!(report, "- New Base Template: {}", config.new_base_template);
    if dry_run {
        report.push_str("- Dry run: no files were written\n");
    }
    report.push('\n');

    report.push_str("## Summary\n");
    for status in [MigrationStatus::Applied, MigrationStatus::Skipped, MigrationStatus::Failed] {
        let _ = writeln!(report, "- {}: {}", capitalize(&status.to_string()), log.count(status));
    }
    report.push('\n');

    let mut variables: LinkedHashMap<String, String> = LinkedHashMap::new();
    let mut blocks: LinkedHashMap<String, String> = LinkedHashMap::new();
    for record in log.records() {
        let Some(plan) = record.plan.as_ref().filter(|_| record.status == MigrationStatus::Applied) else {
            continue;
        };
        for (old, new) in plan.renamed_variables() {
            if !variables.contains_key(old) {
                variables.insert(old.to_string(), new.to_string());
            }
        }
        for (old, new) in plan.renamed_blocks() {
            if !blocks.contains_key(old) {
                blocks.insert(old.to_string(), new.to_string());
            }
        }
    }

    report.push_str("## Applied Mappings\n");
    if variables.is_empty() && blocks.is_empty() {
        report.push_str("None\n\n");
    }
    push_mapping_table(&mut report, "Variable Mappings", &variables);
    push_mapping_table(&mut report, "Block Mappings", &blocks);

    report.push_str("## Migrated Templates\n");
    for record in log.records() {
        push_record(&mut report, record);
    }

    report
}

pub fn write_report(path: &Path, report: &str) -> Result<(), Error> {
    fs::write(path, report).with_context(|| format!("cannot write report {}", path.display()))
}

fn push_mapping_table(report: &mut String, title: &str, mappings: &LinkedHashMap<String, String>) {
    if mappings.is_empty() {
        return;
    }

    let _ = writeln!(report, "### {}", title);
    report.push_str("| Original | New |\n");
    report.push_str("|----------|-----|\n");
    for (old, new) in mappings {
        let _ = writeln!(report, "| {} | {} |", old, new);
    }
    report.push('\n');
}

fn push_record(report: &mut String, record: &MigrationRecord) {
    match &record.target_path {
        Some(target_path) => {
            let _ = writeln!(report, "### {} -> {}", record.source_path, target_path);
        }
        None => {
            let _ = writeln!(report, "### {}", record.source_path);
        }
    }
    let _ = writeln!(report, "- Status: {}", record.status);

    if let Some(plan) = &record.plan {
        let variables = plan.variable_renames.keys().map(String::as_str).collect::<Vec<_>>();
        let blocks = plan.block_renames.keys().map(String::as_str).collect::<Vec<_>>();
        let _ = writeln!(report, "- Extends: {}", plan.target_extends);
        let _ = writeln!(report, "- Variables: {}", join_or_none(&variables));
        let _ = writeln!(report, "- Blocks: {}", join_or_none(&blocks));
    }

    if !record.conflicts.is_empty() {
        let heading = match record.status {
            MigrationStatus::Applied => "Overridden conflicts",
            _ => "Conflicts",
        };
        let _ = writeln!(report, "- {}:", heading);
        for conflict in &record.conflicts {
            let _ = writeln!(report, "  - {}", conflict);
        }
    }

    if let Some(reason) = &record.failure_reason {
        let _ = writeln!(report, "- Reason: {}", reason);
    }
    report.push('\n');
}

fn join_or_none(names: &[&str]) -> String {
    match names.is_empty() {
        true => "None".to_string(),
        false => names.join(", "),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
