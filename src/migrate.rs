// Copyright (c) Chris Gunn.
// Licensed under the MIT license.


use anyhow::Error;
use tracing::{debug, warn};

use crate::{
    conflict::{self, Conflict, RunState},
    discovery::{self, DiscoverySet},
    parser::Parser,
    record::MigrationRecord,
    resolver::{self, PartialMapping, Policy, RenamePlan, Synonyms},
    rewrite::rewrite,
    suggest::suggest_template_path,
};

pub enum MappingDecision {
    Map(PartialMapping),
    Skip,
}

pub enum ConflictDecision {
    /// Resolve again with a refined mapping.
    Retry(PartialMapping),
    Skip,
    /// Apply the plan despite its conflicts. Refused for path collisions.
    Force,
}

/// Supplies the per-template decisions that are not derived from policy.
pub trait MappingSource {
    fn mapping(&mut self, source_path: &str, discovery: &DiscoverySet) -> Result<MappingDecision, Error>;

    fn resolve_conflicts(
        &mut self,
        source_path: &str,
        partial: &PartialMapping,
        plan: &RenamePlan,
        conflicts: &[Conflict],
    ) -> Result<ConflictDecision, Error>;
}

/// Non-interactive decisions: the suggested target path, policy defaults for
/// everything else, and a skip whenever a conflict is found.
pub struct AutoMapping;

impl MappingSource for AutoMapping {
    fn mapping(&mut self, source_path: &str, _discovery: &DiscoverySet) -> Result<MappingDecision, Error> {
        let partial = PartialMapping::new(&suggest_template_path(source_path));
        Ok(MappingDecision::Map(partial))
    }

    fn resolve_conflicts(
        &mut self,
        _source_path: &str,
        _partial: &PartialMapping,
        _plan: &RenamePlan,
        _conflicts: &[Conflict],
    ) -> Result<ConflictDecision, Error> {
        Ok(ConflictDecision::Skip)
    }
}

pub struct TemplateOutcome {
    pub record: MigrationRecord,
    /// The rewritten template, present when the record is applied.
    pub output: Option<String>,
}

/// Runs templates through parse, discovery, resolution, conflict checks and rewrite.
pub struct Migrator {
    parser: Parser,
    policy: Policy,
    synonyms: Synonyms,
    run_state: RunState,
}

impl TemplateOutcome {
    fn without_output(record: MigrationRecord) -> TemplateOutcome {
        TemplateOutcome { record, output: None }
    }
}

impl Migrator {
    pub fn new(policy: Policy, synonyms: Synonyms) -> Migrator {
        Migrator {
            parser: Parser::new(),
            policy,
            synonyms,
            run_state: RunState::new(),
        }
    }

    #[cfg(test)]
    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    /// Migrates one template. Template-level problems end up in the returned
    /// record; an `Err` means the run itself cannot continue.
    pub fn migrate(
        &self,
        source_path: &str,
        text: &str,
        mappings: &mut dyn MappingSource,
    ) -> Result<TemplateOutcome, Error> {
        let template = match self.parser.parse(source_path, text) {
            Ok(template) => template,
            Err(err) => {
                warn!("{}: {}", source_path, err);
                let record = MigrationRecord::failed(source_path, None, err.to_string());
                return Ok(TemplateOutcome::without_output(record));
            }
        };

        let discovery = discovery::extract(&template);
        debug!(
            "{}: {} variables, {} blocks",
            source_path,
            discovery.variables.len(),
            discovery.blocks.len()
        );

        let mut partial = match mappings.mapping(source_path, &discovery)? {
            MappingDecision::Map(partial) => partial,
            MappingDecision::Skip => {
                debug!("{}: skipped before mapping", source_path);
                let record = MigrationRecord::skipped(source_path, None, Vec::new());
                return Ok(TemplateOutcome::without_output(record));
            }
        };

        let (plan, forced_conflicts) = loop {
            let plan = resolver::resolve(&discovery, &partial, &self.policy, &self.synonyms)?;
            let conflicts = conflict::check(&plan, &discovery, &self.run_state);
            if conflicts.is_empty() {
                break (plan, conflicts);
            }

            for conflict in &conflicts {
                debug!("{}: {}", source_path, conflict);
            }

            match mappings.resolve_conflicts(source_path, &partial, &plan, &conflicts)? {
                ConflictDecision::Retry(next) => partial = next,
                ConflictDecision::Skip => {
                    warn!("{}: skipped with {} conflicts", source_path, conflicts.len());
                    let record = MigrationRecord::skipped(source_path, Some(plan), conflicts);
                    return Ok(TemplateOutcome::without_output(record));
                }
                ConflictDecision::Force if conflicts.iter().any(Conflict::is_path_collision) => {
                    warn!("{}: a path collision cannot be forced, skipping", source_path);
                    let record = MigrationRecord::skipped(source_path, Some(plan), conflicts);
                    return Ok(TemplateOutcome::without_output(record));
                }
                ConflictDecision::Force => {
                    warn!("{}: applying despite {} conflicts", source_path, conflicts.len());
                    break (plan, conflicts);
                }
            }
        };

        if conflict::leaves_target_dir(&plan.target_path) {
            warn!("{}: target path '{}' is outside the target directory", source_path, plan.target_path);
            let reason = format!("target path '{}' leaves the target directory", plan.target_path);
            let record = MigrationRecord::failed(source_path, Some(plan), reason);
            return Ok(TemplateOutcome::without_output(record));
        }

        let output = rewrite(&template, &plan);

        // Another template may have claimed the path since the check.
        if !self.run_state.claim(&plan.target_path) {
            warn!("{}: target path '{}' was claimed concurrently", source_path, plan.target_path);
            let conflicts = vec![Conflict::PathCollision {
                target_path: conflict::normalize_target_path(&plan.target_path),
            }];
            let record = MigrationRecord::skipped(source_path, Some(plan), conflicts);
            return Ok(TemplateOutcome::without_output(record));
        }

        debug!("{}: migrated to '{}'", source_path, plan.target_path);
        let outcome = TemplateOutcome {
            record: MigrationRecord::applied(source_path, plan, forced_conflicts),
            output: Some(output),
        };
        Ok(outcome)
    }
}
