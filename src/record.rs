
use std::fmt;

use crate::{conflict::Conflict, resolver::RenamePlan};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationStatus {
    Applied,
    Skipped,
    Failed,
}

/// The outcome of migrating one template.
#[derive(Clone, Debug, PartialEq)]
pub struct MigrationRecord {
    pub source_path: String,
    pub target_path: Option<String>,
    pub plan: Option<RenamePlan>,
    pub status: MigrationStatus,
    pub failure_reason: Option<String>,
    /// Why the template was skipped, or the conflicts that were overridden when applied.
    pub conflicts: Vec<Conflict>,
}

/// Records for a run, in processing order.
#[derive(Clone, Debug, Default)]
pub struct MigrationLog {
    records: Vec<MigrationRecord>,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStatus::Applied => f.write_str("applied"),
            MigrationStatus::Skipped => f.write_str("skipped"),
            MigrationStatus::Failed => f.write_str("failed"),
        }
    }
}

impl MigrationRecord {
    pub fn applied(source_path: &str, plan: RenamePlan, forced_conflicts: Vec<Conflict>) -> MigrationRecord {
        MigrationRecord {
            source_path: source_path.to_string(),
            target_path: Some(plan.target_path.clone()),
            plan: Some(plan),
            status: MigrationStatus::Applied,
            failure_reason: None,
            conflicts: forced_conflicts,
        }
    }

    /// A skipped template. `plan` is absent when the user skipped before a plan existed.
    pub fn skipped(source_path: &str, plan: Option<RenamePlan>, conflicts: Vec<Conflict>) -> MigrationRecord {
        MigrationRecord {
            source_path: source_path.to_string(),
            target_path: plan.as_ref().map(|plan| plan.target_path.clone()),
            plan,
            status: MigrationStatus::Skipped,
            failure_reason: None,
            conflicts,
        }
    }

    pub fn failed(source_path: &str, plan: Option<RenamePlan>, reason: impl Into<String>) -> MigrationRecord {
        MigrationRecord {
            source_path: source_path.to_string(),
            target_path: plan.as_ref().map(|plan| plan.target_path.clone()),
            plan,
            status: MigrationStatus::Failed,
            failure_reason: Some(reason.into()),
            conflicts: Vec::new(),
        }
    }

    /// Turns an applied record into a failed one, keeping its plan.
    pub fn into_failed(self, reason: impl Into<String>) -> MigrationRecord {
        MigrationRecord {
            status: MigrationStatus::Failed,
            failure_reason: Some(reason.into()),
            ..self
        }
    }
}

impl MigrationLog {
    pub fn new() -> MigrationLog {
        MigrationLog::default()
    }

    pub fn push(&mut self, record: MigrationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[MigrationRecord] {
        &self.records
    }

    pub fn count(&self, status: MigrationStatus) -> usize {
        self.records.iter().filter(|record| record.status == status).count()
    }
}
