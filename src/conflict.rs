// Copyright (c) Chris Gunn.
// Licensed under the MIT license.


use std::{
    collections::HashSet,
    fmt,
    path::{Component, Path},
    sync::{Mutex, MutexGuard, PoisonError},
};

use hashlink::LinkedHashMap;

use crate::{
    ast::SymbolKind,
    discovery::DiscoverySet,
    parser::{is_identifier, is_reserved_name},
    resolver::RenamePlan,
};

/// A reason a rename plan cannot be applied as is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Conflict {
    VariableCollision { new_name: String, old_names: Vec<String> },
    BlockCollision { new_name: String, old_names: Vec<String> },
    ReservedName { kind: SymbolKind, old_name: String, new_name: String },
    /// The variable's name is also used as a keyword argument, which a rename does not touch.
    KeywordArgument { old_name: String, new_name: String },
    UnresolvedExtends { target: String },
    PathCollision { target_path: String },
}

/// Target paths claimed so far in a run.
#[derive(Debug, Default)]
pub struct RunState {
    claimed: Mutex<HashSet<String>>,
}

impl Conflict {
    pub fn is_path_collision(&self) -> bool {
        matches!(self, Conflict::PathCollision { .. })
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::VariableCollision { new_name, old_names } => write!(
                f,
                "variables {} would all be renamed to '{}'",
                quoted_list(old_names),
                new_name
            ),
            Conflict::BlockCollision { new_name, old_names } => write!(
                f,
                "blocks {} would all be renamed to '{}'",
                quoted_list(old_names),
                new_name
            ),
            Conflict::ReservedName {
                kind,
                old_name,
                new_name,
            } => write!(f, "{} '{}' cannot be renamed to '{}'", kind, old_name, new_name),
            Conflict::KeywordArgument { old_name, new_name } => write!(
                f,
                "variable '{}' is also passed as a keyword argument and cannot be renamed to '{}'",
                old_name, new_name
            ),
            Conflict::UnresolvedExtends { target } => {
                write!(f, "'{}' cannot be used as an extends target", target.escape_debug())
            }
            Conflict::PathCollision { target_path } => {
                write!(f, "target path '{}' is already used by another template", target_path)
            }
        }
    }
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

impl RunState {
    pub fn new() -> RunState {
        RunState::default()
    }

    pub fn is_claimed(&self, target_path: &str) -> bool {
        self.lock().contains(&normalize_target_path(target_path))
    }

    /// Claims `target_path` for this run. Returns false when it was already claimed.
    pub fn claim(&self, target_path: &str) -> bool {
        self.lock().insert(normalize_target_path(target_path))
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Canonical form used to compare target paths: `/` separators, no empty or `.`
/// segments.
pub fn normalize_target_path(target_path: &str) -> String {
    target_path
        .replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `target_path` is absolute or climbs out of the directory it is joined to.
pub fn leaves_target_dir(target_path: &str) -> bool {
    let path = Path::new(target_path);
    path.has_root()
        || path
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Whether `target` can be written as a single Jinja string literal.
pub fn is_plausible_extends(target: &str) -> bool {
    !target.trim().is_empty() && !target.contains('\n') && !(target.contains('\'') && target.contains('"'))
}

/// Lists everything that makes `plan` unsafe to apply. The run state is only read.
pub fn check(plan: &RenamePlan, discovery: &DiscoverySet, run_state: &RunState) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for (new_name, old_names) in collisions(discovery.variable_names(), |name| plan.variable(name)) {
        conflicts.push(Conflict::VariableCollision { new_name, old_names });
    }

    for (new_name, old_names) in collisions(discovery.block_names(), |name| plan.block(name)) {
        conflicts.push(Conflict::BlockCollision { new_name, old_names });
    }

    let renames = plan
        .renamed_variables()
        .map(|rename| (SymbolKind::Variable, rename))
        .chain(plan.renamed_blocks().map(|rename| (SymbolKind::Block, rename)));
    for (kind, (old_name, new_name)) in renames {
        if is_reserved_name(new_name) || !is_identifier(new_name) {
            conflicts.push(Conflict::ReservedName {
                kind,
                old_name: old_name.to_string(),
                new_name: new_name.to_string(),
            });
        }
    }

    for (old_name, new_name) in plan.renamed_variables() {
        if discovery.keyword_arguments.contains(old_name) {
            conflicts.push(Conflict::KeywordArgument {
                old_name: old_name.to_string(),
                new_name: new_name.to_string(),
            });
        }
    }

    if !is_plausible_extends(&plan.target_extends) {
        conflicts.push(Conflict::UnresolvedExtends {
            target: plan.target_extends.clone(),
        });
    }

    if run_state.is_claimed(&plan.target_path) {
        conflicts.push(Conflict::PathCollision {
            target_path: normalize_target_path(&plan.target_path),
        });
    }

    conflicts
}

/// Groups `names` by their renamed value and keeps the groups with more than one member.
fn collisions<'a>(
    names: impl Iterator<Item = &'a str>,
    rename: impl Fn(&'a str) -> &'a str,
) -> Vec<(String, Vec<String>)> {
    let mut groups: LinkedHashMap<&str, Vec<String>> = LinkedHashMap::new();
    for name in names {
        let new_name = rename(name);
        match groups.get_mut(new_name) {
            Some(old_names) => old_names.push(name.to_string()),
            None => {
                groups.insert(new_name, vec![name.to_string()]);
            }
        }
    }

    groups
        .into_iter()
        .filter(|(_, old_names)| old_names.len() > 1)
        .map(|(new_name, old_names)| (new_name.to_string(), old_names))
        .collect()
}
