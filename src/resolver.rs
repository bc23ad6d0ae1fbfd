// Copyright (c) Chris Gunn.
// Licensed under the MIT license.


use hashlink::LinkedHashMap;
use tracing::debug;

use crate::{ast::SymbolKind, discovery::DiscoverySet, error::PolicyError};

/// Explicit decisions for one template, from the user or from auto mode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartialMapping {
    pub variables: LinkedHashMap<String, String>,
    pub blocks: LinkedHashMap<String, String>,
    pub target_path: String,
    /// Falls back to [`Policy::new_base_template`] when unset.
    pub target_extends: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Policy {
    pub auto_preserve_blocks: bool,
    pub auto_map_variables: bool,
    pub new_base_template: String,
}

/// Candidate renames for commonly used names.
#[derive(Clone, Debug, PartialEq)]
pub struct Synonyms {
    pub variables: LinkedHashMap<String, String>,
    pub blocks: LinkedHashMap<String, String>,
}

/// A complete set of renames for one template.
#[derive(Clone, Debug, PartialEq)]
pub struct RenamePlan {
    pub variable_renames: LinkedHashMap<String, String>,
    pub block_renames: LinkedHashMap<String, String>,
    pub target_extends: String,
    pub target_path: String,
}

impl PartialMapping {
    pub fn new(target_path: &str) -> PartialMapping {
        PartialMapping {
            target_path: target_path.to_string(),
            ..Default::default()
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            auto_preserve_blocks: true,
            auto_map_variables: false,
            new_base_template: String::new(),
        }
    }
}

impl Synonyms {
    #[cfg(test)]
    pub fn empty() -> Synonyms {
        Synonyms {
            variables: LinkedHashMap::new(),
            blocks: LinkedHashMap::new(),
        }
    }
}

impl Default for Synonyms {
    fn default() -> Self {
        Synonyms {
            variables: pairs(&[
                ("user_name", "username"),
                ("user_email", "email"),
                ("page_title", "title"),
                ("current_user", "user"),
                ("nav_items", "navigation"),
            ]),
            blocks: pairs(&[
                ("content", "main_content"),
                ("sidebar", "aside_content"),
                ("page_scripts", "scripts"),
                ("page_styles", "styles"),
            ]),
        }
    }
}

fn pairs(pairs: &[(&str, &str)]) -> LinkedHashMap<String, String> {
    pairs
        .iter()
        .map(|(old, new)| (old.to_string(), new.to_string()))
        .collect()
}

impl RenamePlan {
    pub fn variable<'a>(&'a self, name: &'a str) -> &'a str {
        self.variable_renames.get(name).map_or(name, String::as_str)
    }

    pub fn block<'a>(&'a self, name: &'a str) -> &'a str {
        self.block_renames.get(name).map_or(name, String::as_str)
    }

    /// Variable renames that change the name.
    pub fn renamed_variables(&self) -> impl Iterator<Item = (&str, &str)> {
        non_identity(&self.variable_renames)
    }

    /// Block renames that change the name.
    pub fn renamed_blocks(&self) -> impl Iterator<Item = (&str, &str)> {
        non_identity(&self.block_renames)
    }
}

fn non_identity(renames: &LinkedHashMap<String, String>) -> impl Iterator<Item = (&str, &str)> {
    renames
        .iter()
        .filter(|(old, new)| old != new)
        .map(|(old, new)| (old.as_str(), new.as_str()))
}

/// Completes `partial` into a plan covering every discovered name.
///
/// Explicit entries win, then the synonym tables where the policy enables them,
/// then identity. Collisions between the resulting names are not checked here.
pub fn resolve(
    discovery: &DiscoverySet,
    partial: &PartialMapping,
    policy: &Policy,
    synonyms: &Synonyms,
) -> Result<RenamePlan, PolicyError> {
    let target_path = partial.target_path.trim();
    if target_path.is_empty() {
        return Err(PolicyError::MissingTargetPath);
    }

    let variable_renames = resolve_names(
        SymbolKind::Variable,
        discovery.variable_names(),
        &partial.variables,
        policy.auto_map_variables.then_some(&synonyms.variables),
    )?;

    let block_renames = resolve_names(
        SymbolKind::Block,
        discovery.block_names(),
        &partial.blocks,
        (!policy.auto_preserve_blocks).then_some(&synonyms.blocks),
    )?;

    let target_extends = partial
        .target_extends
        .clone()
        .unwrap_or_else(|| policy.new_base_template.clone());

    let plan = RenamePlan {
        variable_renames,
        block_renames,
        target_extends,
        target_path: target_path.to_string(),
    };
    Ok(plan)
}

fn resolve_names<'a>(
    kind: SymbolKind,
    names: impl Iterator<Item = &'a str>,
    explicit: &LinkedHashMap<String, String>,
    synonyms: Option<&LinkedHashMap<String, String>>,
) -> Result<LinkedHashMap<String, String>, PolicyError> {
    let mut renames = LinkedHashMap::new();

    for name in names {
        let new_name = match explicit.get(name) {
            Some(new_name) => {
                if new_name.trim().is_empty() {
                    return Err(PolicyError::EmptyRename {
                        kind,
                        name: name.to_string(),
                    });
                }
                new_name.trim()
            }
            None => synonyms.and_then(|synonyms| synonyms.get(name)).map_or(name, String::as_str),
        };
        renames.insert(name.to_string(), new_name.to_string());
    }

    for name in explicit.keys() {
        if !renames.contains_key(name) {
            debug!("ignoring {} mapping for '{}': not present in template", kind, name);
        }
    }

    Ok(renames)
}
