#[cfg(test)]
mod tests;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Error};
use hashlink::LinkedHashMap;
use regex::Regex;
use saphyr::{Yaml, YamlLoader};

use crate::{
    error::PolicyError,
    resolver::{Policy, Synonyms},
};

pub const DEFAULT_CONFIG_PATH: &str = "migration_config.yaml";

pub const SAMPLE_CONFIG: &str = "\
source_dir: ./templates
target_dir: ./new_templates
new_base_template: base.html
exclude_patterns:
  - '.*_backup\\.html$'
  - 'temp_.*\\.html$'
auto_preserve_blocks: true
auto_map_variables: false
";

#[derive(Clone, Debug)]
pub struct Config {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub new_base_template: String,
    /// Matched against the start of each template's relative path.
    pub exclude_patterns: Vec<Regex>,
    pub auto_preserve_blocks: bool,
    pub auto_map_variables: bool,
    /// File extensions, without the dot, that count as templates.
    pub extensions: Vec<String>,
    pub synonyms: Synonyms,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, Error> {
        let text = fs::read_to_string(path).with_context(|| format!("cannot read config file {}", path.display()))?;
        Config::from_yaml_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Config, Error> {
        let docs = YamlLoader::load_from_str(text).map_err(|err| anyhow!("{}", err))?;
        let doc = match docs.into_iter().next() {
            Some(doc @ Yaml::Hash(_)) => doc,
            Some(Yaml::Null) | None => Yaml::Null,
            Some(_) => return Err(anyhow!("expected a mapping at the top level")),
        };

        let defaults = Synonyms::default();
        let synonyms = Synonyms {
            variables: string_map(&doc, "variable_synonyms")?.unwrap_or(defaults.variables),
            blocks: string_map(&doc, "block_synonyms")?.unwrap_or(defaults.blocks),
        };

        let exclude_patterns = string_list(&doc, "exclude_patterns")?
            .unwrap_or_default()
            .iter()
            .map(|pattern| {
                Regex::new(&format!("^(?:{})", pattern))
                    .with_context(|| format!("invalid exclude pattern '{}'", pattern))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let config = Config {
            source_dir: PathBuf::from(required_string(&doc, "source_dir")?),
            target_dir: PathBuf::from(required_string(&doc, "target_dir")?),
            new_base_template: required_string(&doc, "new_base_template")?,
            exclude_patterns,
            auto_preserve_blocks: optional_bool(&doc, "auto_preserve_blocks")?.unwrap_or(true),
            auto_map_variables: optional_bool(&doc, "auto_map_variables")?.unwrap_or(false),
            extensions: string_list(&doc, "extensions")?.unwrap_or_else(|| vec!["html".to_string()]),
            synonyms,
        };
        Ok(config)
    }

    pub fn policy(&self) -> Policy {
        Policy {
            auto_preserve_blocks: self.auto_preserve_blocks,
            auto_map_variables: self.auto_map_variables,
            new_base_template: self.new_base_template.clone(),
        }
    }

    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(relative_path))
    }
}

/// Writes [`SAMPLE_CONFIG`] to `path`, refusing to overwrite an existing file.
pub fn write_sample_config(path: &Path) -> Result<(), Error> {
    if path.exists() {
        return Err(anyhow!("{} already exists", path.display()));
    }
    fs::write(path, SAMPLE_CONFIG).with_context(|| format!("cannot write {}", path.display()))
}

fn required_string(doc: &Yaml, key: &'static str) -> Result<String, Error> {
    match &doc[key] {
        Yaml::String(value) if !value.trim().is_empty() => Ok(value.clone()),
        Yaml::String(_) | Yaml::Null | Yaml::BadValue => Err(PolicyError::MissingValue { key }.into()),
        _ => Err(anyhow!("'{}' must be a string", key)),
    }
}

fn optional_bool(doc: &Yaml, key: &str) -> Result<Option<bool>, Error> {
    match &doc[key] {
        Yaml::Boolean(value) => Ok(Some(*value)),
        Yaml::Null | Yaml::BadValue => Ok(None),
        _ => Err(anyhow!("'{}' must be true or false", key)),
    }
}

fn string_list(doc: &Yaml, key: &str) -> Result<Option<Vec<String>>, Error> {
    let list = match &doc[key] {
        Yaml::Array(list) => list,
        Yaml::Null | Yaml::BadValue => return Ok(None),
        _ => return Err(anyhow!("'{}' must be a list", key)),
    };

    let strings = list
        .iter()
        .map(|item| match item {
            Yaml::String(value) => Ok(value.clone()),
            _ => Err(anyhow!("'{}' must only contain strings", key)),
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(Some(strings))
}

fn string_map(doc: &Yaml, key: &str) -> Result<Option<LinkedHashMap<String, String>>, Error> {
    let hash = match &doc[key] {
        Yaml::Hash(hash) => hash,
        Yaml::Null | Yaml::BadValue => return Ok(None),
        _ => return Err(anyhow!("'{}' must be a mapping", key)),
    };

    let mut map = LinkedHashMap::new();
    for (old, new) in hash {
        match (old, new) {
            (Yaml::String(old), Yaml::String(new)) => {
                map.insert(old.clone(), new.clone());
            }
            _ => return Err(anyhow!("'{}' must map names to names", key)),
        }
    }
    Ok(Some(map))
}
