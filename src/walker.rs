
use std::path::Path;

use anyhow::{Context, Error};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::Config;

/// Lists the templates under `config.source_dir` as sorted, `/`-separated paths
/// relative to it, leaving out excluded ones.
pub fn discover_templates(config: &Config) -> Result<Vec<String>, Error> {
    let root = &config.source_dir;
    let mut templates = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.with_context(|| format!("cannot read {}", root.display()))?;
        if !entry.file_type().is_file() || !has_template_extension(entry.path(), &config.extensions) {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let relative = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if config.is_excluded(&relative) {
            debug!("excluding {}", relative);
            continue;
        }
        templates.push(relative);
    }

    templates.sort();
    Ok(templates)
}

fn has_template_extension(path: &Path, extensions: &[String]) -> bool {
    match path.extension() {
        Some(extension) => extensions.iter().any(|allowed| extension == allowed.as_str()),
        None => false,
    }
}
