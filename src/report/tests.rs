use super::*;
use crate::{
    conflict::Conflict,
    config::SAMPLE_CONFIG,
    resolver::RenamePlan,
};

fn plan(target_path: &str, variables: &[(&str, &str)], blocks: &[(&str, &str)]) -> RenamePlan {
    let map = |pairs: &[(&str, &str)]| {
        pairs
            .iter()
            .map(|(old, new)| (old.to_string(), new.to_string()))
            .collect::<LinkedHashMap<_, _>>()
    };
    RenamePlan {
        variable_renames: map(variables),
        block_renames: map(blocks),
        target_extends: "base.html".to_string(),
        target_path: target_path.to_string(),
    }
}

#[test]
fn full_report() {
    let config = Config::from_yaml_str(SAMPLE_CONFIG).unwrap();
    let mut log = MigrationLog::new();
    log.push(MigrationRecord::applied(
        "index.html",
        plan("pages/index.html", &[("user_name", "username"), ("title", "title")], &[("content", "main")]),
        Vec::new(),
    ));
    log.push(MigrationRecord::skipped(
        "other.html",
        Some(plan("pages/index.html", &[], &[])),
        vec![Conflict::PathCollision {
            target_path: "pages/index.html".to_string(),
        }],
    ));
    log.push(MigrationRecord::failed("broken.html", None, "1:1: block 'a' is never closed"));

    let expected = "\
# Jinja Template Migration Report

## Configuration
- Source Directory: ./templates
- Target Directory: ./new_templates
- New Base Template: base.html

## Summary
- Applied: 1
- Skipped: 1
- Failed: 1

## Applied Mappings
### Variable Mappings
| Original | New |
|----------|-----|
| user_name | username |

### Block Mappings
| Original | New |
|----------|-----|
| content | main |

## Migrated Templates
### index.html -> pages/index.html
- Status: applied
- Extends: base.html
- Variables: user_name, title
- Blocks: content

### other.html -> pages/index.html
- Status: skipped
- Extends: base.html
- Variables: None
- Blocks: None
- Conflicts:
  - target path 'pages/index.html' is already used by another template

### broken.html
- Status: failed
- Reason: 1:1: block 'a' is never closed

";
    assert_eq!(expected, render_report(&config, &log, false));
}

#[test]
fn dry_run_without_mappings() {
    let config = Config::from_yaml_str(SAMPLE_CONFIG).unwrap();
    let log = MigrationLog::new();
    let report = render_report(&config, &log, true);

    assert!(report.contains("- Dry run: no files were written\n"));
    assert!(report.contains("## Applied Mappings\nNone\n\n## Migrated Templates\n"));
}

#[test]
fn write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_REPORT_PATH);
    write_report(&path, "# Report\n").unwrap();
    assert_eq!("# Report\n", fs::read_to_string(&path).unwrap());
}
