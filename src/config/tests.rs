use super::*;

#[test]
fn sample_config_parses() {
    let config = Config::from_yaml_str(SAMPLE_CONFIG).unwrap();

    assert_eq!(PathBuf::from("./templates"), config.source_dir);
    assert_eq!(PathBuf::from("./new_templates"), config.target_dir);
    assert_eq!("base.html", config.new_base_template);
    assert!(config.auto_preserve_blocks);
    assert!(!config.auto_map_variables);
    assert_eq!(vec!["html".to_string()], config.extensions);
    assert_eq!(Synonyms::default(), config.synonyms);

    assert!(config.is_excluded("old_backup.html"));
    assert!(config.is_excluded("temp_page.html"));
    assert!(!config.is_excluded("pages/temp_page.html"));
    assert!(!config.is_excluded("index.html"));
}

#[test]
fn missing_base_template_is_policy_error() {
    let err = Config::from_yaml_str("source_dir: a\ntarget_dir: b\n").unwrap_err();
    assert_eq!(
        Some(&PolicyError::MissingValue {
            key: "new_base_template"
        }),
        err.downcast_ref::<PolicyError>()
    );
}

#[test]
fn empty_document() {
    let err = Config::from_yaml_str("").unwrap_err();
    assert_eq!(
        Some(&PolicyError::MissingValue { key: "source_dir" }),
        err.downcast_ref::<PolicyError>()
    );
}

#[test]
fn type_errors_name_the_key() {
    let text = "source_dir: a\ntarget_dir: b\nnew_base_template: c\nauto_map_variables: sometimes\n";
    let err = Config::from_yaml_str(text).unwrap_err();
    assert_eq!("'auto_map_variables' must be true or false", err.to_string());

    let text = "source_dir: a\ntarget_dir: b\nnew_base_template: c\nexclude_patterns: '*.html'\n";
    let err = Config::from_yaml_str(text).unwrap_err();
    assert_eq!("'exclude_patterns' must be a list", err.to_string());
}

#[test]
fn invalid_exclude_pattern() {
    let text = "source_dir: a\ntarget_dir: b\nnew_base_template: c\nexclude_patterns: ['(']\n";
    let err = Config::from_yaml_str(text).unwrap_err();
    assert_eq!("invalid exclude pattern '('", err.to_string());
}

#[test]
fn synonyms_and_extensions() {
    let text = "\
source_dir: a
target_dir: b
new_base_template: layouts/base.html
auto_map_variables: true
extensions: [html, jinja2]
variable_synonyms:
  title: heading
";
    let config = Config::from_yaml_str(text).unwrap();

    assert_eq!(vec!["html".to_string(), "jinja2".to_string()], config.extensions);
    assert_eq!(1, config.synonyms.variables.len());
    assert_eq!(Some(&"heading".to_string()), config.synonyms.variables.get("title"));
    assert_eq!(Synonyms::default().blocks, config.synonyms.blocks);

    let policy = config.policy();
    assert!(policy.auto_map_variables);
    assert_eq!("layouts/base.html", policy.new_base_template);
}

#[test]
fn write_and_load_sample() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_PATH);

    write_sample_config(&path).unwrap();
    let config = Config::load(&path).unwrap();
    assert_eq!("base.html", config.new_base_template);

    assert!(write_sample_config(&path).is_err());
}

#[test]
fn load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(&dir.path().join("nope.yaml")).unwrap_err();
    assert!(err.to_string().starts_with("cannot read config file"));
}
