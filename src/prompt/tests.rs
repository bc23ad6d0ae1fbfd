use std::io::Cursor;

use super::*;
use crate::{discovery::extract, parser::parse};

fn interactive(input: &str) -> InteractiveMapping<Cursor<Vec<u8>>, Vec<u8>> {
    InteractiveMapping::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

fn discover(source: &str) -> DiscoverySet {
    extract(&parse("t.html", source).unwrap())
}

fn expect_map(decision: MappingDecision) -> PartialMapping {
    match decision {
        MappingDecision::Map(partial) => partial,
        MappingDecision::Skip => panic!("expected a mapping"),
    }
}

#[test]
fn defaults_at_end_of_input() {
    let mut prompts = interactive("");
    let discovery = discover("{{ user_name }}{% block content %}{% endblock %}");

    let partial = expect_map(prompts.mapping("index.html", &discovery).unwrap());
    assert_eq!("pages/index.html", partial.target_path);
    assert!(partial.variables.is_empty());
    assert!(partial.blocks.is_empty());

    let output = String::from_utf8(prompts.output_mut().clone()).unwrap();
    assert!(output.contains("Template: index.html"));
    assert!(output.contains("  2. Use suggested path (pages/index.html)"));
    assert!(output.contains("Would you like to rename any variables? [y/N]: "));
    assert!(output.contains("Would you like to customize block mappings? [y/N]: "));
}

#[test]
fn custom_path_and_renames() {
    let mut prompts = interactive("3\ncustom/home.html\ny\nusername\nn\n");
    let discovery = discover("{{ user_name }}{% block content %}{% endblock %}");

    let partial = expect_map(prompts.mapping("index.html", &discovery).unwrap());
    assert_eq!("custom/home.html", partial.target_path);
    assert_eq!(Some(&"username".to_string()), partial.variables.get("user_name"));
    assert!(partial.blocks.is_empty());
}

#[test]
fn skip_template() {
    let mut prompts = interactive("4\n");
    let discovery = discover("{{ a }}");
    assert!(matches!(
        prompts.mapping("index.html", &discovery).unwrap(),
        MappingDecision::Skip
    ));
}

#[test]
fn invalid_choice_asks_again() {
    let mut prompts = interactive("9\nabc\n1\n");
    let discovery = discover("");

    let partial = expect_map(prompts.mapping("shop/cart.html", &discovery).unwrap());
    assert_eq!("shop/cart.html", partial.target_path);

    let output = String::from_utf8(prompts.output_mut().clone()).unwrap();
    assert_eq!(2, output.matches("Please enter a number from 1 to 4.").count());
}

#[test]
fn renames_are_remembered() {
    let mut prompts = interactive("2\ny\nmain_content\n2\nn\nn\n");

    let first = discover("{% block content %}{% endblock %}");
    let partial = expect_map(prompts.mapping("a.html", &first).unwrap());
    assert_eq!(Some(&"main_content".to_string()), partial.blocks.get("content"));

    let second = discover("{{ x }}{% block content %}{% endblock %}{% block other %}{% endblock %}");
    let partial = expect_map(prompts.mapping("b.html", &second).unwrap());
    assert_eq!(Some(&"main_content".to_string()), partial.blocks.get("content"));
    assert!(!partial.blocks.contains_key("other"));
}

#[test]
fn confirm_answers() {
    let mut prompts = interactive("yes\nmaybe\nn\n\n");
    assert!(prompts.confirm("Proceed with migration?", false).unwrap());
    assert!(!prompts.confirm("Proceed with migration?", true).unwrap());
    assert!(prompts.confirm("Proceed with migration?", true).unwrap());
    assert!(!prompts.confirm("Proceed with migration?", false).unwrap());
}

#[test]
fn retry_collision() {
    let mut prompts = interactive("1\n\nmenu\n");

    let mut partial = PartialMapping::new("a.html");
    partial.blocks.insert("header".to_string(), "top".to_string());
    partial.blocks.insert("nav".to_string(), "top".to_string());
    let plan = RenamePlan {
        variable_renames: LinkedHashMap::new(),
        block_renames: partial.blocks.clone(),
        target_extends: "base.html".to_string(),
        target_path: "a.html".to_string(),
    };
    let conflicts = vec![Conflict::BlockCollision {
        new_name: "top".to_string(),
        old_names: vec!["header".to_string(), "nav".to_string()],
    }];

    let decision = prompts.resolve_conflicts("a.html", &partial, &plan, &conflicts).unwrap();
    let ConflictDecision::Retry(next) = decision else {
        panic!("expected retry");
    };
    assert_eq!(Some(&"top".to_string()), next.blocks.get("header"));
    assert_eq!(Some(&"menu".to_string()), next.blocks.get("nav"));
}

#[test]
fn conflict_default_is_skip() {
    let mut prompts = interactive("");
    let partial = PartialMapping::new("a.html");
    let plan = RenamePlan {
        variable_renames: LinkedHashMap::new(),
        block_renames: LinkedHashMap::new(),
        target_extends: "base.html".to_string(),
        target_path: "a.html".to_string(),
    };
    let conflicts = vec![Conflict::PathCollision {
        target_path: "a.html".to_string(),
    }];

    let decision = prompts.resolve_conflicts("a.html", &partial, &plan, &conflicts).unwrap();
    assert!(matches!(decision, ConflictDecision::Skip));
}
