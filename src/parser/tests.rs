use std::{fs, path::Path};

use proptest::prelude::*;

use super::*;

macro_rules! testlist {
    ($($name:ident,)*) => {
    $(
        #[test]
        fn $name() {
            run_test(stringify!($name))
        }
    )*
    }
}

testlist! {
    block_nested,
    concatenation,
    duplicate_block,
    extends_after_comment,
    extends_after_content,
    for_loop,
    mismatched_endblock,
    raw_and_other_tags,
    simple_expression,
    statement_references,
    unmatched_endblock,
    unterminated_block,
    unterminated_expression,
}

fn run_test(name: &str) {
    let rootdir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let test_data_dir = rootdir.join("src/parser/tests/testdata");

    let test_file = test_data_dir.join(format!("tests/{}.html", name));
    let expected_file = test_data_dir.join(format!("expected/{}.txt", name));
    let actual_dir = test_data_dir.join("actual");
    let actual_file = actual_dir.join(format!("{}.txt", name));

    let test = fs::read_to_string(test_file).unwrap();

    let parser = Parser::new();
    let result = parser.parse(name, &test);
    let actual = format_result(result);

    fs::create_dir_all(actual_dir).unwrap();
    fs::write(actual_file, &actual).unwrap();

    let expected = fs::read_to_string(expected_file).unwrap();
    assert_eq!(expected, actual);
}

fn format_result(result: Result<Template, ParseError>) -> String {
    let mut string = String::new();

    string.push_str("ERROR: ");

    let template = match result {
        Ok(template) => template,
        Err(err) => {
            string.push_str(&err.to_string());
            return string;
        }
    };

    string.push_str("<None>\n");
    format_nodes(&mut string, &template.nodes, 0);
    string
}

fn format_nodes(string: &mut String, nodes: &[Node], depth: usize) {
    for node in nodes {
        let span = node.span();
        string.push_str(&"  ".repeat(depth));
        string.push_str(&format!("{}-{} ", span.start, span.end));

        match node {
            Node::Text(text) => string.push_str(&format!("text {:?}\n", text.content)),
            Node::Expression(expr) => {
                let kind = match expr.delimiter {
                    Delimiter::Expression => "expr",
                    Delimiter::Statement => "stmt",
                };
                let names = expr.references.iter().map(|reference| reference.name.as_str()).collect::<Vec<_>>();
                string.push_str(&format!("{} {}\n", kind, names.join(", ")));
            }
            Node::Extends(extends) => {
                string.push_str(&format!("extends {}{}{}\n", extends.quote, extends.target_path, extends.quote))
            }
            Node::Block(block) => {
                match &block.close_name {
                    Some(close_name) => string.push_str(&format!("block {} (endblock {})\n", block.name, close_name)),
                    None => string.push_str(&format!("block {} (endblock)\n", block.name)),
                }
                format_nodes(string, &block.body, depth + 1);
            }
        }
    }
}

/// Rebuilds source text from the model alone.
fn render_nodes(nodes: &[Node]) -> String {
    let mut string = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => string.push_str(&text.content),
            Node::Expression(expr) => string.push_str(&expr.render(|name| name.to_string())),
            Node::Extends(extends) => {
                let literal = format!("{}{}{}", extends.quote, extends.target_path, extends.quote);
                string.push_str(&extends.tag.render(&literal));
            }
            Node::Block(block) => {
                string.push_str(&block.open_tag.render(&block.name));
                string.push_str(&render_nodes(&block.body));
                string.push_str(&block.close_tag.render(block.close_name.as_deref().unwrap_or("")));
            }
        }
    }
    string
}

#[test]
fn whitespace_control_markers() {
    let input = "{%- block a -%}{{- x +}}{%+ endblock a -%}";
    let template = parse_str(input);

    let Node::Block(block) = &template.nodes[0] else {
        panic!("expected block");
    };
    assert_eq!(WhitespaceControl::Trim, block.open_tag.open_ws);
    assert_eq!(" block ", block.open_tag.before);
    assert_eq!(" ", block.open_tag.after);
    assert_eq!(WhitespaceControl::Trim, block.open_tag.close_ws);
    assert_eq!(WhitespaceControl::Preserve, block.close_tag.open_ws);
    assert_eq!(Some("a".to_string()), block.close_name);

    let Node::Expression(expr) = &block.body[0] else {
        panic!("expected expression");
    };
    assert_eq!("x", expr.references[0].name);
    assert_eq!(" x ", expr.inner);
    assert_eq!(WhitespaceControl::Trim, expr.open_ws);
    assert_eq!(WhitespaceControl::Preserve, expr.close_ws);

    assert_eq!(input, render_nodes(&template.nodes));
}

#[test]
fn quoted_delimiters_do_not_close_tags() {
    let input = "{{ title ~ '}}' }}{% if x == \"%}\" %}y{% endif %}";
    let template = parse_str(input);

    assert_eq!(3, template.nodes.len());
    let Node::Expression(expr) = &template.nodes[0] else {
        panic!("expected expression");
    };
    assert_eq!("title", expr.references[0].name);
    assert_eq!(0..18, expr.span.range());

    let Node::Expression(stmt) = &template.nodes[1] else {
        panic!("expected statement");
    };
    assert_eq!(Delimiter::Statement, stmt.delimiter);
    assert_eq!("x", stmt.references[0].name);
}

#[test]
fn escaped_quotes_in_strings() {
    let input = r#"{{ 'it\'s %} }}' ~ name }}"#;
    let template = parse_str(input);
    let Node::Expression(expr) = &template.nodes[0] else {
        panic!("expected expression");
    };
    assert_eq!(input.len(), expr.span.end.index);
    assert_eq!("name", expr.references[0].name);
}

#[test]
fn reference_spans() {
    let template = parse_str("ab\n{% if x and y %}{% endif %}");
    let Node::Expression(stmt) = &template.nodes[1] else {
        panic!("expected statement");
    };
    let spans = stmt
        .references
        .iter()
        .map(|reference| (reference.span.start.line, reference.span.start.col, reference.span.range()))
        .collect::<Vec<_>>();
    assert_eq!(vec![(2, 7, 9..10), (2, 13, 15..16)], spans);
}

#[test]
fn statement_without_references_is_text() {
    let template = parse_str("{% if true %}a{% endif %}");
    assert_eq!(1, template.nodes.len());
    assert!(matches!(&template.nodes[0], Node::Text(_)));
}

#[test]
fn unterminated_comment() {
    let err = Parser::new().parse("t", "a\n{# note").unwrap_err();
    assert_eq!(ParseErrorKind::UnterminatedComment, err.kind);
    assert_eq!(2, err.location.line);
    assert_eq!(1, err.location.col);
}

#[test]
fn unterminated_raw() {
    let err = Parser::new().parse("t", "{% raw %}{{ x }}").unwrap_err();
    assert_eq!(ParseErrorKind::UnterminatedTag, err.kind);
}

#[test]
fn extends_inside_block() {
    let err = Parser::new()
        .parse("t", "{% block a %}{% extends 'b.html' %}{% endblock %}")
        .unwrap_err();
    assert_eq!(ParseErrorKind::MalformedExtends, err.kind);
    assert_eq!(14, err.location.col);
}

#[test]
fn columns_count_chars() {
    let template = parse_str("héllo {{ name }}");
    let Node::Expression(expr) = &template.nodes[1] else {
        panic!("expected expression");
    };
    assert_eq!(7, expr.span.start.col);
    assert_eq!(7, expr.span.start.index);
}

#[test]
fn empty_input() {
    let template = parse_str("");
    assert!(template.nodes.is_empty());
}

fn parse_str(input: &str) -> Template {
    Parser::new().parse("test.html", input).unwrap()
}

const FRAGMENTS: &[&str] = &[
    "hello ",
    "\n",
    "é ",
    "{ ",
    "}} ",
    "{{ a }}",
    "{{b|upper}}",
    "{{- c -}}",
    "{{ 'lit' }}",
    "{# note #}",
    "{% if a %}",
    "{% for x in a|sort %}",
    "{{ 'p' ~ a ~ b }}",
    "{% set c = a %}",
    "{% endif %}",
    "{% endfor %}",
    "{% raw %}{{ hidden }}{% endraw %}",
];

fn fragments() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..8).prop_map(|parts| parts.concat())
}

fn template_source() -> impl Strategy<Value = String> {
    (fragments(), prop::collection::vec((fragments(), any::<bool>()), 0..4), fragments()).prop_map(
        |(head, blocks, tail)| {
            let mut source = head;
            for (index, (body, named_close)) in blocks.into_iter().enumerate() {
                source.push_str(&format!("{{% block b{} %}}", index));
                source.push_str(&body);
                match named_close {
                    true => source.push_str(&format!("{{%- endblock b{} %}}", index)),
                    false => source.push_str("{% endblock %}"),
                }
            }
            source.push_str(&tail);
            source
        },
    )
}

proptest! {
    #[test]
    fn spans_cover_input(source in template_source()) {
        let template = parse_str(&source);
        let mut index = 0;
        for node in &template.nodes {
            let range = node.span().range();
            prop_assert_eq!(index, range.start);
            index = range.end;
        }
        prop_assert_eq!(source.len(), index);
    }

    #[test]
    fn model_reproduces_input(source in template_source()) {
        let template = parse_str(&source);
        prop_assert_eq!(source, render_nodes(&template.nodes));
    }
}
