// Copyright (c) Chris Gunn.
// Licensed under the MIT license.


use crate::{
    ast::{ExtendsNode, Node, TagParts, Template},
    resolver::RenamePlan,
};

/// Renders `template` with the renames and inheritance target of `plan` applied.
/// Everything outside expressions, block tags and the extends tag is copied as is.
pub fn rewrite(template: &Template, plan: &RenamePlan) -> String {
    let mut output = String::new();

    let has_extends = template.nodes.iter().any(|node| matches!(node, Node::Extends(_)));
    if !has_extends {
        output.push_str(&format!(
            "{{# Migrated from {} #}}\n",
            template.source_path.replace("#}", "# }")
        ));
        let tag = TagParts::statement(" extends ", " ");
        output.push_str(&tag.render(&quote_literal(&plan.target_extends, '\'')));
        output.push('\n');
    }

    rewrite_nodes(&mut output, &template.nodes, plan);
    output
}

fn rewrite_nodes(output: &mut String, nodes: &[Node], plan: &RenamePlan) {
    for node in nodes {
        match node {
            Node::Text(text) => output.push_str(&text.content),
            Node::Expression(expr) => {
                output.push_str(&expr.render(|name| plan.variable(name).to_string()));
            }
            Node::Block(block) => {
                let name = plan.block(&block.name);
                output.push_str(&block.open_tag.render(name));
                rewrite_nodes(output, &block.body, plan);
                match block.close_name {
                    Some(_) => output.push_str(&block.close_tag.render(name)),
                    None => output.push_str(&block.close_tag.render("")),
                }
            }
            Node::Extends(extends) => output.push_str(&rewrite_extends(extends, &plan.target_extends)),
        }
    }
}

fn rewrite_extends(extends: &ExtendsNode, target: &str) -> String {
    extends.tag.render(&quote_literal(target, extends.quote))
}

/// Prefers `quote`, switching to the other quote character when `target` contains it.
fn quote_literal(target: &str, quote: char) -> String {
    let quote = match target.contains(quote) {
        true if quote == '\'' => '"',
        true => '\'',
        false => quote,
    };
    format!("{}{}{}", quote, target, quote)
}
