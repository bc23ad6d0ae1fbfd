// Copyright (c) Chris Gunn.
// Licensed under the MIT license.


use hashlink::{LinkedHashMap, LinkedHashSet};

use crate::ast::{Node, SourceLocationSpan, Template};

/// The names a template references or defines, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscoverySet {
    pub variables: LinkedHashMap<String, Vec<SourceLocationSpan>>,
    pub blocks: LinkedHashMap<String, BlockSpans>,
    pub extends: Option<String>,
    /// Names used as keyword arguments anywhere in the template.
    pub keyword_arguments: LinkedHashSet<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockSpans {
    pub open: SourceLocationSpan,
    pub close: SourceLocationSpan,
}

pub fn extract(template: &Template) -> DiscoverySet {
    let mut discovery = DiscoverySet::default();
    visit_nodes(&mut discovery, &template.nodes);
    discovery
}

fn visit_nodes(discovery: &mut DiscoverySet, nodes: &[Node]) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Expression(expr) => {
                for reference in &expr.references {
                    match discovery.variables.get_mut(&reference.name) {
                        Some(spans) => spans.push(reference.span.clone()),
                        None => {
                            discovery
                                .variables
                                .insert(reference.name.clone(), vec![reference.span.clone()]);
                        }
                    }
                }
                for name in &expr.keyword_arguments {
                    discovery.keyword_arguments.insert(name.clone());
                }
            }
            Node::Block(block) => {
                let spans = BlockSpans {
                    open: block.span_open.clone(),
                    close: block.span_close.clone(),
                };
                discovery.blocks.insert(block.name.clone(), spans);
                visit_nodes(discovery, &block.body);
            }
            Node::Extends(extends) => {
                discovery.extends = Some(extends.target_path.clone());
            }
        }
    }
}

impl DiscoverySet {
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn block_names(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }
}
