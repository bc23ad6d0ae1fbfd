use std::{fmt, ops::Range};

/// A parsed template. Concatenating the source text covered by each node's span
/// reproduces the original input exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    pub source_path: String,
    pub nodes: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Text(TextNode),
    Expression(ExpressionNode),
    Block(BlockNode),
    Extends(ExtendsNode),
}

/// Literal content, including comments and any tag the migrator does not rewrite.
#[derive(Clone, Debug, PartialEq)]
pub struct TextNode {
    pub content: String,
    pub span: SourceLocationSpan,
}

/// A `{{ ... }}` expression, or a `{% ... %}` statement such as `if` or `for`, that
/// refers to at least one variable.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionNode {
    pub delimiter: Delimiter,
    pub open_ws: WhitespaceControl,
    /// The verbatim text between the delimiters and whitespace-control markers.
    pub inner: String,
    pub close_ws: WhitespaceControl,
    pub references: Vec<VariableReference>,
    /// Names passed as keyword arguments. These stay as written on rename.
    pub keyword_arguments: Vec<String>,
    pub span: SourceLocationSpan,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableReference {
    pub name: String,
    /// Byte range of the name within [`ExpressionNode::inner`].
    pub range: Range<usize>,
    pub span: SourceLocationSpan,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockNode {
    pub name: String,
    pub open_tag: TagParts,
    pub close_tag: TagParts,
    /// Set when the close tag repeats the block name (`{% endblock content %}`).
    pub close_name: Option<String>,
    pub span_open: SourceLocationSpan,
    pub span_close: SourceLocationSpan,
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExtendsNode {
    pub target_path: String,
    pub quote: char,
    pub tag: TagParts,
    pub span: SourceLocationSpan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delimiter {
    /// `{{ ... }}`
    Expression,
    /// `{% ... %}`
    Statement,
}

/// Whitespace-control marker written directly inside a delimiter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WhitespaceControl {
    #[default]
    None,
    /// `-`
    Trim,
    /// `+`
    Preserve,
}

/// The verbatim pieces of a tag surrounding its rewritable name.
///
/// For `{%- block content scoped %}` this holds the `-` marker on the opening
/// delimiter, `" block "` before the name and `" scoped "` after it. Rendering the
/// parts around the original name gives back the original tag byte-for-byte.
#[derive(Clone, Debug, PartialEq)]
pub struct TagParts {
    pub delimiter: Delimiter,
    pub open_ws: WhitespaceControl,
    pub before: String,
    pub after: String,
    pub close_ws: WhitespaceControl,
}

/// What a discovered name refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Block,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocationSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    /// Byte offset into the source text.
    pub index: usize,
    pub line: usize,
    pub col: usize,
}

impl Node {
    /// The full extent of the node. For blocks this runs from the start of the open
    /// tag to the end of the close tag.
    #[cfg(test)]
    pub fn span(&self) -> SourceLocationSpan {
        match self {
            Node::Text(TextNode { span, .. })
            | Node::Expression(ExpressionNode { span, .. })
            | Node::Extends(ExtendsNode { span, .. }) => span.clone(),
            Node::Block(block) => SourceLocationSpan {
                start: block.span_open.start.clone(),
                end: block.span_close.end.clone(),
            },
        }
    }
}

impl Delimiter {
    pub fn open(self) -> &'static str {
        match self {
            Delimiter::Expression => "{{",
            Delimiter::Statement => "{%",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Delimiter::Expression => "}}",
            Delimiter::Statement => "%}",
        }
    }
}

impl WhitespaceControl {
    pub fn as_str(self) -> &'static str {
        match self {
            WhitespaceControl::None => "",
            WhitespaceControl::Trim => "-",
            WhitespaceControl::Preserve => "+",
        }
    }
}

impl TagParts {
    /// Plain `{% <before><name><after> %}` statement with no whitespace control.
    pub fn statement(before: &str, after: &str) -> TagParts {
        TagParts {
            delimiter: Delimiter::Statement,
            open_ws: WhitespaceControl::None,
            before: before.to_string(),
            after: after.to_string(),
            close_ws: WhitespaceControl::None,
        }
    }

    pub fn render(&self, name: &str) -> String {
        let mut tag = String::with_capacity(self.before.len() + name.len() + self.after.len() + 6);
        tag.push_str(self.delimiter.open());
        tag.push_str(self.open_ws.as_str());
        tag.push_str(&self.before);
        tag.push_str(name);
        tag.push_str(&self.after);
        tag.push_str(self.close_ws.as_str());
        tag.push_str(self.delimiter.close());
        tag
    }
}

impl ExpressionNode {
    /// Renders the tag with every reference replaced by `rename(name)`.
    pub fn render(&self, rename: impl Fn(&str) -> String) -> String {
        let mut tag = String::with_capacity(self.inner.len() + 6);
        tag.push_str(self.delimiter.open());
        tag.push_str(self.open_ws.as_str());

        let mut copied = 0;
        for reference in &self.references {
            tag.push_str(&self.inner[copied..reference.range.start]);
            tag.push_str(&rename(&reference.name));
            copied = reference.range.end;
        }
        tag.push_str(&self.inner[copied..]);

        tag.push_str(self.close_ws.as_str());
        tag.push_str(self.delimiter.close());
        tag
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Variable => f.write_str("variable"),
            SymbolKind::Block => f.write_str("block"),
        }
    }
}

impl SourceLocationSpan {
    #[cfg(test)]
    pub fn range(&self) -> Range<usize> {
        self.start.index..self.end.index
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
