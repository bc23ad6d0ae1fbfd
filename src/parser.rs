mod tag_parser;

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use crate::{
    ast::{
        BlockNode, Delimiter, ExpressionNode, ExtendsNode, Node, SourceLocation, SourceLocationSpan, TagParts,
        Template, TextNode, VariableReference, WhitespaceControl,
    },
    error::{ParseError, ParseErrorKind},
};

pub use tag_parser::{is_identifier, is_reserved_name};

use tag_parser::{TagContent, TagParser, TagReferences};

pub struct Parser {
    tag_parser: TagParser,
}

impl Parser {
    pub fn new() -> Parser {
        let tag_parser = TagParser::new();
        Parser { tag_parser }
    }

    pub fn parse(&self, source_path: &str, input: &str) -> Result<Template, ParseError> {
        let mut run = ParserRun::new(self, input);
        let (nodes, _) = run.parse_nodes(None)?;
        let template = Template {
            source_path: source_path.to_string(),
            nodes,
        };
        Ok(template)
    }
}

/// Parses a template with a freshly built [`Parser`].
pub fn parse(source_path: &str, input: &str) -> Result<Template, ParseError> {
    Parser::new().parse(source_path, input)
}

struct ParserRun<'a> {
    tag_parser: &'a TagParser,
    input: &'a str,
    line_starts: Vec<usize>,
    pos: usize,
    block_names: HashSet<String>,
    // Set once anything but whitespace and comments has been seen at the top level.
    content_seen: bool,
}

/// A delimited construct located in the input. `start` and `end` cover the
/// delimiters; `inner` excludes them and any whitespace-control markers.
struct RawTag<'a> {
    start: usize,
    end: usize,
    inner_start: usize,
    open_ws: WhitespaceControl,
    close_ws: WhitespaceControl,
    inner: &'a str,
}

struct OpenBlock {
    name: String,
    location: SourceLocation,
}

struct CloseTag {
    tag: TagParts,
    name: Option<String>,
    span: SourceLocationSpan,
}

impl<'a> ParserRun<'a> {
    fn new(parser: &'a Parser, input: &'a str) -> ParserRun<'a> {
        let line_starts = std::iter::once(0)
            .chain(input.match_indices('\n').map(|(index, _)| index + 1))
            .collect();
        ParserRun {
            tag_parser: &parser.tag_parser,
            input,
            line_starts,
            pos: 0,
            block_names: HashSet::new(),
            content_seen: false,
        }
    }

    /// Parses nodes up to the end of input or, inside a block, up to its endblock tag.
    fn parse_nodes(&mut self, open_block: Option<&OpenBlock>) -> Result<(Vec<Node>, Option<CloseTag>), ParseError> {
        let mut nodes = Vec::new();
        let mut text_start = self.pos;

        loop {
            // Find next template construct.
            let Some(delim_index) = self.find_delimiter(self.pos) else {
                if open_block.is_some() {
                    return Ok((nodes, None));
                }
                self.note_text(self.pos, self.input.len());
                self.pos = self.input.len();
                self.push_text(&mut nodes, text_start, self.pos);
                return Ok((nodes, None));
            };

            self.note_text(self.pos, delim_index);

            match self.input.as_bytes()[delim_index + 1] {
                b'#' => {
                    self.pos = self.scan_comment(delim_index)?;
                }
                b'{' => {
                    let tag = self.scan_tag(delim_index, Delimiter::Expression)?;
                    self.content_seen = true;
                    self.pos = tag.end;

                    let references = self
                        .tag_parser
                        .expression(tag.inner)
                        .map_err(|kind| self.error(kind, tag.start))?;
                    if !references.variables.is_empty() {
                        self.push_text(&mut nodes, text_start, tag.start);
                        nodes.push(Node::Expression(self.expression(&tag, Delimiter::Expression, references)));
                        text_start = self.pos;
                    }
                }
                _ => {
                    let tag = self.scan_tag(delim_index, Delimiter::Statement)?;
                    let content = self
                        .tag_parser
                        .classify(tag.inner)
                        .map_err(|kind| self.error(kind, tag.start))?;

                    match content {
                        TagContent::BlockOpen { name, name_range } => {
                            if !self.block_names.insert(name.clone()) {
                                return Err(self.error(ParseErrorKind::DuplicateBlockName { name }, tag.start));
                            }

                            self.push_text(&mut nodes, text_start, tag.start);
                            self.content_seen = true;
                            self.pos = tag.end;

                            let open = OpenBlock {
                                name,
                                location: self.location(tag.start),
                            };
                            let (body, close) = self.parse_nodes(Some(&open))?;
                            let Some(close) = close else {
                                return Err(ParseError {
                                    kind: ParseErrorKind::UnterminatedBlock { name: open.name },
                                    location: open.location,
                                });
                            };

                            let block = BlockNode {
                                name: open.name,
                                open_tag: Self::tag_parts(&tag, Delimiter::Statement, name_range.start, name_range.end),
                                close_tag: close.tag,
                                close_name: close.name,
                                span_open: self.span(tag.start, tag.end),
                                span_close: close.span,
                                body,
                            };
                            nodes.push(Node::Block(block));
                            text_start = self.pos;
                        }
                        TagContent::BlockClose { name } => {
                            let Some(open) = open_block else {
                                return Err(self.error(ParseErrorKind::UnmatchedEndBlock, tag.start));
                            };

                            let (tag_parts, close_name) = match name {
                                Some((name, _)) if name != open.name => {
                                    let kind = ParseErrorKind::MismatchedEndBlock {
                                        expected: open.name.clone(),
                                        found: name,
                                    };
                                    return Err(self.error(kind, tag.start));
                                }
                                Some((name, range)) => (
                                    Self::tag_parts(&tag, Delimiter::Statement, range.start, range.end),
                                    Some(name),
                                ),
                                None => (
                                    Self::tag_parts(&tag, Delimiter::Statement, tag.inner.len(), tag.inner.len()),
                                    None,
                                ),
                            };

                            self.push_text(&mut nodes, text_start, tag.start);
                            self.pos = tag.end;
                            let close = CloseTag {
                                tag: tag_parts,
                                name: close_name,
                                span: self.span(tag.start, tag.end),
                            };
                            return Ok((nodes, Some(close)));
                        }
                        TagContent::Extends {
                            target,
                            quote,
                            literal_range,
                        } => {
                            if open_block.is_some() || self.content_seen {
                                return Err(self.error(ParseErrorKind::MalformedExtends, tag.start));
                            }

                            self.push_text(&mut nodes, text_start, tag.start);
                            self.content_seen = true;
                            self.pos = tag.end;

                            let extends = ExtendsNode {
                                target_path: target,
                                quote,
                                tag: Self::tag_parts(&tag, Delimiter::Statement, literal_range.start, literal_range.end),
                                span: self.span(tag.start, tag.end),
                            };
                            nodes.push(Node::Extends(extends));
                            text_start = self.pos;
                        }
                        TagContent::Statement(references) => {
                            self.content_seen = true;
                            self.pos = tag.end;
                            if !references.variables.is_empty() {
                                self.push_text(&mut nodes, text_start, tag.start);
                                nodes.push(Node::Expression(self.expression(&tag, Delimiter::Statement, references)));
                                text_start = self.pos;
                            }
                        }
                        TagContent::RawOpen => {
                            self.content_seen = true;
                            self.pos = self.scan_raw(tag.start, tag.end)?;
                        }
                        TagContent::Other => {
                            self.content_seen = true;
                            self.pos = tag.end;
                        }
                    }
                }
            }
        }
    }

    fn find_delimiter(&self, from: usize) -> Option<usize> {
        let bytes = self.input.as_bytes();
        let mut index = from;
        while let Some(offset) = self.input[index..].find('{') {
            let brace = index + offset;
            match bytes.get(brace + 1) {
                Some(b'{') | Some(b'%') | Some(b'#') => return Some(brace),
                _ => index = brace + 1,
            }
        }
        None
    }

    /// Reads a `{{ }}` or `{% %}` construct starting at `start`. Closing delimiters
    /// inside quoted strings do not end the construct.
    fn scan_tag(&self, start: usize, delimiter: Delimiter) -> Result<RawTag<'a>, ParseError> {
        let bytes = self.input.as_bytes();
        let unterminated = match delimiter {
            Delimiter::Expression => ParseErrorKind::UnterminatedExpression,
            Delimiter::Statement => ParseErrorKind::UnterminatedTag,
        };
        let close = delimiter.close().as_bytes();

        let mut inner_start = start + 2;
        let open_ws = Self::whitespace_control(bytes.get(inner_start));
        if open_ws != WhitespaceControl::None {
            inner_start += 1;
        }

        let mut index = inner_start;
        loop {
            match bytes.get(index) {
                None => return Err(self.error(unterminated, start)),
                Some(b'\'') | Some(b'"') => {
                    let Some(string_end) = skip_string(bytes, index) else {
                        return Err(self.error(unterminated, start));
                    };
                    index = string_end;
                }
                Some(_) if bytes[index..].starts_with(close) => break,
                Some(_) => index += 1,
            }
        }

        let mut inner_end = index;
        let close_ws = match inner_end > inner_start {
            true => Self::whitespace_control(bytes.get(inner_end - 1)),
            false => WhitespaceControl::None,
        };
        if close_ws != WhitespaceControl::None {
            inner_end -= 1;
        }

        let tag = RawTag {
            start,
            end: index + close.len(),
            inner_start,
            open_ws,
            close_ws,
            inner: &self.input[inner_start..inner_end],
        };
        Ok(tag)
    }

    fn scan_comment(&self, start: usize) -> Result<usize, ParseError> {
        match find_bytes(&self.input.as_bytes()[start + 2..], b"#}") {
            Some(offset) => Ok(start + 2 + offset + 2),
            None => Err(self.error(ParseErrorKind::UnterminatedComment, start)),
        }
    }

    /// Skips the body of a `{% raw %}` region, returning the end of its endraw tag.
    fn scan_raw(&self, raw_start: usize, body_start: usize) -> Result<usize, ParseError> {
        let bytes = self.input.as_bytes();
        let mut index = body_start;
        loop {
            let Some(offset) = find_bytes(&bytes[index..], b"{%") else {
                return Err(self.error(ParseErrorKind::UnterminatedTag, raw_start));
            };
            let tag_start = index + offset;
            let Some(close_offset) = find_bytes(&bytes[tag_start + 2..], b"%}") else {
                return Err(self.error(ParseErrorKind::UnterminatedTag, raw_start));
            };
            let tag_end = tag_start + 2 + close_offset + 2;

            let inner = self.input[tag_start + 2..tag_end - 2]
                .trim_start_matches(|c| c == '-' || c == '+')
                .trim_end_matches(|c| c == '-' || c == '+')
                .trim();
            if inner == "endraw" {
                return Ok(tag_end);
            }
            index = tag_start + 2;
        }
    }

    fn whitespace_control(byte: Option<&u8>) -> WhitespaceControl {
        match byte {
            Some(b'-') => WhitespaceControl::Trim,
            Some(b'+') => WhitespaceControl::Preserve,
            _ => WhitespaceControl::None,
        }
    }

    /// Splits a tag around the byte range `name_start..name_end` of its inner text.
    fn tag_parts(tag: &RawTag, delimiter: Delimiter, name_start: usize, name_end: usize) -> TagParts {
        TagParts {
            delimiter,
            open_ws: tag.open_ws,
            before: tag.inner[..name_start].to_string(),
            after: tag.inner[name_end..].to_string(),
            close_ws: tag.close_ws,
        }
    }

    fn expression(&self, tag: &RawTag, delimiter: Delimiter, references: TagReferences) -> ExpressionNode {
        let variables = references
            .variables
            .into_iter()
            .map(|(name, range)| {
                let span = self.span(tag.inner_start + range.start, tag.inner_start + range.end);
                VariableReference { name, range, span }
            })
            .collect();

        ExpressionNode {
            delimiter,
            open_ws: tag.open_ws,
            close_ws: tag.close_ws,
            inner: tag.inner.to_string(),
            references: variables,
            keyword_arguments: references.keyword_arguments,
            span: self.span(tag.start, tag.end),
        }
    }

    fn note_text(&mut self, start: usize, end: usize) {
        if !self.input[start..end].trim().is_empty() {
            self.content_seen = true;
        }
    }

    fn push_text(&self, nodes: &mut Vec<Node>, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let text = TextNode {
            content: self.input[start..end].to_string(),
            span: self.span(start, end),
        };
        nodes.push(Node::Text(text));
    }

    fn error(&self, kind: ParseErrorKind, index: usize) -> ParseError {
        ParseError {
            kind,
            location: self.location(index),
        }
    }

    fn span(&self, start: usize, end: usize) -> SourceLocationSpan {
        SourceLocationSpan {
            start: self.location(start),
            end: self.location(end),
        }
    }

    fn location(&self, index: usize) -> SourceLocation {
        let line = self.line_starts.partition_point(|line_start| *line_start <= index);
        let line_start = self.line_starts[line - 1];
        SourceLocation {
            index,
            line,
            col: self.input[line_start..index].chars().count() + 1,
        }
    }
}

/// Returns the index just past the string literal opening at `start`. A backslash
/// escapes the next byte.
fn skip_string(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut index = start + 1;
    while let Some(&byte) = bytes.get(index) {
        match byte {
            b'\\' => index += 2,
            _ if byte == quote => return Some(index + 1),
            _ => index += 1,
        }
    }
    None
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
