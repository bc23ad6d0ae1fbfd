// Copyright (c) Chris Gunn.
// Licensed under the MIT license.


use std::{iter, ops::Range};

use chumsky::{prelude::*, text::TextParser};

use crate::error::ParseErrorKind;

/// Literals and operators that can appear in an expression without being a variable.
const KEYWORDS: &[&str] = &[
    "true", "false", "none", "True", "False", "None", "and", "or", "not", "in", "is", "if", "else",
];

/// Names the template engine provides itself. They are never discovered as
/// variables and never accepted as rename targets.
const BUILTIN_NAMES: &[&str] = &[
    "loop", "self", "super", "caller", "varargs", "kwargs", "range", "lipsum", "dict", "cycler", "joiner",
    "namespace",
];

/// Words with a fixed meaning inside statement tags only.
const STATEMENT_KEYWORDS: &[&str] = &[
    "as", "import", "from", "with", "without", "context", "ignore", "missing", "recursive",
];

/// Statements whose bodies are scanned for variable references.
const REFERENCE_STATEMENTS: &[&str] = &[
    "if", "elif", "for", "set", "with", "macro", "call", "include", "import", "from",
];

/// The meaning of the text between a `{%` and `%}` pair. Ranges are byte offsets
/// into that text.
#[derive(Clone, Debug, PartialEq)]
pub enum TagContent {
    BlockOpen { name: String, name_range: Range<usize> },
    BlockClose { name: Option<(String, Range<usize>)> },
    Extends { target: String, quote: char, literal_range: Range<usize> },
    Statement(TagReferences),
    RawOpen,
    Other,
}

/// The names an expression or statement body refers to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagReferences {
    /// Variable references with their byte ranges, in source order.
    pub variables: Vec<(String, Range<usize>)>,
    /// Names passed as keyword arguments (`f(name=...)`).
    pub keyword_arguments: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Name(String),
    Literal,
    Dot,
    Pipe,
    Assign,
    LParen,
    RParen,
    Other,
}

type NameParser = Box<dyn Parser<char, (String, Range<usize>), Error = Simple<char>>>;

pub struct TagParser {
    lexer: Box<dyn Parser<char, Vec<(Token, Range<usize>)>, Error = Simple<char>>>,
    block_open: NameParser,
    block_close: Box<dyn Parser<char, Option<(String, Range<usize>)>, Error = Simple<char>>>,
    extends: Box<dyn Parser<char, (char, String, Range<usize>), Error = Simple<char>>>,
    raw: Box<dyn Parser<char, (), Error = Simple<char>>>,
}

impl TagParser {
    pub fn new() -> TagParser {
        TagParser {
            lexer: Box::new(gen_lexer()),
            block_open: Box::new(gen_block_open_parser()),
            block_close: Box::new(gen_block_close_parser()),
            extends: Box::new(gen_extends_parser()),
            raw: Box::new(gen_raw_parser()),
        }
    }

    /// Finds the variables an expression body refers to.
    pub fn expression(&self, inner: &str) -> Result<TagReferences, ParseErrorKind> {
        self.references(inner, false)
    }

    pub fn classify(&self, inner: &str) -> Result<TagContent, ParseErrorKind> {
        match leading_keyword(inner) {
            "block" => {
                let (name, span) = self.block_open.parse(inner).map_err(|_| ParseErrorKind::MalformedBlock)?;
                let name_range = byte_range(inner, span);
                Ok(TagContent::BlockOpen { name, name_range })
            }
            "endblock" => {
                let name = self.block_close.parse(inner).map_err(|_| ParseErrorKind::MalformedBlock)?;
                let name = name.map(|(name, span)| (name, byte_range(inner, span)));
                Ok(TagContent::BlockClose { name })
            }
            "extends" => {
                let (quote, target, span) = self.extends.parse(inner).map_err(|_| ParseErrorKind::MalformedExtends)?;
                let literal_range = byte_range(inner, span);
                Ok(TagContent::Extends {
                    target,
                    quote,
                    literal_range,
                })
            }
            "raw" if self.raw.parse(inner).is_ok() => Ok(TagContent::RawOpen),
            keyword if REFERENCE_STATEMENTS.contains(&keyword) => {
                let references = self.references(inner, true)?;
                Ok(TagContent::Statement(references))
            }
            _ => Ok(TagContent::Other),
        }
    }

    /// Picks the variable references out of a tag body. Attribute names, filter and
    /// test names, keyword argument names and keywords are not references. In a
    /// statement the leading keyword is skipped too.
    fn references(&self, inner: &str, statement: bool) -> Result<TagReferences, ParseErrorKind> {
        let tokens = self.lexer.parse(inner).map_err(|_| ParseErrorKind::MalformedTag)?;
        let offsets = char_offsets(inner);
        let macro_signature = statement && leading_keyword(inner) == "macro";

        let mut references = TagReferences::default();
        // Per open parenthesis: whether it holds call arguments.
        let mut parens = Vec::new();
        let mut signature_seen = false;

        for (index, (token, span)) in tokens.iter().enumerate() {
            let previous = |back: usize| index.checked_sub(back).map(|index| &tokens[index].0);
            match token {
                Token::LParen if macro_signature && !signature_seen => {
                    signature_seen = true;
                    parens.push(false);
                }
                Token::LParen => {
                    let call = matches!(previous(1), Some(Token::Name(_)) | Some(Token::RParen));
                    parens.push(call);
                }
                Token::RParen => {
                    parens.pop();
                }
                Token::Name(name) => {
                    let keyword = is_expression_keyword(name)
                        || (statement && (index == 0 || STATEMENT_KEYWORDS.contains(&name.as_str())));
                    let member = matches!(previous(1), Some(Token::Dot) | Some(Token::Pipe));
                    let test = is_name(previous(1), "is") || (is_name(previous(1), "not") && is_name(previous(2), "is"));
                    let keyword_argument =
                        parens.last() == Some(&true) && matches!(tokens.get(index + 1), Some((Token::Assign, _)));

                    if keyword_argument {
                        references.keyword_arguments.push(name.clone());
                    } else if !(keyword || member || test) {
                        let range = offsets[span.start]..offsets[span.end];
                        references.variables.push((name.clone(), range));
                    }
                }
                _ => {}
            }
        }
        Ok(references)
    }
}

pub fn is_reserved_name(name: &str) -> bool {
    is_expression_keyword(name) || STATEMENT_KEYWORDS.contains(&name)
}

fn is_expression_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name) || BUILTIN_NAMES.contains(&name)
}

fn is_name(token: Option<&Token>, expected: &str) -> bool {
    matches!(token, Some(Token::Name(name)) if name == expected)
}

/// Whether `name` is a plain ASCII identifier. Only these are accepted as new names.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn leading_keyword(inner: &str) -> &str {
    let trimmed = inner.trim_start();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

// chumsky reports spans in chars.
fn byte_range(text: &str, span: Range<usize>) -> Range<usize> {
    byte_offset(text, span.start)..byte_offset(text, span.end)
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices().nth(char_index).map_or(text.len(), |(index, _)| index)
}

/// Byte offset of every char index, plus one past the end.
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(index, _)| index)
        .chain(iter::once(text.len()))
        .collect()
}

fn gen_lexer() -> impl Parser<char, Vec<(Token, Range<usize>)>, Error = Simple<char>> {
    let string = |quote: char| {
        just(quote)
            .ignore_then(
                just('\\')
                    .ignore_then(any())
                    .or(filter(move |c: &char| *c != quote && *c != '\\'))
                    .repeated(),
            )
            .then_ignore(just(quote))
            .to(Token::Literal)
            .labelled("string")
    };

    let number = filter(|c: &char| c.is_ascii_digit())
        .ignore_then(filter(|c: &char| c.is_alphanumeric() || *c == '_' || *c == '.').repeated())
        .to(Token::Literal)
        .labelled("number");

    // Unlike `text::ident`, names may contain any alphanumeric char.
    let name = filter(|c: &char| c.is_alphabetic() || *c == '_')
        .then(filter(|c: &char| c.is_alphanumeric() || *c == '_').repeated())
        .map(|(first, rest)| Token::Name(iter::once(first).chain(rest).collect()));

    let compare = just("==").or(just("!=")).or(just("<=")).or(just(">=")).to(Token::Other);

    let ctrl = one_of(".|=()").map(|c| match c {
        '.' => Token::Dot,
        '|' => Token::Pipe,
        '=' => Token::Assign,
        '(' => Token::LParen,
        _ => Token::RParen,
    });

    let other = filter(|c: &char| !c.is_whitespace()).to(Token::Other);

    let token = string('\'')
        .or(string('"'))
        .or(number)
        .or(name)
        .or(compare)
        .or(ctrl)
        .or(other);

    text::whitespace()
        .ignore_then(
            token
                .map_with_span(|token, span| (token, span))
                .then_ignore(text::whitespace())
                .repeated(),
        )
        .then_ignore(end())
}

fn gen_block_open_parser() -> impl Parser<char, (String, Range<usize>), Error = Simple<char>> {
    let modifier = text::keyword("scoped").or(text::keyword("required")).padded();

    text::keyword("block")
        .padded()
        .ignore_then(text::ident().map_with_span(|name, span| (name, span)))
        .then_ignore(modifier.repeated())
        .then_ignore(text::whitespace())
        .then_ignore(end())
}

fn gen_block_close_parser() -> impl Parser<char, Option<(String, Range<usize>)>, Error = Simple<char>> {
    text::keyword("endblock")
        .padded()
        .ignore_then(text::ident().map_with_span(|name, span| (name, span)).or_not())
        .then_ignore(text::whitespace())
        .then_ignore(end())
}

fn gen_extends_parser() -> impl Parser<char, (char, String, Range<usize>), Error = Simple<char>> {
    let quoted = |quote: char| {
        just(quote)
            .ignore_then(filter(move |c: &char| *c != quote && *c != '\n').repeated())
            .then_ignore(just(quote))
            .collect::<String>()
            .map(move |target| (quote, target))
    };

    let literal = quoted('\'')
        .or(quoted('"'))
        .map_with_span(|(quote, target), span| (quote, target, span))
        .labelled("string");

    text::keyword("extends")
        .padded()
        .ignore_then(literal)
        .then_ignore(text::whitespace())
        .then_ignore(end())
}

fn gen_raw_parser() -> impl Parser<char, (), Error = Simple<char>> {
    text::keyword("raw").padded().then_ignore(end())
}
