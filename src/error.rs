use thiserror::Error;

use crate::ast::{SourceLocation, SymbolKind};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{location}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("block '{name}' is never closed")]
    UnterminatedBlock { name: String },
    #[error("expression is missing its closing '}}}}'")]
    UnterminatedExpression,
    #[error("tag is missing its closing '%}}'")]
    UnterminatedTag,
    #[error("comment is missing its closing '#}}'")]
    UnterminatedComment,
    #[error("block '{name}' is defined more than once")]
    DuplicateBlockName { name: String },
    #[error("extends must be a single string literal before any other content")]
    MalformedExtends,
    #[error("tag contents could not be read")]
    MalformedTag,
    #[error("block tag needs a name and only accepts 'scoped' or 'required'")]
    MalformedBlock,
    #[error("endblock without a matching block")]
    UnmatchedEndBlock,
    #[error("endblock names '{found}' but closes block '{expected}'")]
    MismatchedEndBlock { expected: String, found: String },
}

/// Configuration or mapping input that makes the whole run unusable.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("configuration value '{key}' is required")]
    MissingValue { key: &'static str },
    #[error("{kind} '{name}' is mapped to an empty name")]
    EmptyRename { kind: SymbolKind, name: String },
    #[error("no target path was chosen")]
    MissingTargetPath,
}
