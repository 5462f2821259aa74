use std::num::ParseIntError;

use thiserror::Error;

use crate::lang::NodeId;

/// Failures of the literal encoding helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("Escape character at end of string")]
    TrailingEscape,

    #[error("String is too long to convert: at most {max} characters can be packed")]
    StringTooLong { max: usize },

    #[error("String contains non-ASCII character '{0}'")]
    NonAsciiCharacter(char),

    /// Digits of a hex or binary literal could not be parsed.
    #[error("Malformed numeric literal: {0}")]
    MalformedNumber(#[from] ParseIntError),
}

/// Every way the semantic pass can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("'{name}' is not defined")]
    UndefinedIdentifier { name: String },

    #[error("'{name}' is already defined")]
    DuplicateDeclaration { name: String },

    #[error("Constant '{name}' must have a compile time known value")]
    NonConstantInitializer { name: String },

    #[error("Void method '{name}' used as an expression")]
    VoidValueUsed { name: String },

    #[error("No free register left ({capacity} registers in use)")]
    RegisterExhausted { capacity: usize },

    /// Rendering was requested for a node that has neither a register nor a value.
    #[error("Expression has no variable or constant value")]
    UnboundExpression,

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// The first failure of a traversal, pinned to the node that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error} (node {node}, index {index_in_scope})")]
pub struct Diagnostic {
    pub node: NodeId,
    pub index_in_scope: usize,
    #[source]
    pub error: FlowError,
}

pub type FlowResult<T> = Result<T, FlowError>;
