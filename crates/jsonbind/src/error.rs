//! Error types for tokenization, parsing, configuration, conversion and
//! accessor invocation.
//!
//! Every failure is fail-fast: a parse or generate call either completes or
//! returns one of these errors with enough context (source index, offending
//! token and expected set, or current parse path) to diagnose it. There is no
//! retry policy and no partial-result recovery.

use thiserror::Error;

use crate::{
    path::ParsePath,
    token::{Token, TokenType},
    value::Value,
};

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Top-level error, wrapping each failure kind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    /// An accessor closure failed; re-raised rather than silently ignored.
    #[error("accessor failed: {0}")]
    Access(#[from] AccessError),
    /// The output sink rejected a write during generation.
    #[error("write to output sink failed")]
    Sink(#[from] core::fmt::Error),
}

/// A character-level lexing failure, positioned by character index into the
/// source.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} at character {index}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub index: usize,
}

impl LexError {
    pub(crate) fn new(kind: LexErrorKind, index: usize) -> Self {
        Self { kind, index }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unterminated string")]
    UnterminatedString,
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("invalid unicode escape")]
    InvalidUnicodeEscape,
    #[error("unpaired surrogate \\u{0:04X}")]
    UnpairedSurrogate(u32),
    #[error("malformed number literal")]
    MalformedNumber,
    #[error("unknown keyword '{0}'")]
    UnknownKeyword(String),
    #[error("invalid utf-8 in input")]
    InvalidUtf8,
    #[error("read from character source failed: {0}")]
    Read(String),
}

/// A structural parsing failure: a token of an unexpected type, or a member
/// that could not be bound through a descriptor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected {found} at '{path}', expected {}", expected_list(.expected))]
    UnexpectedToken {
        found: Token,
        expected: Vec<TokenType>,
        path: ParsePath,
    },
    /// A reference id that has no previously materialized object. Forward
    /// references are an ordering error in the document or configuration.
    #[error("unresolved reference {id} at '{path}'")]
    UnresolvedReference { id: Value, path: ParsePath },
    #[error("cannot bind member '{member}' at '{path}': {message}")]
    Bind {
        member: String,
        path: ParsePath,
        message: String,
    },
}

fn expected_list(expected: &[TokenType]) -> String {
    let names: Vec<&str> = expected.iter().map(TokenType::name).collect();
    names.join(" or ")
}

/// A configuration failure detected while registering converters or building
/// a class descriptor. These fail at build time for the affected type; no
/// partially usable descriptor is ever published.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("converter id '{0}' is already registered")]
    DuplicateConverterId(String),
    #[error("converter type {0} is already registered")]
    DuplicateConverterType(&'static str),
    #[error("no converter registered under {0}")]
    UnknownConverter(String),
    #[error("type {0} is not registered")]
    UnregisteredType(&'static str),
    #[error("a binding for {0} is already registered")]
    DuplicateBinding(&'static str),
    #[error("base type {base} of {ty} is not registered")]
    UnknownBase {
        ty: &'static str,
        base: &'static str,
    },
    #[error("property '{property}' on {ty} declares both a setter and an adder")]
    SetterAdderClash {
        ty: &'static str,
        property: String,
    },
    #[error("duplicate wire name '{name}' on {ty}")]
    DuplicateWireName { ty: &'static str, name: String },
    #[error("configuration for unknown property '{property}' on {ty}")]
    UnknownProperty {
        ty: &'static str,
        property: String,
    },
    #[error("constructor parameter '{parameter}' on {ty} collides with a settable property")]
    ParameterClash {
        ty: &'static str,
        parameter: String,
    },
    #[error("id property '{property}' on {ty} is missing or not readable")]
    BadIdProperty {
        ty: &'static str,
        property: String,
    },
    #[error("type {0} has neither an instantiator nor a constructor binding")]
    NotInstantiable(&'static str),
    #[error("the extends chain of {0} is cyclic")]
    CyclicExtends(&'static str),
}

/// A value of the wrong shape handed to a converter or a binding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("expected {expected}, found {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },
    #[error("number {0} has no JSON representation")]
    NonFinite(f64),
    #[error("expected an instance of {expected}")]
    TypeMismatch { expected: &'static str },
    #[error("{0}")]
    Custom(String),
}

impl ConvertError {
    /// A converter-specific failure message.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Failure raised from inside an accessor closure: a receiver of the wrong
/// concrete type, or a document value the accessor cannot store.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct AccessError {
    pub message: String,
}

impl AccessError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ConvertError> for AccessError {
    fn from(err: ConvertError) -> Self {
        Self::new(err.to_string())
    }
}
