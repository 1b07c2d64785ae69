//! Token types produced by the tokenizer.

use core::fmt;

use crate::value::Value;

/// The closed set of token types.
///
/// Structural tokens and the `true`/`false`/`null` keywords carry a value
/// fixed by their type; [`String`], [`Integer`] and [`Decimal`] tokens carry
/// a payload. [`End`] marks exhausted input and is returned permanently once
/// reached.
///
/// [`String`]: TokenType::String
/// [`Integer`]: TokenType::Integer
/// [`Decimal`]: TokenType::Decimal
/// [`End`]: TokenType::End
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    BraceOpen,
    BraceClose,
    BracketOpen,
    BracketClose,
    Colon,
    Comma,
    String,
    Integer,
    Decimal,
    True,
    False,
    Null,
    End,
}

impl TokenType {
    /// Human-readable name used in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::BraceOpen => "'{'",
            Self::BraceClose => "'}'",
            Self::BracketOpen => "'['",
            Self::BracketClose => "']'",
            Self::Colon => "':'",
            Self::Comma => "','",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::True => "'true'",
            Self::False => "'false'",
            Self::Null => "'null'",
            Self::End => "end of input",
        }
    }

    /// The fixed value carried by singleton token types, `None` for the
    /// payload-carrying types.
    #[must_use]
    pub fn singleton_value(&self) -> Option<Value> {
        match self {
            Self::BraceOpen => Some(Value::String("{".into())),
            Self::BraceClose => Some(Value::String("}".into())),
            Self::BracketOpen => Some(Value::String("[".into())),
            Self::BracketClose => Some(Value::String("]".into())),
            Self::Colon => Some(Value::String(":".into())),
            Self::Comma => Some(Value::String(",".into())),
            Self::True => Some(Value::Boolean(true)),
            Self::False => Some(Value::Boolean(false)),
            Self::Null | Self::End => Some(Value::Null),
            Self::String | Self::Integer | Self::Decimal => None,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One lexed token: a type plus its value.
///
/// Equality is by `(type, value)`, so two independently lexed `107` tokens
/// compare equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    token_type: TokenType,
    value: Value,
}

impl Token {
    /// A singleton token (structural, keyword, or end-of-input).
    ///
    /// # Panics
    ///
    /// Panics if `token_type` is one of the payload-carrying types; those are
    /// built through [`Token::string`], [`Token::integer`] and
    /// [`Token::decimal`].
    #[must_use]
    pub fn of(token_type: TokenType) -> Self {
        let Some(value) = token_type.singleton_value() else {
            panic!("token type {token_type} requires an explicit value");
        };
        Self { token_type, value }
    }

    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            token_type: TokenType::String,
            value: Value::String(value.into()),
        }
    }

    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self {
            token_type: TokenType::Integer,
            value: Value::Integer(value),
        }
    }

    #[must_use]
    pub fn decimal(value: f64) -> Self {
        Self {
            token_type: TokenType::Decimal,
            value: Value::Decimal(value),
        }
    }

    #[must_use]
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the token, yielding its value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Consumes the token if it carries a string payload, handing it back
    /// unchanged otherwise.
    pub(crate) fn try_into_string(self) -> Result<String, Self> {
        let Self { token_type, value } = self;
        match value {
            Value::String(s) => Ok(s),
            value => Err(Self { token_type, value }),
        }
    }

    /// Returns `true` if this token has the given type.
    #[must_use]
    pub fn is(&self, token_type: TokenType) -> bool {
        self.token_type == token_type
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token_type {
            TokenType::String => write!(f, "string {}", self.value),
            TokenType::Integer | TokenType::Decimal => {
                write!(f, "{} {}", self.token_type.name(), self.value)
            }
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_type_and_value() {
        assert_eq!(Token::integer(107), Token::integer(107));
        assert_ne!(Token::integer(107), Token::integer(108));
        assert_ne!(Token::integer(1), Token::decimal(1.0));
        assert_eq!(Token::of(TokenType::Comma), Token::of(TokenType::Comma));
        assert_ne!(Token::of(TokenType::True), Token::of(TokenType::False));
    }

    #[test]
    fn singleton_values_are_fixed() {
        assert_eq!(
            Token::of(TokenType::True).value(),
            &Value::Boolean(true)
        );
        assert_eq!(Token::of(TokenType::Null).value(), &Value::Null);
        assert_eq!(
            Token::of(TokenType::BraceOpen).value(),
            &Value::String("{".into())
        );
    }

    #[test]
    #[should_panic(expected = "requires an explicit value")]
    fn payload_types_reject_singleton_construction() {
        let _ = Token::of(TokenType::String);
    }
}
