/// Configuration options for the tokenizer.
///
/// # Examples
///
/// ```rust
/// use jsonbind::{StrSource, Tokenizer, TokenizerOptions};
///
/// let options = TokenizerOptions {
///     allow_single_quotes: true,
/// };
/// let tokenizer = Tokenizer::with_options(StrSource::new("'hi'"), options);
/// ```
///
/// # Default
///
/// All options default to `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenizerOptions {
    /// Whether to accept `'...'` as a string literal delimiter in addition
    /// to `"..."`.
    ///
    /// The closing delimiter must match the opening one; the other quote
    /// character is an ordinary string character. This is the only syntax
    /// extension the tokenizer supports (no comments, no trailing commas,
    /// no unquoted keys).
    ///
    /// # Default
    ///
    /// `false`
    pub allow_single_quotes: bool,
}

/// Configuration options for the parser.
///
/// Type hints and converter or property configuration are not options; they
/// are registered on the [`Parser`](crate::Parser) and
/// [`TypeRegistry`](crate::TypeRegistry) directly.
///
/// # Default
///
/// All options default to `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    /// Forwarded to the tokenizer, see
    /// [`TokenizerOptions::allow_single_quotes`].
    ///
    /// # Default
    ///
    /// `false`
    pub allow_single_quotes: bool,
}

impl ParserOptions {
    /// The tokenizer configuration implied by these parser options.
    #[must_use]
    pub(crate) fn tokenizer_options(&self) -> TokenizerOptions {
        TokenizerOptions {
            allow_single_quotes: self.allow_single_quotes,
        }
    }
}
