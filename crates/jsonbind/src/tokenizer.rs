//! Character-level JSON tokenizer with one token of push-back.

use crate::{
    error::{LexError, LexErrorKind},
    options::TokenizerOptions,
    source::CharSource,
    token::{Token, TokenType},
};

/// A pull-based tokenizer over a [`CharSource`].
///
/// Whitespace between tokens is skipped. Once the source is exhausted the
/// tokenizer yields [`TokenType::End`] permanently. One token may be pushed
/// back at a time; the next call to [`next_token`] replays it before forward
/// progress resumes, which gives the parser one token of lookahead without
/// losing position.
///
/// [`next_token`]: Tokenizer::next_token
pub struct Tokenizer<S> {
    source: S,
    options: TokenizerOptions,
    /// One char of lookahead, consumed from the source but not yet part of a
    /// token.
    peeked: Option<char>,
    /// Code points handed out so far, the position reported in errors.
    consumed: usize,
    pushed_back: Option<Token>,
    ended: bool,
}

impl<S: CharSource> Tokenizer<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, TokenizerOptions::default())
    }

    pub fn with_options(source: S, options: TokenizerOptions) -> Self {
        Self {
            source,
            options,
            peeked: None,
            consumed: 0,
            pushed_back: None,
            ended: false,
        }
    }

    /// Position of the tokenizer within the input, in code points.
    #[must_use]
    pub fn index(&self) -> usize {
        self.consumed
    }

    /// Returns the pushed-back token if one is pending, otherwise lexes the
    /// next token from the source.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if let Some(token) = self.pushed_back.take() {
            return Ok(token);
        }
        if self.ended {
            return Ok(Token::of(TokenType::End));
        }
        let Some(c) = self.next_significant_char()? else {
            self.ended = true;
            return Ok(Token::of(TokenType::End));
        };
        match c {
            '{' => Ok(Token::of(TokenType::BraceOpen)),
            '}' => Ok(Token::of(TokenType::BraceClose)),
            '[' => Ok(Token::of(TokenType::BracketOpen)),
            ']' => Ok(Token::of(TokenType::BracketClose)),
            ':' => Ok(Token::of(TokenType::Colon)),
            ',' => Ok(Token::of(TokenType::Comma)),
            '"' => self.read_string('"'),
            '\'' if self.options.allow_single_quotes => self.read_string('\''),
            '-' | '0'..='9' => self.read_number(c),
            't' | 'f' | 'n' => self.read_keyword(c),
            other => Err(self.error(LexErrorKind::UnexpectedCharacter(other))),
        }
    }

    /// Hands `token` back to the tokenizer; the next [`next_token`] call
    /// returns it again.
    ///
    /// # Panics
    ///
    /// Panics if a pushed-back token is already pending. The tokenizer holds
    /// at most one.
    ///
    /// [`next_token`]: Tokenizer::next_token
    pub fn push_back(&mut self, token: Token) {
        assert!(
            self.pushed_back.is_none(),
            "a token is already pushed back"
        );
        self.pushed_back = Some(token);
    }

    fn error(&self, kind: LexErrorKind) -> LexError {
        LexError::new(kind, self.consumed)
    }

    fn read_char(&mut self) -> Result<Option<char>, LexError> {
        let c = match self.peeked.take() {
            Some(c) => Some(c),
            None => self.source.next_char()?,
        };
        if c.is_some() {
            self.consumed += 1;
        }
        Ok(c)
    }

    fn peek_char(&mut self) -> Result<Option<char>, LexError> {
        if self.peeked.is_none() {
            self.peeked = self.source.next_char()?;
        }
        Ok(self.peeked)
    }

    fn next_significant_char(&mut self) -> Result<Option<char>, LexError> {
        loop {
            match self.read_char()? {
                Some(c) if c.is_ascii_whitespace() => {}
                other => return Ok(other),
            }
        }
    }

    /// Reads the remainder of a string whose opening `delimiter` has been
    /// consumed. The other quote character is an ordinary character inside
    /// the string.
    fn read_string(&mut self, delimiter: char) -> Result<Token, LexError> {
        let mut out = String::new();
        loop {
            let Some(c) = self.read_char()? else {
                return Err(self.error(LexErrorKind::UnterminatedString));
            };
            match c {
                c if c == delimiter => return Ok(Token::string(out)),
                '\\' => self.read_escape(&mut out)?,
                other => out.push(other),
            }
        }
    }

    fn read_escape(&mut self, out: &mut String) -> Result<(), LexError> {
        let Some(c) = self.read_char()? else {
            return Err(self.error(LexErrorKind::UnterminatedString));
        };
        match c {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            '/' => out.push('/'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'u' => out.push(self.read_unicode_escape()?),
            other => return Err(self.error(LexErrorKind::InvalidEscape(other))),
        }
        Ok(())
    }

    /// Reads the `XXXX` of a `\uXXXX` escape, combining UTF-16 surrogate
    /// pairs into one code point. A high surrogate must be directly followed
    /// by a `\uXXXX` low surrogate.
    fn read_unicode_escape(&mut self) -> Result<char, LexError> {
        let unit = self.read_hex4()?;
        match unit {
            0xD800..=0xDBFF => {
                let followed_by_escape =
                    self.read_char()? == Some('\\') && self.read_char()? == Some('u');
                if !followed_by_escape {
                    return Err(self.error(LexErrorKind::UnpairedSurrogate(unit)));
                }
                let low = self.read_hex4()?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(self.error(LexErrorKind::UnpairedSurrogate(low)));
                }
                let combined = (((unit & 0x3FF) << 10) | (low & 0x3FF)) + 0x1_0000;
                char::from_u32(combined)
                    .ok_or_else(|| self.error(LexErrorKind::InvalidUnicodeEscape))
            }
            0xDC00..=0xDFFF => Err(self.error(LexErrorKind::UnpairedSurrogate(unit))),
            _ => char::from_u32(unit).ok_or_else(|| self.error(LexErrorKind::InvalidUnicodeEscape)),
        }
    }

    /// Reads exactly four hex digits, case-insensitive.
    fn read_hex4(&mut self) -> Result<u32, LexError> {
        let mut unit = 0u32;
        for _ in 0..4 {
            let Some(c) = self.read_char()? else {
                return Err(self.error(LexErrorKind::UnterminatedString));
            };
            let digit = c
                .to_digit(16)
                .ok_or_else(|| self.error(LexErrorKind::InvalidUnicodeEscape))?;
            unit = unit * 0x10 + digit;
        }
        Ok(unit)
    }

    /// Reads a number starting with the already consumed `first` character.
    ///
    /// A literal with a fraction or exponent becomes a decimal token; a plain
    /// digit run becomes an integer token, falling back to decimal when the
    /// value overflows `i64`.
    fn read_number(&mut self, first: char) -> Result<Token, LexError> {
        let mut text = String::new();
        text.push(first);
        let mut integer_digits = usize::from(first.is_ascii_digit());
        while let Some(c) = self.peek_char()? {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            integer_digits += 1;
            self.read_char()?;
        }
        if integer_digits == 0 {
            return Err(self.error(LexErrorKind::MalformedNumber));
        }

        let mut decimal = false;
        if self.peek_char()? == Some('.') {
            self.read_char()?;
            text.push('.');
            decimal = true;
            if self.push_digit_run(&mut text)? == 0 {
                return Err(self.error(LexErrorKind::MalformedNumber));
            }
        }
        if let Some(c) = self.peek_char()? {
            if c == 'e' || c == 'E' {
                self.read_char()?;
                text.push(c);
                decimal = true;
                if let Some(sign @ ('+' | '-')) = self.peek_char()? {
                    self.read_char()?;
                    text.push(sign);
                }
                if self.push_digit_run(&mut text)? == 0 {
                    return Err(self.error(LexErrorKind::MalformedNumber));
                }
            }
        }

        if !decimal {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Token::integer(n));
            }
            // Digit run too long for i64, keep the magnitude as a float.
        }
        text.parse::<f64>()
            .map(Token::decimal)
            .map_err(|_| self.error(LexErrorKind::MalformedNumber))
    }

    fn push_digit_run(&mut self, text: &mut String) -> Result<usize, LexError> {
        let mut count = 0;
        while let Some(c) = self.peek_char()? {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            count += 1;
            self.read_char()?;
        }
        Ok(count)
    }

    /// Reads the alphabetic word starting with the already consumed `first`
    /// character and maps it to a keyword token. Anything other than an exact
    /// `true`, `false` or `null` is an unknown keyword.
    fn read_keyword(&mut self, first: char) -> Result<Token, LexError> {
        let mut word = String::new();
        word.push(first);
        while let Some(c) = self.peek_char()? {
            if !c.is_ascii_alphabetic() {
                break;
            }
            word.push(c);
            self.read_char()?;
        }
        match word.as_str() {
            "true" => Ok(Token::of(TokenType::True)),
            "false" => Ok(Token::of(TokenType::False)),
            "null" => Ok(Token::of(TokenType::Null)),
            _ => Err(self.error(LexErrorKind::UnknownKeyword(word))),
        }
    }
}
