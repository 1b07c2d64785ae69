//! Character sources feeding the tokenizer.

use std::{io, str::Chars};

use crate::error::{LexError, LexErrorKind};

/// A pull-based supply of code points with a position counter.
///
/// The tokenizer consumes exactly one source per document. Sources own their
/// underlying input, so dropping the tokenizer releases the input on both
/// normal completion and error paths.
pub trait CharSource {
    /// The next code point, or `None` once the input is exhausted.
    fn next_char(&mut self) -> Result<Option<char>, LexError>;

    /// Number of code points consumed so far. Used as the position in
    /// [`LexError`]s.
    fn index(&self) -> usize;
}

/// A source over an in-memory string slice.
pub struct StrSource<'a> {
    chars: Chars<'a>,
    index: usize,
}

impl<'a> StrSource<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars(),
            index: 0,
        }
    }
}

impl<'a> From<&'a str> for StrSource<'a> {
    fn from(input: &'a str) -> Self {
        Self::new(input)
    }
}

impl CharSource for StrSource<'_> {
    fn next_char(&mut self) -> Result<Option<char>, LexError> {
        match self.chars.next() {
            Some(c) => {
                self.index += 1;
                Ok(Some(c))
            }
            None => Ok(None),
        }
    }

    fn index(&self) -> usize {
        self.index
    }
}

/// A source decoding UTF-8 incrementally from any [`io::Read`].
///
/// Reads one code point at a time; wrap the reader in a
/// [`BufReader`](io::BufReader) when the underlying stream makes small reads
/// expensive.
pub struct ReaderSource<R> {
    reader: R,
    index: usize,
}

impl<R: io::Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, index: 0 }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, LexError> {
        let mut buf = [0u8; 1];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(LexError::new(LexErrorKind::Read(e.to_string()), self.index));
                }
            }
        }
    }

    fn invalid(&self) -> LexError {
        LexError::new(LexErrorKind::InvalidUtf8, self.index)
    }
}

impl<R: io::Read> CharSource for ReaderSource<R> {
    fn next_char(&mut self) -> Result<Option<char>, LexError> {
        let Some(first) = self.next_byte()? else {
            return Ok(None);
        };
        let len = utf8_sequence_len(first).ok_or_else(|| self.invalid())?;
        let mut buf = [first, 0, 0, 0];
        for slot in buf.iter_mut().take(len).skip(1) {
            *slot = self.next_byte()?.ok_or_else(|| self.invalid())?;
        }
        let decoded = std::str::from_utf8(&buf[..len]).map_err(|_| self.invalid())?;
        let c = decoded.chars().next().ok_or_else(|| self.invalid())?;
        self.index += 1;
        Ok(Some(c))
    }

    fn index(&self) -> usize {
        self.index
    }
}

/// Expected length of a UTF-8 sequence from its leading byte. `None` for
/// continuation bytes and the bytes UTF-8 never uses.
fn utf8_sequence_len(first: u8) -> Option<usize> {
    match first {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}
