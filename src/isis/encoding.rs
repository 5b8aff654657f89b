//! Character encoding of master file fields

use std::borrow::Cow;
use std::fmt;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::{ArgumentError, Result};

/// Label selecting the guessing strategy
pub const GUESS_LABEL: &str = "guess";

/// How field bytes are turned into text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsisEncoding {
    /// UTF-8 when the bytes are valid UTF-8, ISO-8859-1 otherwise
    #[default]
    Guess,
    /// A fixed `encoding_rs` encoding
    Fixed(&'static Encoding),
}

impl IsisEncoding {
    /// Resolve a WHATWG label (`ISO-8859-1`, `cp1252`, `utf-8`, ...) or `guess`
    pub fn from_label(label: &str) -> Result<Self> {
        if label.trim().eq_ignore_ascii_case(GUESS_LABEL) {
            return Ok(IsisEncoding::Guess);
        }
        Encoding::for_label(label.trim().as_bytes())
            .map(IsisEncoding::Fixed)
            .ok_or_else(|| ArgumentError::UnknownEncoding(label.to_string()).into())
    }

    /// Decode field bytes; `None` when they are malformed in this encoding
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            IsisEncoding::Guess => match std::str::from_utf8(bytes) {
                Ok(text) => Some(Cow::Borrowed(text)),
                // ISO-8859-1 is decoded as its windows-1252 superset
                Err(_) => Some(WINDOWS_1252.decode_without_bom_handling(bytes).0),
            },
            IsisEncoding::Fixed(encoding) => {
                encoding.decode_without_bom_handling_and_without_replacement(bytes)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IsisEncoding::Guess => GUESS_LABEL,
            IsisEncoding::Fixed(encoding) => encoding.name(),
        }
    }
}

impl fmt::Display for IsisEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve an output encoding label, `UTF-8` being the usual one
pub fn output_encoding(label: &str) -> Result<&'static Encoding> {
    if label.is_empty() {
        return Ok(UTF_8);
    }
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ArgumentError::UnknownEncoding(label.to_string()).into())
}
