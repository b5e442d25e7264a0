use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Longest symbol accepted from the path segment.
pub const MAX_TICKER_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TickerError {
    #[error("ticker must not be empty")]
    Empty,

    #[error("ticker '{0}' is longer than {MAX_TICKER_LEN} characters")]
    TooLong(String),

    #[error("ticker '{ticker}' contains invalid character '{invalid}'")]
    InvalidCharacter { ticker: String, invalid: char },
}

/// Uppercase symbol identifying a security.
///
/// Only constructed through [`Ticker::parse`], so every value is trimmed,
/// uppercased and limited to `A-Z 0-9 . - ^ =`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, TickerError> {
        let symbol = raw.trim().to_ascii_uppercase();

        if symbol.is_empty() {
            return Err(TickerError::Empty);
        }
        if symbol.chars().count() > MAX_TICKER_LEN {
            return Err(TickerError::TooLong(symbol));
        }
        if let Some(invalid) = symbol
            .chars()
            .find(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '^' | '=')))
        {
            return Err(TickerError::InvalidCharacter { ticker: symbol, invalid });
        }

        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
