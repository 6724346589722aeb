use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Exchange ticker symbol, normalized to uppercase.
///
/// Accepts ASCII letters, digits, `.` and `-` (share classes such as `BRK.B`
/// or `BF-B`) and must contain at least one letter or digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickerError {
    #[error("ticker is empty")]
    Empty,

    #[error("invalid character {ch:?} in ticker {raw:?}")]
    InvalidChar { raw: String, ch: char },
}

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, TickerError> {
        let trimmed = raw.trim();
        if !trimmed.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(TickerError::Empty);
        }
        if let Some(ch) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
        {
            return Err(TickerError::InvalidChar {
                raw: trimmed.to_string(),
                ch,
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive substring match. An empty needle matches everything.
    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        self.0.contains(&needle.to_uppercase())
    }
}

impl TryFrom<String> for Ticker {
    type Error = TickerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
