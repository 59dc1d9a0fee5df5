//! Live room identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a live id was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LiveIdError {
    /// The id was empty or only whitespace.
    #[error("live id is empty")]
    Empty,
    /// The id contained something other than ASCII digits.
    #[error("live id must be numeric, got '{0}'")]
    NotNumeric(String),
}

/// The numeric id that appears in a live room's landing page URL
/// (`https://live.douyin.com/<live_id>`).
///
/// Distinct from the internal room id, which is resolved over HTTP.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LiveId(String);

impl LiveId {
    /// Validate and wrap a live id. Surrounding whitespace is trimmed.
    pub fn parse(raw: &str) -> Result<Self, LiveIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LiveIdError::Empty);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LiveIdError::NotNumeric(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LiveId {
    type Err = LiveIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LiveId {
    type Error = LiveIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LiveId> for String {
    fn from(id: LiveId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numeric() {
        let id = LiveId::parse("261378947940").unwrap();
        assert_eq!(id.as_str(), "261378947940");
        assert_eq!(id.to_string(), "261378947940");
    }

    #[test]
    fn parse_trims_whitespace() {
        let id = LiveId::parse("  42\n").unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(LiveId::parse(""), Err(LiveIdError::Empty));
        assert_eq!(LiveId::parse("   "), Err(LiveIdError::Empty));
    }

    #[test]
    fn parse_rejects_non_digits() {
        assert_eq!(
            LiveId::parse("12a4"),
            Err(LiveIdError::NotNumeric("12a4".into()))
        );
        assert!(LiveId::parse("-12").is_err());
        assert!(LiveId::parse("１２").is_err());
    }

    #[test]
    fn serde_roundtrip_validates() {
        let id: LiveId = serde_json::from_str("\"123\"").unwrap();
        assert_eq!(id.as_str(), "123");
        assert!(serde_json::from_str::<LiveId>("\"abc\"").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"123\"");
    }
}
