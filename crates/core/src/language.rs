//! Query languages
//!
//! Queries arrive tagged with an ISO 639-1 code. The pipeline only needs to
//! know enough about the language to phrase rejection and clarification
//! messages, so anything outside the supported set is kept verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language of an incoming query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    French,
    English,
    Spanish,
    /// Any other ISO code, lowercased
    Other(String),
}

impl Language {
    /// Parse an ISO code such as `fr`, `en-US` or `ES`
    pub fn from_code(code: &str) -> Self {
        let primary = code
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match primary.as_str() {
            "fr" => Self::French,
            "en" => Self::English,
            "es" => Self::Spanish,
            _ => Self::Other(primary),
        }
    }

    /// ISO 639-1 code
    pub fn code(&self) -> &str {
        match self {
            Self::French => "fr",
            Self::English => "en",
            Self::Spanish => "es",
            Self::Other(code) => code,
        }
    }

    /// Whether user-facing messages should be written in French
    pub fn is_french(&self) -> bool {
        matches!(self, Self::French)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<&str> for Language {
    fn from(code: &str) -> Self {
        Self::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(Language::from_code("fr"), Language::French);
        assert_eq!(Language::from_code("en-US"), Language::English);
        assert_eq!(Language::from_code(" ES "), Language::Spanish);
        assert_eq!(Language::from_code("de"), Language::Other("de".to_string()));
    }

    #[test]
    fn test_code_round_trip() {
        for code in ["fr", "en", "es", "th"] {
            assert_eq!(Language::from_code(code).code(), code);
        }
    }
}
