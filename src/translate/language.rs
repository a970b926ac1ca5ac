//! Target-language resolution.
//! Maps a reader-supplied language name (or two-letter code) to one of the
//! supported canonical codes. Unknown or empty names resolve to English.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical target languages the service can translate into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    Ta,
    Te,
    Kn,
    Ml,
    En,
}

impl LanguageCode {
    pub const ALL: [LanguageCode; 5] = [
        LanguageCode::Ta,
        LanguageCode::Te,
        LanguageCode::Kn,
        LanguageCode::Ml,
        LanguageCode::En,
    ];

    /// Resolve a human-readable name or short code. Never fails.
    pub fn resolve(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|code| name == code.as_code() || name == code.display_name().to_lowercase())
            .unwrap_or(LanguageCode::En)
    }

    /// Two-letter code sent to the upstream provider.
    pub fn as_code(self) -> &'static str {
        match self {
            LanguageCode::Ta => "ta",
            LanguageCode::Te => "te",
            LanguageCode::Kn => "kn",
            LanguageCode::Ml => "ml",
            LanguageCode::En => "en",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            LanguageCode::Ta => "Tamil",
            LanguageCode::Te => "Telugu",
            LanguageCode::Kn => "Kannada",
            LanguageCode::Ml => "Malayalam",
            LanguageCode::En => "English",
        }
    }

    pub fn is_english(self) -> bool {
        self == LanguageCode::En
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_full_names_case_insensitively() {
        assert_eq!(LanguageCode::resolve("Tamil"), LanguageCode::Ta);
        assert_eq!(LanguageCode::resolve("  TELUGU "), LanguageCode::Te);
        assert_eq!(LanguageCode::resolve("kannada"), LanguageCode::Kn);
        assert_eq!(LanguageCode::resolve("Malayalam"), LanguageCode::Ml);
        assert_eq!(LanguageCode::resolve("English"), LanguageCode::En);
    }

    #[test]
    fn resolves_short_codes() {
        assert_eq!(LanguageCode::resolve("ta"), LanguageCode::Ta);
        assert_eq!(LanguageCode::resolve("ML"), LanguageCode::Ml);
        assert_eq!(LanguageCode::resolve("en"), LanguageCode::En);
    }

    #[test]
    fn unknown_or_empty_defaults_to_english() {
        assert_eq!(LanguageCode::resolve(""), LanguageCode::En);
        assert_eq!(LanguageCode::resolve("   "), LanguageCode::En);
        assert_eq!(LanguageCode::resolve("French"), LanguageCode::En);
        assert_eq!(LanguageCode::resolve("tamil nadu"), LanguageCode::En);
    }

    #[test]
    fn displays_as_code() {
        assert_eq!(LanguageCode::Kn.to_string(), "kn");
    }
}
