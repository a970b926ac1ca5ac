//! Curated phrase dictionary.
//! Exact known source phrases map to known-good target strings so short
//! selections never hit the upstream provider. Built-in Tamil entries can be
//! extended with a JSON file of the form
//! `{"version": 2, "entries": [{"source": "…", "target": "…", "language": "ta"}]}`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::LanguageCode;

/// Provenance marker returned in place of an English translation on a hit.
pub const DICTIONARY_PROVENANCE: &str = "Dictionary-based translation";

const BUILTIN_TAMIL: &[(&str, &str)] = &[
    ("अमरलोक", "அமரலகம்"),
    ("मृत्युलोक", "மரண உலகம்"),
    ("स्वर्ग", "சுவர்க்கம்"),
    ("स्वर्गलोक", "சுவர்க்குலகம்"),
    ("नरकलोक", "நரகுலகம்"),
    ("कलियुग", "கலியுகம்"),
    ("सतयुग", "சத்யயுகம்"),
    ("त्रेतायुग", "த்ரேதாயுகம்"),
    ("द्वापरयुग", "துவாபரயுகம்"),
    ("ब्रह्मा", "பிரம்மா"),
    ("शिव", "சிவ பாபா"),
    ("ईश्वरीय", "ஈஸ்வரீய"),
    ("ज्ञान", "ஞானம்"),
    ("योग", "யோகம்"),
    ("धर्म", "தர்மம்"),
    ("कर्म", "கர்மம்"),
];

#[derive(Debug, Deserialize)]
struct DictionaryFile {
    version: u32,
    entries: Vec<DictionaryFileEntry>,
}

#[derive(Debug, Deserialize)]
struct DictionaryFileEntry {
    source: String,
    target: String,
    #[serde(default = "default_entry_language")]
    language: LanguageCode,
}

fn default_entry_language() -> LanguageCode {
    LanguageCode::Ta
}

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("dictionary IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("dictionary parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read-only phrase table, one map per curated language.
#[derive(Debug, Clone)]
pub struct PhraseDictionary {
    version: u32,
    phrases: HashMap<LanguageCode, HashMap<String, String>>,
}

impl PhraseDictionary {
    /// Dictionary with no entries (every lookup misses).
    pub fn empty() -> Self {
        Self {
            version: 0,
            phrases: HashMap::new(),
        }
    }

    /// The built-in Tamil dictionary.
    pub fn builtin() -> Self {
        let mut dictionary = Self::empty();
        dictionary.version = 1;
        for (source, target) in BUILTIN_TAMIL {
            dictionary.insert(LanguageCode::Ta, source, target);
        }
        dictionary
    }

    /// Built-in entries with the file's entries merged over them.
    pub fn builtin_with_file(path: &Path) -> Result<Self, DictionaryError> {
        let content = std::fs::read_to_string(path)?;
        let file: DictionaryFile = serde_json::from_str(&content)?;
        let mut dictionary = Self::builtin();
        dictionary.version = dictionary.version.max(file.version);
        for entry in file.entries {
            dictionary.insert(entry.language, &entry.source, &entry.target);
        }
        Ok(dictionary)
    }

    fn insert(&mut self, language: LanguageCode, source: &str, target: &str) {
        let source = source.trim();
        if source.is_empty() {
            return;
        }
        self.phrases
            .entry(language)
            .or_default()
            .insert(source.to_string(), target.to_string());
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.phrases.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any phrases are curated for `language`.
    pub fn is_curated(&self, language: LanguageCode) -> bool {
        self.phrases.get(&language).is_some_and(|m| !m.is_empty())
    }

    /// Exact (trimmed) match only; a key appearing inside longer text is a miss.
    pub fn lookup(&self, text: &str, language: LanguageCode) -> Option<&str> {
        self.phrases
            .get(&language)?
            .get(text.trim())
            .map(String::as_str)
    }
}

impl Default for PhraseDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_exact_match_hits() {
        let dictionary = PhraseDictionary::builtin();
        assert_eq!(dictionary.lookup("धर्म", LanguageCode::Ta), Some("தர்மம்"));
        assert_eq!(dictionary.lookup("  शिव ", LanguageCode::Ta), Some("சிவ பாபா"));
    }

    #[test]
    fn substring_of_longer_text_misses() {
        let dictionary = PhraseDictionary::builtin();
        assert_eq!(dictionary.lookup("धर्मराज", LanguageCode::Ta), None);
        assert_eq!(dictionary.lookup("यह धर्म है", LanguageCode::Ta), None);
    }

    #[test]
    fn only_curated_languages_hit() {
        let dictionary = PhraseDictionary::builtin();
        assert!(dictionary.is_curated(LanguageCode::Ta));
        assert!(!dictionary.is_curated(LanguageCode::Te));
        assert_eq!(dictionary.lookup("धर्म", LanguageCode::Te), None);
        assert_eq!(dictionary.lookup("धर्म", LanguageCode::En), None);
    }

    #[test]
    fn empty_dictionary_never_hits() {
        let dictionary = PhraseDictionary::empty();
        assert!(dictionary.is_empty());
        assert_eq!(dictionary.lookup("धर्म", LanguageCode::Ta), None);
    }

    #[test]
    fn file_entries_merge_over_builtin() {
        let path = std::env::temp_dir().join(format!("dictionary-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"version": 3, "entries": [
                {"source": "धर्म", "target": "அறம்"},
                {"source": "योग", "target": "యోగం", "language": "te"}
            ]}"#,
        )
        .unwrap();

        let dictionary = PhraseDictionary::builtin_with_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(dictionary.version(), 3);
        assert_eq!(dictionary.lookup("धर्म", LanguageCode::Ta), Some("அறம்"));
        assert_eq!(dictionary.lookup("कर्म", LanguageCode::Ta), Some("கர்மம்"));
        assert_eq!(dictionary.lookup("योग", LanguageCode::Te), Some("యోగం"));
        assert!(dictionary.is_curated(LanguageCode::Te));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!("dictionary-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "not json").unwrap();
        let err = PhraseDictionary::builtin_with_file(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, DictionaryError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PhraseDictionary::builtin_with_file(Path::new("/nonexistent/dictionary.json"))
            .unwrap_err();
        assert!(matches!(err, DictionaryError::Io(_)));
    }
}
