//! Translation resolution pipeline.
//! Dictionary short-circuit, result cache, retrying upstream calls, the
//! transliteration-correction chain and fallback synthesis.

pub mod cache;
pub mod dictionary;
pub mod google;
pub mod language;
pub mod retry;
pub mod service;
pub mod text;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use language::LanguageCode;

/// Source hint asking the provider to detect the input language.
pub const SOURCE_AUTO: &str = "auto";

/// Incoming selection to translate.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub text: String,
    pub target_language: String,
}

impl TranslationRequest {
    /// Trims `text`; rejects selections that are empty after trimming.
    pub fn new(text: &str, target_language: &str) -> Result<Self, InvalidRequest> {
        let text = text.trim();
        if text.is_empty() {
            return Err(InvalidRequest);
        }
        Ok(Self {
            text: text.to_string(),
            target_language: target_language.to_string(),
        })
    }

    pub fn target_code(&self) -> LanguageCode {
        LanguageCode::resolve(&self.target_language)
    }
}

/// Final `{primary, english}` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationPair {
    pub primary_translation: String,
    pub english_translation: String,
}

impl TranslationPair {
    pub fn new(primary: impl Into<String>, english: impl Into<String>) -> Self {
        Self {
            primary_translation: primary.into(),
            english_translation: english.into(),
        }
    }

    /// `"<Language> (fallback): <text>"` for both sides.
    pub fn fallback(text: &str, target: LanguageCode) -> Self {
        Self::new(
            fallback_label(target, text),
            fallback_label(LanguageCode::En, text),
        )
    }
}

pub fn fallback_label(language: LanguageCode, text: &str) -> String {
    format!("{} (fallback): {}", language.display_name(), text)
}

/// The only failure the resolver reports: nothing to translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Missing text")]
pub struct InvalidRequest;

/// Outcome of one upstream attempt (or the last of several).
#[derive(Debug, Clone, Default)]
pub struct UpstreamCallResult {
    /// `None` when the request never produced an HTTP response.
    pub http_status: Option<u16>,
    pub raw_body: String,
    /// `None` when the body is not JSON (HTML error pages, truncation).
    pub parsed_body: Option<serde_json::Value>,
    pub content_type: String,
    /// `Retry-After` header, in whole seconds.
    pub retry_after_secs: Option<u64>,
    /// Attempts made by the retrying caller, including this one.
    pub attempts: u32,
    pub cancelled: bool,
}

impl UpstreamCallResult {
    /// Builds a result from a received body; parse failure degrades to `None`.
    pub fn from_body(
        http_status: u16,
        content_type: impl Into<String>,
        raw_body: impl Into<String>,
    ) -> Self {
        let raw_body = raw_body.into();
        let parsed_body = serde_json::from_str(&raw_body).ok();
        Self {
            http_status: Some(http_status),
            raw_body,
            parsed_body,
            content_type: content_type.into(),
            ..Self::default()
        }
    }

    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            raw_body: message.into(),
            ..Self::default()
        }
    }

    pub fn cancelled(attempts: u32) -> Self {
        Self {
            attempts,
            cancelled: true,
            ..Self::default()
        }
    }

    /// Error pages served with a 200 start with `<`.
    pub fn looks_like_html(&self) -> bool {
        self.raw_body.trim_start().starts_with('<')
    }

    pub fn is_success(&self) -> bool {
        matches!(self.http_status, Some(200..=299)) && !self.looks_like_html()
    }

    /// Translated text. Empty for failed calls, whatever their body says, and
    /// for bodies with no recognisable shape.
    pub fn translated_text(&self) -> String {
        if !self.is_success() {
            return String::new();
        }
        self.parsed_body
            .as_ref()
            .and_then(google::decode_translation)
            .unwrap_or_default()
    }
}

/// A single attempt against a translation provider. Implementations never
/// fail: transport errors come back as a result with no HTTP status.
#[async_trait]
pub trait UpstreamTranslator: Send + Sync {
    async fn translate_once(
        &self,
        text: &str,
        source_hint: &str,
        target: LanguageCode,
    ) -> UpstreamCallResult;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_trims_and_rejects_blank_text() {
        assert_eq!(TranslationRequest::new("   \n", "Tamil").unwrap_err(), InvalidRequest);
        let request = TranslationRequest::new("  धर्म ", "Tamil").unwrap();
        assert_eq!(request.text, "धर्म");
        assert_eq!(request.target_code(), LanguageCode::Ta);
    }

    #[test]
    fn fallback_labels_use_language_names() {
        let pair = TranslationPair::fallback("योग", LanguageCode::Ml);
        assert_eq!(pair.primary_translation, "Malayalam (fallback): योग");
        assert_eq!(pair.english_translation, "English (fallback): योग");
    }

    #[test]
    fn html_with_200_is_not_success() {
        let result = UpstreamCallResult::from_body(200, "text/html", "  <!DOCTYPE html><html>");
        assert!(result.parsed_body.is_none());
        assert!(!result.is_success());
    }

    #[test]
    fn non_2xx_and_transport_failures_are_not_success() {
        assert!(!UpstreamCallResult::from_body(429, "application/json", "{}").is_success());
        assert!(!UpstreamCallResult::transport_failure("connection refused").is_success());
        assert!(UpstreamCallResult::from_body(204, "", "").is_success());
    }

    #[test]
    fn error_status_body_is_never_a_translation() {
        let result = UpstreamCallResult::from_body(503, "application/json", r#"{"text":"Service Unavailable"}"#);
        assert!(result.parsed_body.is_some());
        assert_eq!(result.translated_text(), "");

        let segmented = testing::segments("Quota exceeded");
        let rejected = UpstreamCallResult {
            http_status: Some(429),
            ..segmented
        };
        assert_eq!(rejected.translated_text(), "");
    }

    #[test]
    fn garbled_body_yields_empty_translation() {
        let result = UpstreamCallResult::from_body(200, "application/json", "[[[\"trunc");
        assert!(result.parsed_body.is_none());
        assert_eq!(result.translated_text(), "");
    }
}
