//! Translation resolver.
//! dictionary -> cache -> English anchor -> primary -> transliteration
//! chain -> fallback composition -> cache write. Never fails except for an
//! empty selection; every other failure degrades to labelled fallback text.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::cache::ResultCache;
use super::dictionary::{PhraseDictionary, DICTIONARY_PROVENANCE};
use super::retry::{call_with_retry, RetryPolicy};
use super::text::{is_mostly_latin, is_paragraph};
use super::{
    fallback_label, InvalidRequest, LanguageCode, TranslationPair, TranslationRequest,
    UpstreamCallResult, UpstreamTranslator, SOURCE_AUTO,
};
use crate::metrics::{metric_names, MetricsRegistry};

/// Observability details attached to a resolution. Never carries credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDebug {
    pub target_code: Option<LanguageCode>,
    pub dictionary_hit: bool,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<u64>,
    pub api_status_primary: Option<u16>,
    pub api_status_english: Option<u16>,
    pub api_content_type_primary: Option<String>,
    pub api_content_type_english: Option<String>,
    pub attempts_primary: u32,
    pub attempts_english: u32,
    pub chained: bool,
    pub superseded: bool,
    pub recovered_panic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub pair: TranslationPair,
    pub debug: ResolveDebug,
}

impl Resolution {
    fn fallback(text: &str, target: LanguageCode) -> Self {
        Self {
            pair: TranslationPair::fallback(text, target),
            debug: ResolveDebug {
                target_code: Some(target),
                ..ResolveDebug::default()
            },
        }
    }
}

pub struct TranslationService {
    upstream: Arc<dyn UpstreamTranslator>,
    cache: Arc<ResultCache>,
    dictionary: Arc<PhraseDictionary>,
    policy: RetryPolicy,
    metrics: Arc<MetricsRegistry>,
}

impl TranslationService {
    pub fn new(
        upstream: Arc<dyn UpstreamTranslator>,
        cache: Arc<ResultCache>,
        dictionary: Arc<PhraseDictionary>,
        policy: RetryPolicy,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            upstream,
            cache,
            dictionary,
            policy,
            metrics,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Resolve `text` into the reader's language plus an English anchor.
    /// Only an empty selection is rejected; a panic anywhere below is caught
    /// and answered with the fallback pair.
    pub async fn resolve(
        &self,
        text: &str,
        target_language: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, InvalidRequest> {
        let request = TranslationRequest::new(text, target_language)?;
        let target = request.target_code();

        let span = self.metrics.span(metric_names::RESOLVE);
        let outcome = AssertUnwindSafe(self.resolve_inner(&request.text, target, cancel))
            .catch_unwind()
            .await;
        span.finish();

        Ok(outcome.unwrap_or_else(|_| {
            error!(target = %target, "resolver panicked, answering with fallback");
            let mut resolution = Resolution::fallback(&request.text, target);
            resolution.debug.recovered_panic = true;
            resolution
        }))
    }

    async fn resolve_inner(
        &self,
        text: &str,
        target: LanguageCode,
        cancel: &CancellationToken,
    ) -> Resolution {
        let mut debug = ResolveDebug {
            target_code: Some(target),
            ..ResolveDebug::default()
        };

        // Dictionary hits skip the cache so their provenance marker survives.
        if self.dictionary.is_curated(target) && !is_paragraph(text) {
            if let Some(hit) = self.dictionary.lookup(text, target) {
                debug!(target = %target, "dictionary hit");
                debug.dictionary_hit = true;
                return Resolution {
                    pair: TranslationPair::new(hit, DICTIONARY_PROVENANCE),
                    debug,
                };
            }
        }

        if let Some(entry) = self.cache.get(target, text) {
            debug!(target = %target, "cache hit");
            debug.cached = true;
            debug.cached_at = Some(entry.created_at);
            return Resolution {
                pair: entry.pair,
                debug,
            };
        }

        let english_call = self.call(text, SOURCE_AUTO, LanguageCode::En, cancel).await;
        let english = english_call.translated_text();
        debug.api_status_english = english_call.http_status;
        debug.api_content_type_english = content_type(&english_call);
        debug.attempts_english = english_call.attempts;

        let (mut primary, primary_cancelled) = if target.is_english() {
            debug.api_status_primary = english_call.http_status;
            debug.api_content_type_primary = content_type(&english_call);
            (english.clone(), english_call.cancelled)
        } else {
            let primary_call = self.call(text, SOURCE_AUTO, target, cancel).await;
            debug.api_status_primary = primary_call.http_status;
            debug.api_content_type_primary = content_type(&primary_call);
            debug.attempts_primary = primary_call.attempts;
            (primary_call.translated_text(), primary_call.cancelled)
        };

        if !target.is_english() && is_mostly_latin(&primary) && has_text(&english) {
            let chained = self
                .call(&english, LanguageCode::En.as_code(), target, cancel)
                .await
                .translated_text();
            if has_text(&chained) && !is_mostly_latin(&chained) {
                debug!(target = %target, "replaced romanized output via English chain");
                debug.chained = true;
                primary = chained;
            }
        }

        let from_upstream = has_text(&primary) || has_text(&english);
        let english = if has_text(&english) {
            english.trim().to_string()
        } else {
            fallback_label(LanguageCode::En, text)
        };
        // A cancelled side is unresolved, not empty: label it instead of
        // borrowing the English text.
        let primary = if has_text(&primary) {
            primary.trim().to_string()
        } else if from_upstream && !primary_cancelled {
            english.clone()
        } else {
            fallback_label(target, text)
        };
        let pair = TranslationPair::new(primary, english);

        if cancel.is_cancelled() {
            info!(target = %target, "resolution superseded, result not cached");
            debug.superseded = true;
        } else if from_upstream {
            self.cache.put(target, text, pair.clone());
        }

        Resolution { pair, debug }
    }

    async fn call(
        &self,
        text: &str,
        source_hint: &str,
        target: LanguageCode,
        cancel: &CancellationToken,
    ) -> UpstreamCallResult {
        let span = self.metrics.span(metric_names::UPSTREAM_CALL);
        let result =
            call_with_retry(self.upstream.as_ref(), text, source_hint, target, &self.policy, cancel)
                .await;
        span.finish();
        result
    }
}

fn has_text(s: &str) -> bool {
    !s.trim().is_empty()
}

fn content_type(result: &UpstreamCallResult) -> Option<String> {
    (!result.content_type.is_empty()).then(|| result.content_type.clone())
}
