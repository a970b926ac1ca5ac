//! Google Translate (`translate_a/single`, `client=gtx`) client.
//! One HTTP attempt per call, connection pooling via reqwest. Responses are
//! decoded through an explicit set of known provider shapes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::text::clean_text;
use super::{LanguageCode, UpstreamCallResult, UpstreamTranslator};
use crate::settings::UpstreamSettings;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct GoogleTranslateClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleTranslateClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/translate_a/single", self.base_url)
    }
}

#[async_trait]
impl UpstreamTranslator for GoogleTranslateClient {
    async fn translate_once(
        &self,
        text: &str,
        source_hint: &str,
        target: LanguageCode,
    ) -> UpstreamCallResult {
        let cleaned = clean_text(text);

        // dt=t only: dictionary flags change the response shape
        let sent = self
            .http
            .get(self.endpoint())
            .query(&[
                ("client", "gtx"),
                ("sl", source_hint),
                ("tl", target.as_code()),
                ("dt", "t"),
                ("q", cleaned.as_str()),
            ])
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, target = %target, "upstream request failed");
                return UpstreamCallResult::transport_failure(e.to_string());
            }
        };

        let status = response.status().as_u16();
        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE).unwrap_or_default();
        let retry_after_secs = header(RETRY_AFTER).and_then(|s| s.trim().parse::<u64>().ok());

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, status, "failed to read upstream body");
                String::new()
            }
        };
        debug!(status, content_type = %content_type, bytes = body.len(), "upstream responded");

        UpstreamCallResult {
            retry_after_secs,
            ..UpstreamCallResult::from_body(status, content_type, body)
        }
    }
}

/// Known response shapes, classified before any field access.
#[derive(Debug, PartialEq)]
enum ProviderShape<'a> {
    /// `[[["translated", "original", …], …], …]`
    Segmented(&'a [Value]),
    /// `{"candidates":[{"content":{"parts":[{"text": …}]}}]}`
    Generated(&'a str),
    /// `{"text": …}`
    Flat(&'a str),
    Unknown,
}

impl<'a> ProviderShape<'a> {
    fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(top) => match top.first() {
                Some(Value::Array(segments)) => ProviderShape::Segmented(segments),
                _ => ProviderShape::Unknown,
            },
            Value::Object(map) => {
                if let Some(text) = value
                    .pointer("/candidates/0/content/parts/0/text")
                    .and_then(Value::as_str)
                {
                    ProviderShape::Generated(text)
                } else if let Some(text) = map.get("text").and_then(Value::as_str) {
                    ProviderShape::Flat(text)
                } else {
                    ProviderShape::Unknown
                }
            }
            _ => ProviderShape::Unknown,
        }
    }
}

/// Extract the translated text, concatenating segments in order.
/// Unknown shapes yield `None`.
pub fn decode_translation(value: &Value) -> Option<String> {
    match ProviderShape::classify(value) {
        ProviderShape::Segmented(segments) => Some(
            segments
                .iter()
                .map(|segment| segment.get(0).and_then(Value::as_str).unwrap_or(""))
                .collect(),
        ),
        ProviderShape::Generated(text) | ProviderShape::Flat(text) => Some(text.to_string()),
        ProviderShape::Unknown => None,
    }
}
