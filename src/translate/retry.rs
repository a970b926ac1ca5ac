//! Retrying upstream caller.
//! Delay before each retry, in order of precedence:
//!   1. `RetryInfo.retryDelay` in the error body ("37s", "37.5s", "250ms")
//!   2. `Retry-After` header (whole seconds)
//!   3. exponential backoff `min(base * 2^(n-1), max)`, jittered into `[exp/2, exp)`
//! Backoff sleeps race the cancellation token so an aborted request never
//! leaves a pending timer behind.

use std::time::Duration;

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{LanguageCode, UpstreamCallResult, UpstreamTranslator};

static RETRY_DELAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(\d+(?:\.\d+)?)(ms|s)?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `max_retries + 1` attempts in total.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Un-jittered exponential delay for the given 1-based attempt.
    pub fn exponential_ms(&self, attempt: u32) -> u64 {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        self.base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms)
    }

    /// Jittered backoff in `[exp/2, exp)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.exponential_ms(attempt);
        let half = exp / 2;
        let jitter = if half > 0 {
            rand::thread_rng().gen_range(0..half)
        } else {
            0
        };
        Duration::from_millis(half + jitter)
    }
}

/// Call `upstream` until it succeeds or the policy's attempts are spent.
/// Exhaustion is reported, not fatal: the last result is returned as-is.
/// Cancellation returns a result flagged `cancelled`.
pub async fn call_with_retry(
    upstream: &dyn UpstreamTranslator,
    text: &str,
    source_hint: &str,
    target: LanguageCode,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> UpstreamCallResult {
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let mut result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return UpstreamCallResult::cancelled(attempt),
            result = upstream.translate_once(text, source_hint, target) => result,
        };
        result.attempts = attempt;

        if result.is_success() {
            if attempt > 1 {
                debug!(attempt, target = %target, "upstream succeeded after retry");
            }
            return result;
        }

        if attempt > policy.max_retries {
            warn!(
                attempts = attempt,
                status = ?result.http_status,
                target = %target,
                "upstream retries exhausted"
            );
            return result;
        }

        let wait = retry_delay(&result, attempt, policy);
        warn!(
            attempt,
            status = ?result.http_status,
            wait_ms = wait.as_millis() as u64,
            "upstream attempt failed, retrying"
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => {
                return UpstreamCallResult { cancelled: true, ..result };
            }
        }
    }
}

/// Delay before the next attempt, honoring provider hints over backoff.
pub fn retry_delay(result: &UpstreamCallResult, attempt: u32, policy: &RetryPolicy) -> Duration {
    if let Some(hint) = result.parsed_body.as_ref().and_then(retry_hint) {
        return hint;
    }
    if let Some(secs) = result.retry_after_secs.filter(|s| *s > 0) {
        return Duration::from_secs(secs);
    }
    policy.backoff(attempt)
}

/// `error.details[]` entry whose `@type` names `RetryInfo`.
pub fn retry_hint(body: &Value) -> Option<Duration> {
    body.pointer("/error/details")?
        .as_array()?
        .iter()
        .filter(|detail| {
            detail
                .get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.contains("RetryInfo"))
        })
        .find_map(|detail| match detail.get("retryDelay")? {
            Value::String(s) => parse_delay(s),
            Value::Number(n) => n.as_f64().and_then(seconds_to_duration),
            _ => None,
        })
}

/// Parse `"37s"`, `"37.5s"`, `"250ms"` or a bare number of seconds.
pub fn parse_delay(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if let Some(caps) = RETRY_DELAY.captures(raw) {
        let value: f64 = caps[1].parse().ok()?;
        let is_millis = caps
            .get(2)
            .is_some_and(|unit| unit.as_str().eq_ignore_ascii_case("ms"));
        return if is_millis {
            nonzero(Duration::from_millis(value.round() as u64))
        } else {
            seconds_to_duration(value)
        };
    }
    raw.parse::<f64>().ok().and_then(seconds_to_duration)
}

fn seconds_to_duration(secs: f64) -> Option<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    nonzero(Duration::from_millis((secs * 1000.0).round() as u64))
}

fn nonzero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}
