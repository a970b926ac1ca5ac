//! HTTP endpoints.
//!
//! `POST /api/translate` answers 200 with best-effort content on every path
//! except an empty selection (400). Other methods on that route get 405.

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, Instrument};

use crate::metrics::metric_names;
use crate::translate::service::ResolveDebug;
use crate::AppContext;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
    /// Page or popup the selection came from; a newer request with the same
    /// id cancels this one.
    #[serde(default)]
    pub context_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub primary_translation: String,
    pub english_translation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<ResolveDebug>,
}

pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/translate",
            post(translate).fallback(method_not_allowed),
        )
        .route("/api/metrics", get(metrics_summary))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

async fn translate(
    State(ctx): State<AppContext>,
    body: Result<Json<TranslateBody>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!(error = %rejection, "unreadable translate body");
            return missing_text();
        }
    };

    let Some(text) = body.text.filter(|t| !t.trim().is_empty()) else {
        return missing_text();
    };
    let target_language = body.target_language.unwrap_or_default();

    let guard = match body.context_id.as_deref() {
        Some(id) if !id.is_empty() => ctx.requests.supersede(id),
        _ => ctx.requests.detached(),
    };

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!(
        "translate",
        %request_id,
        target_language = %target_language,
        chars = text.chars().count(),
        generation = guard.generation(),
    );

    async move {
        let timer = ctx.metrics.span(metric_names::HTTP_TRANSLATE);
        let resolved = ctx
            .service
            .resolve(&text, &target_language, guard.token())
            .await;
        timer.finish();

        match resolved {
            Ok(resolution) => {
                info!(
                    dictionary_hit = resolution.debug.dictionary_hit,
                    cached = resolution.debug.cached,
                    chained = resolution.debug.chained,
                    superseded = guard.is_superseded(),
                    "translation resolved"
                );
                Json(TranslateResponse {
                    primary_translation: resolution.pair.primary_translation,
                    english_translation: resolution.pair.english_translation,
                    debug: ctx.debug_responses.then_some(resolution.debug),
                })
                .into_response()
            }
            Err(_) => missing_text(),
        }
    }
    .instrument(span)
    .await
}

fn missing_text() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "Missing text" }))).into_response()
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

async fn metrics_summary(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.metrics.summary())
}

async fn health_check(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "cache": ctx.service.cache().stats(),
        "activeContexts": ctx.requests.active_contexts(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_fields_are_camel_case_and_optional() {
        let body: TranslateBody =
            serde_json::from_str(r#"{"text":"धर्म","targetLanguage":"Tamil","contextId":"p1"}"#)
                .unwrap();
        assert_eq!(body.text.as_deref(), Some("धर्म"));
        assert_eq!(body.target_language.as_deref(), Some("Tamil"));
        assert_eq!(body.context_id.as_deref(), Some("p1"));

        let empty: TranslateBody = serde_json::from_str("{}").unwrap();
        assert!(empty.text.is_none());
    }

    #[test]
    fn debug_is_omitted_when_disabled() {
        let response = TranslateResponse {
            primary_translation: "a".into(),
            english_translation: "b".into(),
            debug: None,
        };
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value, json!({"primaryTranslation": "a", "englishTranslation": "b"}));
    }
}
