//! Murli selection translator.
//! Composition root: settings, tracing, shared state and the HTTP server.

pub mod cancellation;
pub mod http;
pub mod metrics;
pub mod settings;
pub mod translate;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use cancellation::SupersedeRegistry;
use metrics::MetricsRegistry;
use settings::{ServerSettings, Settings};
use translate::cache::ResultCache;
use translate::dictionary::PhraseDictionary;
use translate::google::GoogleTranslateClient;
use translate::service::TranslationService;
use translate::UpstreamTranslator;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    pub service: Arc<TranslationService>,
    pub metrics: Arc<MetricsRegistry>,
    pub requests: Arc<SupersedeRegistry>,
    pub debug_responses: bool,
}

impl AppContext {
    /// Wire the pipeline around an already-built upstream.
    pub fn with_upstream(settings: &Settings, upstream: Arc<dyn UpstreamTranslator>) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let cache = Arc::new(ResultCache::new(settings.cache.max_entries));
        let dictionary = Arc::new(load_dictionary(settings));
        info!(
            entries = dictionary.len(),
            version = dictionary.version(),
            cache_capacity = cache.capacity(),
            "translation pipeline ready"
        );

        let service = TranslationService::new(
            upstream,
            cache,
            dictionary,
            settings.retry,
            Arc::clone(&metrics),
        );

        Self {
            service: Arc::new(service),
            metrics,
            requests: Arc::new(SupersedeRegistry::new()),
            debug_responses: settings.server.debug_responses,
        }
    }
}

/// Built-in dictionary, extended from file when configured. A bad file is
/// logged and ignored.
fn load_dictionary(settings: &Settings) -> PhraseDictionary {
    match &settings.dictionary.path {
        Some(path) => PhraseDictionary::builtin_with_file(path).unwrap_or_else(|e| {
            warn!(error = %e, path = %path.display(), "dictionary load failed, using built-in");
            PhraseDictionary::builtin()
        }),
        None => PhraseDictionary::builtin(),
    }
}

pub fn build_context(settings: &Settings) -> anyhow::Result<AppContext> {
    let client = GoogleTranslateClient::new(&settings.upstream)
        .context("failed to create upstream translation client")?;
    info!(base_url = %settings.upstream.base_url, "upstream client initialized");
    Ok(AppContext::with_upstream(settings, Arc::new(client)))
}

pub fn init_tracing(server: &ServerSettings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("murli_translate=debug,tower_http=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    if server.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serve until Ctrl-C, then cancel in-flight translations and drain.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let ctx = build_context(&settings)?;
    let requests = Arc::clone(&ctx.requests);
    let router = http::create_router(ctx);

    let addr = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "murli-translate listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown requested, cancelling in-flight translations");
            requests.cancel_all();
        })
        .await
        .context("server error")?;

    info!("murli-translate stopped");
    Ok(())
}
