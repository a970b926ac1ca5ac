use murli_translate::settings::{load_settings, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("MURLI_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e @ murli_translate::settings::ConfigError::InvalidValue { .. }) => return Err(e.into()),
        Err(e) => {
            // Tracing is not initialized yet
            eprintln!("Warning: failed to load config: {e}. Using defaults.");
            Settings::default()
        }
    };

    murli_translate::init_tracing(&settings.server);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = env.as_deref().unwrap_or("default"),
        "starting murli-translate"
    );

    murli_translate::run(settings).await
}
