//! Voice assistant server entry point

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use voice_assist_config::{load_settings, Settings};
use voice_assist_dialog::DialogRouter;
use voice_assist_models::{
    EnrolledVoice, HttpDenoiser, HttpSynthesizer, HttpTranscriber, OllamaRenderer, RendererConfig,
};
use voice_assist_server::{create_router, init_metrics, AppState, Collaborators};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("VOICE_ASSIST_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {e}. Using defaults.");
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting voice assistant server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let _handle = init_metrics();
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    let collaborators = build_collaborators(&config).await?;
    let state = AppState::new(config.clone(), collaborators).with_env(env);

    let app = create_router(state);

    let host: IpAddr = config
        .server
        .host
        .parse()
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let addr = SocketAddr::new(host, config.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Construct the shared model collaborators
///
/// The enrolled voice sample is validated here: a missing or invalid
/// file is a startup configuration error, not something to discover on
/// the first reply.
async fn build_collaborators(
    config: &Settings,
) -> Result<Collaborators, Box<dyn std::error::Error>> {
    let models = &config.models;

    let voice = EnrolledVoice::load(&models.voice_sample_path)?;
    tracing::info!(
        path = %models.voice_sample_path,
        duration_secs = voice.duration_secs(),
        "Enrolled voice sample validated"
    );

    let renderer = Arc::new(OllamaRenderer::new(RendererConfig {
        model: models.llm_model.clone(),
        endpoint: models.llm_endpoint.clone(),
        timeout: Duration::from_millis(models.llm_timeout_ms),
        ..RendererConfig::default()
    })?);
    if !renderer.is_available().await {
        tracing::warn!(
            endpoint = %models.llm_endpoint,
            "LLM backend is not answering; replies will fail until it comes up"
        );
    }

    let transcriber = Arc::new(HttpTranscriber::new(
        &models.asr_endpoint,
        Duration::from_millis(models.asr_timeout_ms),
    )?);

    let synthesizer = Arc::new(HttpSynthesizer::new(
        &models.tts_endpoint,
        Duration::from_millis(models.tts_timeout_ms),
        voice,
    )?);

    let denoiser = match &models.denoiser_endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "Noise-reduction sidecar configured");
            Some(Arc::new(HttpDenoiser::new(
                endpoint,
                Duration::from_millis(models.asr_timeout_ms),
            )?) as Arc<dyn voice_assist_core::Denoiser>)
        }
        None => {
            tracing::info!("No noise-reduction sidecar configured, using passthrough");
            None
        }
    };

    let planner = Arc::new(DialogRouter::new(renderer));

    Ok(Collaborators {
        transcriber,
        synthesizer,
        planner,
        detector: None,
        denoiser,
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// Initialize tracing from the observability config
fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("voice_assist={level},tower_http=debug").into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
