use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use speech_gateway::application::services::TranscriptionService;
use speech_gateway::infrastructure::audio::{
    AudioNormalizer, FFMPEG_BINARY, TranscriptionEngineFactory, check_ffmpeg_binary,
};
use speech_gateway::infrastructure::observability::{TracingConfig, init_tracing};
use speech_gateway::presentation::{AppState, CliOverrides, Environment, Settings, create_router};

/// Azure OpenAI compatible speech transcription server.
#[derive(Debug, Parser)]
#[command(name = "speech-gateway", version, about)]
struct Cli {
    /// Port to bind
    #[arg(long)]
    port: Option<u16>,

    /// Host address to bind
    #[arg(long)]
    host: Option<String>,

    /// Whisper model repository id or local path
    #[arg(long)]
    model: Option<String>,

    /// Run the local Whisper model on CUDA or Metal
    #[arg(long)]
    gpu: bool,
}

impl From<Cli> for CliOverrides {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            model: cli.model,
            gpu: cli.gpu,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;

    let mut settings = Settings::load(environment).context("Failed to load settings")?;
    settings.apply_overrides(cli.into());

    init_tracing(
        TracingConfig::from_settings(environment, &settings.logging),
        settings.server.port,
    );

    if let Err(e) = check_ffmpeg_binary() {
        tracing::warn!(
            binary = FFMPEG_BINARY,
            error = %e,
            "Fallback decoder unavailable, only formats the primary decoder reads will work"
        );
    }

    let kotoba = &settings.backends.kotoba_whisper;
    tracing::info!(
        model = %kotoba.model_id,
        gpu = kotoba.use_gpu,
        cache = ?kotoba.cache_dir,
        reazonspeech = settings.backends.reazonspeech.enabled,
        azure_whisper = settings.backends.azure_whisper.enabled,
        "Loading transcription backends"
    );

    let normalizer = Arc::new(
        AudioNormalizer::default().with_temp_dir(settings.transcription.temp_dir.clone()),
    );
    let backends = settings.backends.clone();
    let registry = tokio::task::spawn_blocking(move || {
        TranscriptionEngineFactory::build_registry(&backends, normalizer)
    })
    .await
    .context("Backend loader panicked")?
    .context("Failed to load the default transcription backend")?;

    let transcription_service = Arc::new(TranscriptionService::new(
        Arc::new(registry),
        settings.transcription.max_concurrent_inferences,
        settings.transcription.default_language.clone(),
    ));

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}", settings.server.host))?;

    let router = create_router(AppState::new(transcription_service, settings));

    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down transcription server");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
