use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use super::TracingConfig;

pub fn default_filter(level: &str) -> String {
    format!("info,speech_gateway={level},tower_http={level}")
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: TracingConfig, port: u16) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.level)));

    let layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let installed = if config.json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
    };

    if let Err(e) = installed {
        eprintln!("tracing subscriber already installed: {}", e);
        return;
    }

    tracing::info!(
        port = port,
        environment = %config.environment,
        json_format = config.json_format,
        level = %config.level,
        "Server initialized"
    );
}
