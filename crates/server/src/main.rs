mod bootstrap;
mod health;
mod pdf;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use deckbot_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};
use deckbot_whatsapp::{InboundRunner, JsonLinesTransport, ReconnectPolicy};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins when set, so individual crates can be turned up without
/// touching the config file.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.trim().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().flatten_event(true).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Nothing may log before the subscriber exists, and it needs the config.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config.logging);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let server = &app.config.server;
    health::spawn(&server.bind_address, server.health_check_port, app.health.clone()).await?;

    // Webhook notifications arrive one JSON document per line on stdin,
    // typically from a relay in front of the public webhook URL.
    let transport = Arc::new(JsonLinesTransport::stdin().with_read_receipts(app.channel.clone()));
    let dispatcher = Arc::new(app.orchestrator.clone());
    let runner = InboundRunner::new(transport, dispatcher, ReconnectPolicy::default());

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        phone_number_id = %app.config.whatsapp.phone_number_id,
        "deckbot-server listening for webhook events on stdin"
    );

    let grace = Duration::from_secs(server.graceful_shutdown_secs);
    runner.run_until(shutdown_signal(), grace).await?;

    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        active_sessions = app.orchestrator.sessions().active_count().await,
        "deckbot-server stopping; in-memory sessions are discarded"
    );
    app.db_pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for ctrl-c; stopping"
        );
    }
}
