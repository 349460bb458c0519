use std::sync::Arc;

use anyhow::Context;
use qualify_chat::channels::CliRunner;
use qualify_chat::config::{FlowConfig, RunMode};
use qualify_chat::error::ChannelError;
use qualify_chat::flow::{Conversation, FlowController};
use qualify_chat::http::{SessionRegistry, flow_routes, spawn_expiry_task};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = FlowConfig::from_env().context("invalid QUALIFY_* configuration")?;
    let catalog = Arc::new(config.load_catalog().context("failed to load step catalog")?);
    let submitter = config.submitter();

    eprintln!("Qualify Chat v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Flow: {}", catalog.name());
    eprintln!("   Steps: {}", catalog.steps().len());
    eprintln!("   Reveal delay: {}ms", config.reveal_delay.as_millis());
    eprintln!("   Leads: {}", submitter.name());
    if config.mode == RunMode::Http {
        eprintln!("   Session TTL: {}m", config.session_ttl.as_secs() / 60);
    }

    match config.mode {
        RunMode::Cli => {
            let controller = FlowController::new(catalog, submitter)
                .with_form_transcript(config.form_transcript);
            let runner = CliRunner::new(Conversation::new(controller, config.reveal_delay));
            runner.run().await?;
        }
        RunMode::Http => {
            let registry = Arc::new(
                SessionRegistry::new(catalog, submitter, config.reveal_delay)
                    .with_form_transcript(config.form_transcript),
            );
            spawn_expiry_task(Arc::clone(&registry), config.session_ttl);
            let app = flow_routes(registry);

            let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
                .await
                .map_err(|e| ChannelError::StartupFailed {
                    name: "http".to_string(),
                    reason: e.to_string(),
                })?;
            eprintln!("   API: http://0.0.0.0:{}/api/flows\n", config.http_port);
            tracing::info!(port = config.http_port, "Flow API server started");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
