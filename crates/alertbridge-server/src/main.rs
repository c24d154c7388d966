//! Alert gateway server.
//!
//! Run with: cargo run -p alertbridge-server -- --provider-command "node bridge.js"
//!
//! Then post alerts to http://127.0.0.1:7575/send. For local work without a
//! messaging session, pass `--dev-memory-provider` instead; nothing is delivered.

mod config;

use std::sync::Arc;

use alertbridge_core::{LogPairingPresenter, SessionIdentity, SessionProvider};
use alertbridge_session::{LifecycleManager, provider::MemoryProvider};
use alertbridge_sidecar::{CommandBuilder, SidecarProvider};
use alertbridge_transport::{DispatchGateway, http::create_router};
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let provider: Arc<dyn SessionProvider> = match &args.provider_command {
        Some(command) => Arc::new(SidecarProvider::new(CommandBuilder::new(command.clone()))),
        None => {
            tracing::error!(
                "Running with --dev-memory-provider: alerts are accepted but never delivered"
            );
            Arc::new(MemoryProvider::with_auto_ready(SessionIdentity::new(
                "in-memory",
                "0",
            )))
        }
    };

    let manager = LifecycleManager::new(args.session_config(), provider, Arc::new(LogPairingPresenter));
    manager.initialize().await;

    let gateway = Arc::new(DispatchGateway::new(manager.state_handle(), manager.provider()));
    let app = create_router(gateway);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!("Gateway listening on http://{}", args.bind);
    tracing::info!("  POST /send   - dispatch a message");
    tracing::info!("  GET  /health - session readiness");

    axum::serve(listener, app).await?;
    Ok(())
}
