//! Application state wiring the gateway together.
//!
//! The operation facade is generic over transport/credential/webhook
//! ports; AppState pins them to the concrete infra implementations and is
//! handed to the router. No module-level mutable state anywhere.

use std::sync::Arc;

use wagate_core::gateway::Gateway;
use wagate_core::relay::{WebhookRelay, WebhookTarget};
use wagate_core::transport::channel::ChannelTransportFactory;
use wagate_infra::config::{GatewayConfig, database_url};
use wagate_infra::sqlite::{DatabasePool, SqliteCredentialStore};
use wagate_infra::webhook::HttpWebhookSender;

/// The facade generics pinned to the shipped implementations.
pub type ConcreteGateway =
    Gateway<ChannelTransportFactory, SqliteCredentialStore, HttpWebhookSender>;

/// Shared application state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ConcreteGateway>,
}

impl AppState {
    /// Initialize the application state: create the data directory,
    /// connect to the database, wire the gateway.
    pub async fn init(config: &GatewayConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let pool = DatabasePool::new(&database_url(&config.data_dir)).await?;
        let credentials = Arc::new(SqliteCredentialStore::new(pool));

        let relay = WebhookRelay::new(
            HttpWebhookSender::new(config.delivery_timeout),
            WebhookTarget::new(config.webhook_url.clone()),
        );
        if let Some(url) = &config.webhook_url {
            tracing::info!(%url, "default webhook configured from environment");
        }

        let gateway = Gateway::new(
            Arc::new(ChannelTransportFactory::new()),
            credentials,
            relay,
        );

        Ok(Self {
            gateway: Arc::new(gateway),
        })
    }
}
