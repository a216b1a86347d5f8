use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leads_api::api;
use leads_api::config::{Config, StoreBackend};
use leads_api::handlers::AppState;
use leads_api::postgrest_client::PostgrestClient;
use leads_api::store::{MemoryStore, TableStore};

/// Main entry point for the application.
///
/// Initializes logging, loads configuration, builds the single store handle
/// shared by every request, and serves the router.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leads_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let store: Arc<dyn TableStore> = match config.store_backend {
        StoreBackend::Rest => {
            let client = PostgrestClient::new(
                &config.supabase_url,
                config.supabase_key.clone(),
                &config.leads_table,
                Duration::from_secs(config.store_timeout_secs),
            )
            .map_err(|e| anyhow::anyhow!("Failed to initialize store client: {}", e))?;
            tracing::info!(
                "✓ REST store initialized: {} (table {})",
                config.supabase_url,
                config.leads_table
            );
            Arc::new(client)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; leads are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = Arc::new(AppState::new(store));

    // Configure per-IP rate limiter
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Rate limit settings must be greater than zero"))?,
    );

    let protected_routes = api::lead_routes().layer(
        ServiceBuilder::new()
            .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = api::finish(protected_routes, app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
