use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sepolia_wallet::{
    api,
    config::Config,
    constants::API_VERSION,
    services::{ChainClient, EthersChainClient},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sepolia_wallet=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting wallet server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    tracing::info!("Chain id: {} (testnet: {})", config.chain_id, config.is_testnet());

    let client: Arc<dyn ChainClient> = Arc::new(EthersChainClient::from_config(&config)?);
    match client.get_block_number().await {
        Ok(block) => tracing::info!("RPC reachable at block {}", block),
        Err(e) => tracing::warn!("RPC not reachable yet: {}", e),
    }

    let app_state = api::AppState::new(config.clone(), client);

    // Start background cache sweepers
    let interval = config.cache_sweep_interval();
    app_state.balances.cache().clone().spawn_sweeper(interval);
    app_state
        .transactions
        .detail_cache()
        .clone()
        .spawn_sweeper(interval);
    app_state
        .transactions
        .confirmation_cache()
        .clone()
        .spawn_sweeper(interval);

    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Wallet
        .route(
            "/api/v1/wallet/{address}/balance",
            get(api::wallet::get_balance),
        )
        // Transactions
        .route(
            "/api/v1/transactions/{tx_hash}",
            get(api::transactions::get_details),
        )
        .route(
            "/api/v1/transactions/{tx_hash}/confirmation",
            get(api::transactions::get_confirmation),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS has no valid origin; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    // Read-only surface
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}
