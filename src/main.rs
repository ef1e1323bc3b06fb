use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use hublink::api::{create_integration_router, IntegrationAppState};
use hublink::cache::RedisCache;
use hublink::config::HubLinkConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hublink=info".into()),
        )
        .init();

    // Fatal before any OAuth flow can begin
    let config = Arc::new(HubLinkConfig::from_env()?);
    info!(redirect_uri = %config.redirect_uri, "hublink starting");

    let cache = RedisCache::connect(&config.redis_url).await?;
    info!(redis_url = %config.redis_url, "Connected to Redis");

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let state = IntegrationAppState {
        config: config.clone(),
        cache: Arc::new(cache),
    };
    let app = create_integration_router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
