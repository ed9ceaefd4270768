use anyhow::Context;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use protocol_bridge::{
    config::ServerConfig, core::logging::init_structured_logging, routes::create_router,
    AdapterEngine, AppState,
};
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::init()?;
    init_structured_logging(config.log_format)?;

    let cors = match &config.client_origin {
        Some(origin) => Some(
            CorsLayer::new()
                .allow_origin(
                    origin
                        .parse::<HeaderValue>()
                        .context("CLIENT_ORIGIN is not a valid header value")?,
                )
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]),
        ),
        None => None,
    };

    let engine = AdapterEngine::new().context("failed to build HTTP client")?;
    let app = create_router(AppState::new(engine), cors);

    let address = config.socket_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    info!(address = %address, "Server started");
    info!("Health check: http://{}/api/healthchecker", address);

    axum::serve(listener, app).await?;
    Ok(())
}
