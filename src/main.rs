use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use http_log_interceptor::{
    config::AppConfig,
    logging::TracingSink,
    middleware::logging::{log_requests, EndpointWhitelist},
    routes, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing()?;

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    // Parse the endpoint whitelist once at startup; a missing or empty value
    // disables logging rather than failing requests later.
    let whitelist = match EndpointWhitelist::from_config(config.logging.whitelist.as_deref()) {
        Ok(whitelist) => whitelist,
        Err(err) => {
            warn!(error = %err, "request/response logging disabled");
            EndpointWhitelist::default()
        }
    };
    if whitelist.is_empty() {
        warn!("endpoint whitelist is empty: no requests will be logged");
    }

    let state = AppState {
        whitelist: Arc::new(whitelist),
        sink: Arc::new(TracingSink),
    };

    // Build the application router
    let app = create_app(state, &config);

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("🚀 HTTP log interceptor starting on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_app(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        // Demonstration endpoints
        .route("/health", get(routes::health::health))
        .route("/ping", get(routes::health::ping))
        .route("/orders", post(routes::orders::create_order))
        .route("/orders/:id", get(routes::orders::get_order))
        // Request/response logging sits innermost so outer layers stay untouched
        .layer(from_fn_with_state(state.clone(), log_requests))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.timeout_seconds,
                ))),
        )
        .with_state(state)
}

fn init_tracing() -> Result<()> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::registry();

    match log_format.as_str() {
        "json" => {
            subscriber
                .with(tracing_subscriber::fmt::layer().json())
                .with(tracing_subscriber::EnvFilter::from_default_env())
                .init();
        }
        _ => {
            subscriber
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::EnvFilter::from_default_env())
                .init();
        }
    }

    Ok(())
}
