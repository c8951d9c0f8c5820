mod config;

use clap::Parser as _;
use config::{API_KEY_ENV, Config};
use gemini_relay::{
    AppState, build_metrics_layer_and_handle, build_metrics_router, build_router,
    client::create_hyper_client,
};
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

#[tokio::main]
#[instrument]
pub async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Local overrides first, the values already in the environment always win.
    for file in [".env.local", ".env"] {
        match config::load_env_file(file) {
            Ok(Some(path)) => info!("Loaded environment from {}", path.display()),
            Ok(None) => {}
            Err(e) => warn!("Could not load environment from {}: {}", file, e),
        }
    }

    let config = Config::parse().validate()?;
    info!("Starting Gemini relay with config: {:?}", config);

    if config.api_key.is_none() {
        warn!(
            "Warning: {} was not found in the environment; every relayed request will fail",
            API_KEY_ENV
        );
    }

    let http_client = create_hyper_client(config.pool_settings());
    let app_state =
        AppState::with_client(config.upstream(), config.allowed_origin()?, http_client);
    let mut router = build_router(app_state);

    if config.metrics {
        let (prometheus_layer, handle) =
            build_metrics_layer_and_handle(config.metrics_prefix.clone());
        router = router.layer(prometheus_layer);

        let metrics_addr = format!("0.0.0.0:{}", config.metrics_port);
        let metrics_listener = TcpListener::bind(&metrics_addr).await?;
        info!("Metrics endpoint listening on {}", metrics_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, build_metrics_router(handle)).await {
                tracing::error!("Metrics server stopped: {}", e);
            }
        });
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Gemini relay listening on {}", bind_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
