//! Serves the UI shell on its own port, independently of the relay.
use clap::Parser;
use gemini_relay::ui::build_ui_router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Serves the Gemini relay UI shell", long_about = None)]
struct UiConfig {
    /// The port on which the UI will be served. The relay trusts this origin by default.
    #[arg(short = 'p', long, env = "GEMINI_RELAY_UI_PORT", default_value_t = 5173)]
    port: u16,

    /// The interface to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = UiConfig::parse();
    let router = build_ui_router().layer(TraceLayer::new_for_http());

    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("UI listening on http://{}", bind_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
