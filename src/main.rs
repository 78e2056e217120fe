use std::sync::Arc;
use std::time::Duration;

use portal_flow::config::PortalConfig;
use portal_flow::manager::PortalManager;
use portal_flow::routes::{portal_routes, PortalRouteState};
use portal_flow::verify::SimulatedVerification;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let port: u16 = std::env::var("PORTAL_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let mut config = PortalConfig::default();
    if let Ok(device_id) = std::env::var("PORTAL_DEVICE_ID") {
        config.device_id = device_id;
    }
    if let Ok(scheme) = std::env::var("PORTAL_RETURN_SCHEME") {
        config.return_scheme = scheme;
    }
    if let Ok(ms) = std::env::var("PORTAL_VERIFY_DELAY_MS") {
        if let Ok(ms) = ms.parse::<u64>() {
            config.verification_send_delay = Duration::from_millis(ms);
        }
    }

    eprintln!("Portal Flow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Device: {} ({})", config.device_id, config.device_name);
    eprintln!("   API: http://0.0.0.0:{}/api/portal/status", port);

    let backend = Arc::new(SimulatedVerification {
        send_delay: config.verification_send_delay,
        confirm_delay: config.verification_confirm_delay,
    });
    let manager = Arc::new(PortalManager::new(config, backend));

    let app = portal_routes(PortalRouteState { manager }).layer(CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "Portal server started");
    axum::serve(listener, app).await?;

    Ok(())
}
