use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;

use wa_onboarding::config::ServiceConfig;
use wa_onboarding::onboarding::{OnboardingRouteState, onboarding_routes};
use wa_onboarding::store::{Database, LibSqlBackend};

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

    let config = ServiceConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    eprintln!("📱 WhatsApp onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding", config.port);
    eprintln!("   Checkout: {}", config.checkout_url);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .unwrap_or_else(|e| {
                eprintln!(
                    "Error: Failed to open database at {}: {}",
                    config.db_path.display(),
                    e
                );
                std::process::exit(1);
            }),
    );
    eprintln!("   Database: {}\n", config.db_path.display());

    // ── HTTP server ──────────────────────────────────────────────────────
    let app = onboarding_routes(OnboardingRouteState {
        db,
        checkout_url: config.checkout_url.clone(),
    })
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Onboarding API listening");
    axum::serve(listener, app)
        .await
        .context("Onboarding API server failed")?;

    Ok(())
}
