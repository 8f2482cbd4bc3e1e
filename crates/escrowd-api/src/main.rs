//! # escrowd-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for Escrowd. Binds to a configurable port
//! (default 8080). If `ESCROWD_ADMIN_PHONE` and `ESCROWD_ADMIN_PASSWORD`
//! are set, an administrator account is bootstrapped at startup —
//! administrators cannot be created through the HTTP surface.

use escrowd_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let state = AppState::with_config(AppConfig { port });

    // Bootstrap an administrator if the environment provides one.
    match (
        std::env::var("ESCROWD_ADMIN_PHONE"),
        std::env::var("ESCROWD_ADMIN_PASSWORD"),
    ) {
        (Ok(phone), Ok(password)) => {
            state
                .identity
                .bootstrap_admin("admin", &phone, &password)
                .map_err(|e| {
                    tracing::error!("Administrator bootstrap failed: {e}");
                    e
                })?;
        }
        _ => {
            tracing::warn!(
                "No administrator configured (set ESCROWD_ADMIN_PHONE and \
                 ESCROWD_ADMIN_PASSWORD); disputes cannot be resolved."
            );
        }
    }

    let app = escrowd_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Escrowd API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
