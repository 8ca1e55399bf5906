//! Entrada Server - REST API for face-recognition re-entry control
//!
//! Turns one camera frame into an allow/deny decision and a durable visit
//! record. Collaborators (capture daemon, recognition service, object
//! storage) are wired from the environment; see `config.rs`.

use tracing_subscriber::EnvFilter;

use entrada_server::{create_router_with_config, AppState, Config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build application state");
            std::process::exit(1);
        }
    };

    let app = create_router_with_config(state, &config);
    let addr = config.socket_addr();

    tracing::info!(%addr, "Entrada server listening");
    tracing::info!("Swagger UI available at /swagger-ui");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
