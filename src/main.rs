use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voyage_gateway::{
    AppState,
    config::{AppConfig, Env},
    create_router, session_resolver,
};

/// main
///
/// Loads configuration, installs logging, wires the session resolver and the
/// shared upstream client, then serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise verbose defaults for the gateway itself.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "voyage_gateway=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gateway starting in {:?} mode", config.env);
    tracing::info!("Forwarding /api to {}", config.api_url);

    // 3. Session resolution
    if config.jwt_secret.is_some() {
        tracing::info!("Sessions validated locally with the shared JWT secret");
    } else {
        tracing::info!("Sessions resolved through {}/auth/me", config.api_url);
    }
    let sessions = session_resolver(&config).expect("FATAL: Failed to build the backend client.");

    // 4. State and router
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, sessions).expect("FATAL: Failed to build the upstream client.");
    let app = create_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
