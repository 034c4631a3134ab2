use std::sync::Arc;

use realty_api::ai::AiClient;
use realty_api::config::{AppConfig, Environment};
use realty_api::routes::{app, AppState};
use realty_api::store::memory::MemoryStore;
use realty_api::store::postgres::PgStore;
use realty_api::store::Store;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    tracing::info!("starting realty-api in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() && config.environment == Environment::Production {
        eprintln!("JWT_SECRET must be set in production");
        std::process::exit(1);
    }

    let store: Arc<dyn Store> = match &config.database.url {
        Some(url) => {
            let store = PgStore::connect(url, config.database.max_connections)
                .await
                .unwrap_or_else(|e| {
                    eprintln!("failed to connect to database: {}", e);
                    std::process::exit(1);
                });
            store.migrate().await.unwrap_or_else(|e| {
                eprintln!("failed to run migrations: {}", e);
                std::process::exit(1);
            });
            tracing::info!("connected to Postgres");
            Arc::new(store)
        }
        None => {
            // Volatile fallback for local development without a database
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let ai = AiClient::new(&config.ai);
    if !ai.is_configured() {
        tracing::warn!("GEMINI_API_KEY not set; AI endpoints will report unavailability");
    }

    let port = config.http.port;
    let state = AppState::new(store, ai, config);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await.expect("server");
}
