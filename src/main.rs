use axum::{Router, response::Json, routing::get};
use dotenv::dotenv;
use serde_json::{Value, json};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod db;
mod errors;
mod routes;
mod utils;

use db::{init_db, run_migrations};
use utils::config::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenv().ok();

    // Setup tracing/logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("info"))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Chatbot Backend Server...");

    // Initialize DB - server will not start if this fails
    tracing::info!("Connecting to database...");
    let pool = init_db().await?;
    tracing::info!("✅ Database connected successfully");

    // Run database migrations
    run_migrations(&pool).await?;

    // Shared application state
    let app_state = AppState {
        db: Arc::new(pool),
    };

    // Health check handler
    async fn health_handler() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": "1.0.0"
        }))
    }

    // API information handler
    async fn api_info_handler() -> Json<Value> {
        Json(json!({
            "name": "AI Chatbot Backend",
            "version": "1.0.0",
            "endpoints": {
                "health": "/api/health",
                "chat": "/api/chat/message",
                "training": "/api/training/upload",
                "admin": "/api/admin/stats"
            }
        }))
    }

    // Define routes
    let app = Router::new()
        .route("/api", get(api_info_handler))
        .route("/api/health", get(health_handler))
        .nest("/api/chat", routes::chat::create_chat_router())
        .nest("/api/admin", routes::admin::create_admin_router())
        .nest("/api/training", routes::training::create_training_router())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Run server
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(5000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("🌐 Server running on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
