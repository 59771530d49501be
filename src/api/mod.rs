//! HTTP surface for the watcher service.
//!
//! Provides endpoints for:
//! - Graph webhook handshake and notification delivery (/webhook)
//! - Subscription management (/subscriptions)
//! - Service info and health (/, /health)

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

use crate::graph::SubscriptionManager;
use crate::store::SubscriptionStore;
use crate::webhook::NotificationPipeline;

pub use routes::subscriptions::SubscriptionsState;
pub use routes::webhook::WebhookState;

/// Everything the routers need, injected once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<NotificationPipeline>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub store: Arc<SubscriptionStore>,
}

pub struct ApiServer {
    port: u16,
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState, port: u16) -> Self {
        Self { port, state }
    }

    /// Builds the full router. Public so tests can serve it on an ephemeral
    /// port.
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/", get(status))
            .route("/health", get(health))
            .merge(routes::webhook::router(WebhookState {
                pipeline: state.pipeline,
            }))
            .merge(routes::subscriptions::router(SubscriptionsState {
                manager: state.subscriptions,
                store: state.store,
            }))
            .layer(ServiceBuilder::new())
    }

    pub async fn start(self) -> Result<()> {
        let app = Self::router(self.state);

        let listener = tokio::net::TcpListener::bind(("0.0.0.0", self.port)).await?;

        info!("API server listening on http://0.0.0.0:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /               - Service info");
        info!("  GET  /health         - Health check");
        info!("  GET  /webhook        - Subscription validation handshake");
        info!("  POST /webhook        - Change notification delivery");
        info!("  GET  /subscriptions  - Manage subscriptions (?action=list|create|renew|delete)");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "teams-watcher",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
