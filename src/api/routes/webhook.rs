//! Webhook endpoints.
//!
//! - Subscription-validation handshake (GET /webhook)
//! - Change-notification delivery (POST /webhook)

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::webhook::{NotificationBatch, NotificationPipeline};

#[derive(Clone)]
pub struct WebhookState {
    pub pipeline: Arc<NotificationPipeline>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(validate).post(receive))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ValidationParams {
    #[serde(rename = "validationToken")]
    validation_token: Option<String>,
}

/// Graph-mandated handshake: echo the validation token back verbatim as
/// text/plain to prove endpoint ownership.
async fn validate(Query(params): Query<ValidationParams>) -> ApiResult<String> {
    match params.validation_token {
        Some(token) => {
            info!("Webhook validation handshake received");
            Ok(token)
        }
        None => Err(ApiError::bad_request("Missing validation token")),
    }
}

/// Decodes a notification batch and runs it through the pipeline. Always
/// acknowledges with 200 once a non-empty batch is accepted, even when zero
/// notifications succeed, so the provider never backs off the subscription.
async fn receive(
    State(state): State<WebhookState>,
    body: Option<Json<NotificationBatch>>,
) -> ApiResult<Json<Value>> {
    let Some(Json(batch)) = body else {
        warn!("Rejecting webhook delivery with missing or invalid JSON body");
        return Err(ApiError::bad_request("Invalid JSON body"));
    };

    if batch.value.is_empty() {
        warn!("Rejecting webhook delivery with no notifications");
        return Err(ApiError::bad_request("No notifications found"));
    }

    let outcome = state.pipeline.process(&batch).await;
    info!(
        "Processed {} of {} notifications",
        outcome.processed, outcome.total
    );

    Ok(Json(json!({
        "message": format!("Processed {} notifications", outcome.processed)
    })))
}
