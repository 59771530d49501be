//! Subscription management endpoint for operator actions.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::api::error::{ApiError, ApiResult};
use crate::graph::SubscriptionManager;
use crate::store::SubscriptionStore;

#[derive(Clone)]
pub struct SubscriptionsState {
    pub manager: Arc<SubscriptionManager>,
    pub store: Arc<SubscriptionStore>,
}

pub fn router(state: SubscriptionsState) -> Router {
    Router::new()
        .route("/subscriptions", get(manage))
        .with_state(state)
}

fn default_action() -> String {
    "list".to_string()
}

#[derive(Debug, Deserialize)]
struct SubscriptionParams {
    #[serde(default = "default_action")]
    action: String,
    webhook_url: Option<String>,
    subscription_id: Option<String>,
}

/// Dispatches on `action`. Lifecycle writes (create/renew) propagate upstream
/// failure as 500; list and delete fail open, returning the default value
/// alongside a machine-readable `error` so callers can tell the difference.
async fn manage(
    State(state): State<SubscriptionsState>,
    Query(params): Query<SubscriptionParams>,
) -> ApiResult<Json<Value>> {
    info!("Subscription action requested: {}", params.action);

    match params.action.as_str() {
        "create" => {
            let webhook_url = params
                .webhook_url
                .ok_or_else(|| ApiError::bad_request("webhook_url is required for create"))?;

            let subscription = state.manager.ensure(&webhook_url, &state.store).await?;
            Ok(Json(serde_json::to_value(subscription).map_err(|e| {
                ApiError::internal(format!("Failed to encode subscription: {e}"))
            })?))
        }
        "list" => match state.manager.list().await {
            Ok(subscriptions) => Ok(Json(json!({ "subscriptions": subscriptions }))),
            Err(e) => {
                error!("Failed to list subscriptions: {e}");
                Ok(Json(json!({
                    "subscriptions": [],
                    "error": e.to_string(),
                })))
            }
        },
        "renew" => {
            let subscription_id = params
                .subscription_id
                .ok_or_else(|| ApiError::bad_request("subscription_id is required for renew"))?;

            let subscription = state.manager.renew(&subscription_id).await?;
            Ok(Json(serde_json::to_value(subscription).map_err(|e| {
                ApiError::internal(format!("Failed to encode subscription: {e}"))
            })?))
        }
        "delete" => {
            let subscription_id = params
                .subscription_id
                .ok_or_else(|| ApiError::bad_request("subscription_id is required for delete"))?;

            match state.manager.delete(&subscription_id).await {
                Ok(()) => {
                    // Forget the record if it named the deleted subscription.
                    if state
                        .store
                        .load()
                        .is_some_and(|record| record.id == subscription_id)
                    {
                        if let Err(e) = state.store.clear() {
                            error!("Failed to clear subscription record: {e}");
                        }
                    }
                    Ok(Json(json!({ "deleted": true })))
                }
                Err(e) => {
                    error!("Failed to delete subscription {subscription_id}: {e}");
                    Ok(Json(json!({
                        "deleted": false,
                        "error": e.to_string(),
                    })))
                }
            }
        }
        other => Err(ApiError::bad_request(format!(
            "Unrecognized action '{other}'. Use: create, list, delete, or renew"
        ))),
    }
}
