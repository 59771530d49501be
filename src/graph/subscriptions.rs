//! Webhook subscription lifecycle against the Graph subscriptions resource.

use backon::Retryable;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::graph::auth::TokenProvider;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::retry::read_backoff;
use crate::store::{StoredSubscription, SubscriptionStore};

/// The watched resource class: all online-meeting recordings in the tenant.
pub const RECORDINGS_RESOURCE: &str = "communications/onlineMeetings/getAllRecordings";

/// Graph caps this resource at 60 minutes; stay under it so a renewal cadence
/// of ~45 minutes has slack for latency and scheduler jitter.
const EXPIRATION_WINDOW_MINUTES: i64 = 55;

/// A registered interest in "recording created" events. The provider is the
/// sole source of truth; this is just its wire representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub resource: String,
    pub change_type: String,
    pub notification_url: String,
    pub expiration_date_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionList {
    #[serde(default)]
    value: Vec<Subscription>,
}

/// Creates, lists, renews, and deletes the recording-created subscription.
pub struct SubscriptionManager {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
    base_url: String,
    client_state: String,
}

impl SubscriptionManager {
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<TokenProvider>,
        base_url: String,
        client_state: String,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url,
            client_state,
        }
    }

    fn subscriptions_url(&self) -> String {
        format!("{}/subscriptions", self.base_url)
    }

    /// Expiration timestamp for create/renew requests, in the ISO form Graph
    /// expects.
    fn next_expiration() -> DateTime<Utc> {
        Utc::now() + Duration::minutes(EXPIRATION_WINDOW_MINUTES)
    }

    /// Registers a new subscription pointing at `notification_url`.
    pub async fn create(&self, notification_url: &str) -> GraphResult<Subscription> {
        let token = self.tokens.get_token().await?;
        let expiration = Self::next_expiration();

        let body = json!({
            "changeType": "created",
            "notificationUrl": notification_url,
            "resource": RECORDINGS_RESOURCE,
            "expirationDateTime": expiration.to_rfc3339_opts(SecondsFormat::Micros, true),
            "clientState": self.client_state,
        });

        let response = self
            .client
            .post(self.subscriptions_url())
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        let subscription: Subscription = Self::parse_json(response).await?;
        info!(
            subscription_id = %subscription.id,
            expires_at = %subscription.expiration_date_time,
            "Created subscription"
        );
        Ok(subscription)
    }

    /// Returns the provider's full set of subscriptions. Callers decide the
    /// fail-open presentation; this surfaces the error as-is.
    pub async fn list(&self) -> GraphResult<Vec<Subscription>> {
        let token = self.tokens.get_token().await?;
        let url = self.subscriptions_url();

        let list = (|| async {
            let response = self.client.get(&url).bearer_auth(&token).send().await?;
            Self::parse_json::<SubscriptionList>(response).await
        })
        .retry(read_backoff())
        .when(GraphError::is_transient)
        .notify(|err: &GraphError, delay| {
            warn!("Subscription list failed, retrying in {:?}: {}", delay, err);
        })
        .await?;

        info!("Found {} subscriptions", list.value.len());
        Ok(list.value)
    }

    /// Extends the subscription's expiration by the standard window. The id
    /// is stable across renewals; the provider returns the fresh
    /// representation.
    pub async fn renew(&self, subscription_id: &str) -> GraphResult<Subscription> {
        let token = self.tokens.get_token().await?;
        let expiration = Self::next_expiration();

        let body = json!({
            "expirationDateTime": expiration.to_rfc3339_opts(SecondsFormat::Micros, true),
        });

        let response = self
            .client
            .patch(format!("{}/{}", self.subscriptions_url(), subscription_id))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        let subscription: Subscription = Self::parse_json(response).await?;
        info!(
            subscription_id = %subscription.id,
            expires_at = %subscription.expiration_date_time,
            "Renewed subscription"
        );
        Ok(subscription)
    }

    /// Deletes the subscription. Callers apply the fail-open policy.
    pub async fn delete(&self, subscription_id: &str) -> GraphResult<()> {
        let token = self.tokens.get_token().await?;

        let response = self
            .client
            .delete(format!("{}/{}", self.subscriptions_url(), subscription_id))
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        info!(subscription_id, "Deleted subscription");
        Ok(())
    }

    /// Idempotent create: exactly one active subscription is maintained.
    /// Renews the stored one when it still exists upstream, otherwise creates
    /// a fresh registration and records its id.
    pub async fn ensure(
        &self,
        notification_url: &str,
        store: &SubscriptionStore,
    ) -> GraphResult<Subscription> {
        if let Some(record) = store.load() {
            match self.renew(&record.id).await {
                Ok(subscription) => {
                    Self::persist(store, &subscription);
                    return Ok(subscription);
                }
                Err(e) if e.is_not_found() => {
                    warn!(
                        subscription_id = %record.id,
                        "Stored subscription no longer exists upstream, creating a new one"
                    );
                    if let Err(err) = store.clear() {
                        warn!("Failed to clear stale subscription record: {err}");
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let subscription = self.create(notification_url).await?;
        Self::persist(store, &subscription);
        Ok(subscription)
    }

    /// Store I/O failures are logged, not propagated: the provider remains
    /// the source of truth and the record heals on the next lifecycle call.
    fn persist(store: &SubscriptionStore, subscription: &Subscription) {
        let record = StoredSubscription {
            id: subscription.id.clone(),
            expires_at: subscription.expiration_date_time,
        };
        if let Err(err) = store.save(&record) {
            warn!("Failed to persist subscription record: {err}");
        }
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> GraphResult<T> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn api_error(response: reqwest::Response) -> GraphError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        GraphError::Api { status, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiration_stays_inside_provider_ceiling() {
        let before = Utc::now();
        let expiration = SubscriptionManager::next_expiration();

        assert!(expiration > before + Duration::minutes(54));
        assert!(expiration <= Utc::now() + Duration::minutes(55));
    }

    #[test]
    fn subscription_round_trips_graph_wire_format() {
        let raw = r#"{
            "id": "sub-1",
            "resource": "communications/onlineMeetings/getAllRecordings",
            "changeType": "created",
            "notificationUrl": "https://example.com/webhook",
            "expirationDateTime": "2026-08-27T12:00:00.000000Z",
            "clientState": "secret"
        }"#;

        let subscription: Subscription = serde_json::from_str(raw).unwrap();
        assert_eq!(subscription.id, "sub-1");
        assert_eq!(subscription.change_type, "created");
        assert_eq!(subscription.client_state.as_deref(), Some("secret"));

        let serialized = serde_json::to_value(&subscription).unwrap();
        assert_eq!(serialized["notificationUrl"], "https://example.com/webhook");
    }
}
