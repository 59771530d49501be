//! Service wiring: component construction, the background renewal task, and
//! the long-running HTTP server.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::api::{ApiServer, AppState};
use crate::config::Config;
use crate::graph::{self, RecordingResolver, SubscriptionManager, TokenProvider};
use crate::store::{StoredSubscription, SubscriptionStore};
use crate::transcription::HttpTranscriptionSink;
use crate::webhook::NotificationPipeline;

/// The injected component graph, shared by the service and the one-shot CLI
/// commands.
pub struct Components {
    pub pipeline: Arc<NotificationPipeline>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub store: Arc<SubscriptionStore>,
}

pub fn build_components(config: &Config) -> Result<Components> {
    let client = graph::http_client()?;

    let tokens = Arc::new(TokenProvider::new(client.clone(), config.graph.clone()));

    let subscriptions = Arc::new(SubscriptionManager::new(
        client.clone(),
        tokens.clone(),
        config.graph.base_url.clone(),
        config.webhook.client_state.clone(),
    ));

    let resolver = RecordingResolver::new(client.clone(), config.graph.base_url.clone());
    let sink = Arc::new(HttpTranscriptionSink::new(client, &config.transcription));

    let pipeline = Arc::new(NotificationPipeline::new(
        tokens,
        resolver,
        sink,
        config.webhook.client_state.clone(),
    ));

    let store = Arc::new(SubscriptionStore::new(config.state_file.clone()));

    Ok(Components {
        pipeline,
        subscriptions,
        store,
    })
}

pub async fn run_service(config: Config) -> Result<()> {
    info!("Starting teams-watcher service");

    let components = build_components(&config)?;

    spawn_renewal_task(
        components.subscriptions.clone(),
        components.store.clone(),
        config.webhook.notification_url.clone(),
        Duration::from_secs(config.renewal.interval_minutes * 60),
    );

    let state = AppState {
        pipeline: components.pipeline,
        subscriptions: components.subscriptions,
        store: components.store,
    };

    ApiServer::new(state, config.server.port).start().await
}

/// Keeps the subscription alive on a cadence inside the 55-minute expiration
/// window. Runs once at startup to bootstrap, then every tick. Failures are
/// logged and retried on the next tick; they never bring the service down.
fn spawn_renewal_task(
    manager: Arc<SubscriptionManager>,
    store: Arc<SubscriptionStore>,
    notification_url: Option<String>,
    interval: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            renew_once(&manager, &store, notification_url.as_deref()).await;
        }
    });

    info!("Subscription renewal task running in background");
}

async fn renew_once(
    manager: &SubscriptionManager,
    store: &SubscriptionStore,
    notification_url: Option<&str>,
) {
    match store.load() {
        Some(record) => match manager.renew(&record.id).await {
            Ok(subscription) => {
                let updated = StoredSubscription {
                    id: subscription.id.clone(),
                    expires_at: subscription.expiration_date_time,
                };
                if let Err(e) = store.save(&updated) {
                    warn!("Failed to persist renewed subscription record: {e}");
                }
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    subscription_id = %record.id,
                    "Subscription expired upstream before renewal"
                );
                if let Err(err) = store.clear() {
                    warn!("Failed to clear stale subscription record: {err}");
                }
                recreate(manager, store, notification_url).await;
            }
            Err(e) => {
                error!(
                    subscription_id = %record.id,
                    "Subscription renewal failed, will retry next interval: {e}"
                );
            }
        },
        None => recreate(manager, store, notification_url).await,
    }
}

async fn recreate(
    manager: &SubscriptionManager,
    store: &SubscriptionStore,
    notification_url: Option<&str>,
) {
    let Some(url) = notification_url else {
        debug!("No active subscription and no notification URL configured");
        return;
    };

    match manager.ensure(url, store).await {
        Ok(subscription) => {
            info!(
                subscription_id = %subscription.id,
                expires_at = %subscription.expiration_date_time,
                "Active subscription established"
            );
        }
        Err(e) => error!("Failed to establish subscription, will retry next interval: {e}"),
    }
}
