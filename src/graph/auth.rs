//! OAuth2 client-credentials authentication for Microsoft Graph.

use backon::Retryable;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::GraphConfig;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::retry::read_backoff;

/// Token response from the identity provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// True if the token is expired or will expire within the grace period.
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

/// Obtains bearer tokens for Graph calls, caching them until shortly before
/// expiry. Silent (cached) acquisition first, client-credentials exchange on
/// a miss.
pub struct TokenProvider {
    client: reqwest::Client,
    config: GraphConfig,
    cached: Arc<RwLock<Option<CachedToken>>>,
    /// Refresh this long before the provider-reported expiry.
    grace_period: Duration,
}

impl TokenProvider {
    pub fn new(client: reqwest::Client, config: GraphConfig) -> Self {
        Self {
            client,
            config,
            cached: Arc::new(RwLock::new(None)),
            grace_period: Duration::minutes(5),
        }
    }

    /// Returns a valid access token, exchanging credentials if the cache is
    /// empty or stale.
    pub async fn get_token(&self) -> GraphResult<String> {
        {
            let cache = self.cached.read().await;
            if let Some(ref token) = *cache {
                if !token.is_expired(self.grace_period) {
                    debug!("Using cached access token");
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!("Acquiring fresh access token");
        let token = (|| self.exchange())
            .retry(read_backoff())
            .when(GraphError::is_transient)
            .notify(|err: &GraphError, delay| {
                warn!("Token exchange failed, retrying in {:?}: {}", delay, err);
            })
            .await
            .map_err(|e| match e {
                GraphError::Auth(_) => e,
                other => GraphError::Auth(other.to_string()),
            })?;

        let access_token = token.access_token.clone();
        {
            let mut cache = self.cached.write().await;
            *cache = Some(token);
        }

        Ok(access_token)
    }

    /// Performs the client-credentials exchange against the identity provider.
    async fn exchange(&self) -> GraphResult<CachedToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", self.config.scope.as_str()),
        ];

        // Transport errors and 5xx stay in their transient-checkable form so
        // the retry policy can act on them; get_token folds the final failure
        // into an Auth error.
        let response = self
            .client
            .post(self.config.token_url())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(GraphError::Api { status, body });
            }
            return Err(GraphError::Auth(format!(
                "Token request rejected with status {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GraphError::Auth(format!("Failed to parse token response: {e}")))?;

        let expires_at = Utc::now() + Duration::seconds(token.expires_in);
        debug!("Acquired access token, expires at {}", expires_at);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at,
        })
    }

    /// Drops the cached token so the next call performs a fresh exchange.
    pub async fn invalidate(&self) {
        let mut cache = self.cached.write().await;
        *cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_expiry_honors_grace_period() {
        let token = CachedToken {
            access_token: "t".to_string(),
            expires_at: Utc::now() + Duration::minutes(10),
        };

        assert!(!token.is_expired(Duration::minutes(5)));
        assert!(token.is_expired(Duration::minutes(15)));
    }

    #[test]
    fn already_expired_token_is_expired() {
        let token = CachedToken {
            access_token: "t".to_string(),
            expires_at: Utc::now() - Duration::minutes(1),
        };

        assert!(token.is_expired(Duration::minutes(0)));
    }
}
