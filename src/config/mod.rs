use anyhow::{Context, Result};
use std::path::PathBuf;

const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
const DEFAULT_GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_RENEWAL_INTERVAL_MINUTES: u64 = 45;

#[derive(Debug, Clone)]
pub struct Config {
    pub graph: GraphConfig,
    pub transcription: TranscriptionConfig,
    pub webhook: WebhookConfig,
    pub server: ServerConfig,
    pub renewal: RenewalConfig,
    /// Where the active subscription record is persisted.
    pub state_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub base_url: String,
    pub login_base_url: String,
    pub scope: String,
}

impl GraphConfig {
    /// OAuth2 token endpoint for the client-credentials exchange.
    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.login_base_url, self.tenant_id)
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    pub api_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Shared secret echoed back by Graph in every notification. Notifications
    /// carrying a different value are rejected.
    pub client_state: String,
    /// Public URL of the /webhook endpoint. When set, the service keeps a
    /// subscription alive on its own (bootstrap + re-create after expiry).
    pub notification_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct RenewalConfig {
    pub interval_minutes: u64,
}

impl Config {
    /// Builds the full configuration from environment variables. Called once
    /// at startup; components receive their slice of it by injection.
    pub fn from_env() -> Result<Self> {
        let graph = GraphConfig {
            client_id: required("MICROSOFT_CLIENT_ID")?,
            client_secret: required("MICROSOFT_CLIENT_SECRET")?,
            tenant_id: required("MICROSOFT_TENANT_ID")?,
            base_url: optional("GRAPH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string()),
            login_base_url: optional("GRAPH_LOGIN_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LOGIN_BASE_URL.to_string()),
            scope: optional("GRAPH_SCOPE").unwrap_or_else(|| DEFAULT_GRAPH_SCOPE.to_string()),
        };

        let transcription = TranscriptionConfig {
            api_url: required("TRANSCRIPTION_API_URL")?,
            api_key: optional("TRANSCRIPTION_API_KEY"),
        };

        let webhook = WebhookConfig {
            client_state: required("WEBHOOK_CLIENT_STATE")?,
            notification_url: optional("WEBHOOK_NOTIFICATION_URL"),
        };

        let server = ServerConfig {
            port: match optional("PORT") {
                Some(raw) => raw.parse().context("PORT must be a valid port number")?,
                None => DEFAULT_PORT,
            },
        };

        let renewal = RenewalConfig {
            interval_minutes: match optional("RENEWAL_INTERVAL_MINUTES") {
                Some(raw) => raw
                    .parse()
                    .context("RENEWAL_INTERVAL_MINUTES must be a number of minutes")?,
                None => DEFAULT_RENEWAL_INTERVAL_MINUTES,
            },
        };

        let state_file = match optional("STATE_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_state_file()?,
        };

        Ok(Self {
            graph,
            transcription,
            webhook,
            server,
            renewal,
            state_file,
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("Missing required environment variable {name}"))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn default_state_file() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .context("Unable to determine data directory")?;
    Ok(dir.join("teams-watcher").join("subscription.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_url_joins_login_base_and_tenant() {
        let graph = GraphConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            tenant_id: "tenant-123".to_string(),
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            login_base_url: DEFAULT_LOGIN_BASE_URL.to_string(),
            scope: DEFAULT_GRAPH_SCOPE.to_string(),
        };

        assert_eq!(
            graph.token_url(),
            "https://login.microsoftonline.com/tenant-123/oauth2/v2.0/token"
        );
    }
}
