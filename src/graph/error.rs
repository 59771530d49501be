//! Error types for Microsoft Graph interactions.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias using `GraphError`.
pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    /// The client-credentials exchange was rejected or failed in transit.
    /// Non-retriable within a request; callers surface it as a 500.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Non-2xx response from the Graph API.
    #[error("Graph API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    /// HTTP transport error (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    /// True when the upstream reported the resource as gone, e.g. renewing a
    /// subscription that already expired provider-side.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// True for failures worth retrying on idempotent reads: transport
    /// errors, 5xx, and 429. Auth rejections and other 4xx are final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_only_matches_404() {
        let not_found = GraphError::Api {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        };
        let forbidden = GraphError::Api {
            status: StatusCode::FORBIDDEN,
            body: String::new(),
        };

        assert!(not_found.is_not_found());
        assert!(!forbidden.is_not_found());
    }

    #[test]
    fn server_errors_and_throttling_are_transient() {
        let unavailable = GraphError::Api {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };
        let throttled = GraphError::Api {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        let bad_request = GraphError::Api {
            status: StatusCode::BAD_REQUEST,
            body: String::new(),
        };

        assert!(unavailable.is_transient());
        assert!(throttled.is_transient());
        assert!(!bad_request.is_transient());
        assert!(!GraphError::Auth("rejected".to_string()).is_transient());
    }
}
