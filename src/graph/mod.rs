//! Microsoft Graph client: authentication, webhook subscription lifecycle,
//! and recording download-URL lookup.

pub mod auth;
pub mod error;
pub mod recordings;
mod retry;
pub mod subscriptions;

pub use auth::TokenProvider;
pub use error::{GraphError, GraphResult};
pub use recordings::RecordingResolver;
pub use subscriptions::{Subscription, SubscriptionManager};

use std::time::Duration;

/// Every outbound Graph call is bounded by this timeout; a timeout surfaces as
/// a transport-level `GraphError`.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client for Graph and downstream calls.
pub fn http_client() -> GraphResult<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}
