//! Resolves a recording identifier to a time-limited download URL.

use backon::Retryable;
use serde::Deserialize;
use tracing::{error, warn};

use crate::graph::error::{GraphError, GraphResult};
use crate::graph::retry::read_backoff;

#[derive(Debug, Deserialize)]
struct RecordingList {
    #[serde(default)]
    value: Vec<RecordingItem>,
}

#[derive(Debug, Deserialize)]
struct RecordingItem {
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    download_url: Option<String>,
}

pub struct RecordingResolver {
    client: reqwest::Client,
    base_url: String,
}

impl RecordingResolver {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Looks up the recording's download URL. `None` covers both "not ready
    /// yet" (empty collection, missing attribute) and upstream failure; the
    /// distinction only shows up in the logs.
    pub async fn resolve(&self, recording_id: &str, token: &str) -> Option<String> {
        match self.fetch_download_url(recording_id, token).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                warn!(recording_id, "No download URL available for recording yet");
                None
            }
            Err(e) => {
                error!(recording_id, "Failed to look up recording: {e}");
                None
            }
        }
    }

    async fn fetch_download_url(
        &self,
        recording_id: &str,
        token: &str,
    ) -> GraphResult<Option<String>> {
        let url = format!(
            "{}/communications/callRecords/{}/recordings",
            self.base_url, recording_id
        );

        let list = (|| async {
            let response = self.client.get(&url).bearer_auth(token).send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(GraphError::Api { status, body });
            }
            Ok(response.json::<RecordingList>().await?)
        })
        .retry(read_backoff())
        .when(GraphError::is_transient)
        .notify(|err: &GraphError, delay| {
            warn!("Recording lookup failed, retrying in {:?}: {}", delay, err);
        })
        .await?;

        Ok(list.value.into_iter().next().and_then(|r| r.download_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_comes_from_first_item() {
        let raw = r#"{
            "value": [
                {"@microsoft.graph.downloadUrl": "https://media/one.mp4"},
                {"@microsoft.graph.downloadUrl": "https://media/two.mp4"}
            ]
        }"#;

        let list: RecordingList = serde_json::from_str(raw).unwrap();
        let url = list.value.into_iter().next().and_then(|r| r.download_url);
        assert_eq!(url.as_deref(), Some("https://media/one.mp4"));
    }

    #[test]
    fn missing_attribute_yields_none() {
        let raw = r#"{"value": [{"id": "rec-1"}]}"#;
        let list: RecordingList = serde_json::from_str(raw).unwrap();
        assert!(list
            .value
            .into_iter()
            .next()
            .and_then(|r| r.download_url)
            .is_none());
    }

    #[test]
    fn empty_collection_yields_none() {
        let list: RecordingList = serde_json::from_str(r#"{"value": []}"#).unwrap();
        assert!(list.value.into_iter().next().is_none());
    }
}
