//! Forwards resolved recording URLs to the downstream transcription service.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::TranscriptionConfig;

/// Where resolved recordings go. Single attempt per call; retrying failed
/// submissions is deliberately out of scope.
#[async_trait]
pub trait TranscriptionSink: Send + Sync {
    async fn forward(&self, video_url: &str, title: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct TranscriptionRequest<'a> {
    video_url: &'a str,
    title: &'a str,
}

/// Posts `{video_url, title}` to the transcription API, optionally
/// authenticated with a static API key header.
pub struct HttpTranscriptionSink {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTranscriptionSink {
    pub fn new(client: reqwest::Client, config: &TranscriptionConfig) -> Self {
        Self {
            client,
            endpoint: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl TranscriptionSink for HttpTranscriptionSink {
    async fn forward(&self, video_url: &str, title: &str) -> Result<()> {
        let body = TranscriptionRequest { video_url, title };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(512).collect();
            bail!("Transcription API returned {status}: {snippet}");
        }

        info!(title, "Recording submitted for transcription");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sink_for(server: &MockServer, api_key: Option<&str>) -> HttpTranscriptionSink {
        HttpTranscriptionSink::new(
            reqwest::Client::new(),
            &TranscriptionConfig {
                api_url: format!("{}/transcribe", server.uri()),
                api_key: api_key.map(str::to_string),
            },
        )
    }

    #[tokio::test]
    async fn forwards_url_and_title_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .and(body_json(serde_json::json!({
                "video_url": "https://media/xyz.mp4",
                "title": "Teams Meeting - abc"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let sink = sink_for(&server, None);
        assert!(sink
            .forward("https://media/xyz.mp4", "Teams Meeting - abc")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn sends_api_key_header_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .and(header("x-api-key", "k3y"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let sink = sink_for(&server, Some("k3y"));
        assert!(sink.forward("https://media/a.mp4", "t").await.is_ok());
    }

    #[tokio::test]
    async fn non_2xx_is_an_error_with_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad url"))
            .mount(&server)
            .await;

        let sink = sink_for(&server, None);
        let err = sink.forward("https://media/a.mp4", "t").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("422"));
        assert!(message.contains("bad url"));
    }
}
