//! Change-notification decoding and the per-notification processing pipeline.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::graph::{RecordingResolver, TokenProvider};
use crate::transcription::TranscriptionSink;

/// A single event delivered in a notification batch. Only `created` is
/// actionable; everything else is filtered as a no-op.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    #[serde(default)]
    pub change_type: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub client_state: Option<String>,
}

/// One webhook delivery: an ordered batch of notifications, processed
/// independently with no ordering guarantee.
#[derive(Debug, Deserialize)]
pub struct NotificationBatch {
    #[serde(default)]
    pub value: Vec<ChangeNotification>,
}

/// Call and recording identifiers parsed out of a resource path.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordingRef {
    pub call_id: String,
    pub recording_id: String,
}

/// Parses a resource path of the form
/// `communications/callRecords/{callId}/recordings/{recordingId}`: the
/// recording id is the last segment, the call id the third-from-last.
/// Requires at least four segments and a literal `recordings` segment.
pub fn parse_resource(resource: &str) -> Option<RecordingRef> {
    let parts: Vec<&str> = resource.split('/').collect();
    if parts.len() < 4 || !parts.contains(&"recordings") {
        return None;
    }

    Some(RecordingRef {
        call_id: parts[parts.len() - 3].to_string(),
        recording_id: parts[parts.len() - 1].to_string(),
    })
}

/// Aggregate result of one webhook delivery. `processed` never exceeds
/// `total`; the HTTP layer acknowledges with 200 either way.
#[derive(Debug, Clone, Copy)]
pub struct BatchOutcome {
    pub processed: usize,
    pub total: usize,
}

/// Runs each notification through resolve-then-forward, isolating failures so
/// one bad notification never aborts its siblings.
pub struct NotificationPipeline {
    tokens: Arc<TokenProvider>,
    resolver: RecordingResolver,
    sink: Arc<dyn TranscriptionSink>,
    client_state: String,
}

impl NotificationPipeline {
    pub fn new(
        tokens: Arc<TokenProvider>,
        resolver: RecordingResolver,
        sink: Arc<dyn TranscriptionSink>,
        client_state: String,
    ) -> Self {
        Self {
            tokens,
            resolver,
            sink,
            client_state,
        }
    }

    pub async fn process(&self, batch: &NotificationBatch) -> BatchOutcome {
        let mut processed = 0;
        for notification in &batch.value {
            if self.process_one(notification).await {
                processed += 1;
            }
        }

        BatchOutcome {
            processed,
            total: batch.value.len(),
        }
    }

    async fn process_one(&self, notification: &ChangeNotification) -> bool {
        // Fresh correlation id per notification; there is no cross-request
        // identity to carry.
        let correlation_id = Uuid::new_v4();

        info!(
            %correlation_id,
            change_type = %notification.change_type,
            resource = %notification.resource,
            "Processing notification"
        );

        // The shared secret set at subscription time must be echoed back.
        if notification.client_state.as_deref() != Some(self.client_state.as_str()) {
            warn!(%correlation_id, "Rejecting notification with missing or wrong clientState");
            return false;
        }

        if notification.change_type != "created" {
            info!(
                %correlation_id,
                "Ignoring notification of type {}", notification.change_type
            );
            return true;
        }

        let token = match self.tokens.get_token().await {
            Ok(token) => token,
            Err(e) => {
                error!(%correlation_id, "Could not acquire access token: {e}");
                return false;
            }
        };

        let Some(recording) = parse_resource(&notification.resource) else {
            warn!(
                %correlation_id,
                resource = %notification.resource,
                "Unrecognized resource format"
            );
            return false;
        };

        info!(
            %correlation_id,
            recording_id = %recording.recording_id,
            call_id = %recording.call_id,
            "Processing recording"
        );

        let Some(download_url) = self.resolver.resolve(&recording.recording_id, &token).await
        else {
            error!(
                %correlation_id,
                recording_id = %recording.recording_id,
                "Could not obtain download URL"
            );
            return false;
        };

        let title = format!("Teams Meeting - {}", recording.call_id);
        match self.sink.forward(&download_url, &title).await {
            Ok(()) => {
                info!(
                    %correlation_id,
                    recording_id = %recording.recording_id,
                    "Recording sent for transcription"
                );
                true
            }
            Err(e) => {
                error!(
                    %correlation_id,
                    recording_id = %recording.recording_id,
                    "Failed to send recording for transcription: {e}"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_and_recording_ids_positionally() {
        let parsed = parse_resource("communications/callRecords/abc/recordings/xyz").unwrap();
        assert_eq!(
            parsed,
            RecordingRef {
                call_id: "abc".to_string(),
                recording_id: "xyz".to_string(),
            }
        );
    }

    #[test]
    fn parses_longer_paths_from_the_end() {
        let parsed =
            parse_resource("v1.0/communications/callRecords/call-9/recordings/rec-7").unwrap();
        assert_eq!(parsed.call_id, "call-9");
        assert_eq!(parsed.recording_id, "rec-7");
    }

    #[test]
    fn rejects_paths_with_fewer_than_four_segments() {
        assert!(parse_resource("recordings/xyz").is_none());
        assert!(parse_resource("a/recordings/xyz").is_none());
    }

    #[test]
    fn rejects_paths_without_recordings_segment() {
        assert!(parse_resource("communications/callRecords/abc/transcripts/xyz").is_none());
    }

    #[test]
    fn rejects_empty_resource() {
        assert!(parse_resource("").is_none());
    }

    #[test]
    fn batch_decodes_graph_payload() {
        let raw = r#"{
            "value": [
                {"changeType": "created", "resource": "communications/callRecords/abc/recordings/xyz", "clientState": "s"}
            ]
        }"#;

        let batch: NotificationBatch = serde_json::from_str(raw).unwrap();
        assert_eq!(batch.value.len(), 1);
        assert_eq!(batch.value[0].change_type, "created");
        assert_eq!(batch.value[0].client_state.as_deref(), Some("s"));
    }

    #[test]
    fn batch_tolerates_missing_fields() {
        let batch: NotificationBatch = serde_json::from_str(r#"{"value": [{}]}"#).unwrap();
        assert_eq!(batch.value[0].change_type, "");
        assert!(batch.value[0].client_state.is_none());
    }
}
