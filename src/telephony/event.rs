//! Inbound telephony events.
//!
//! Events arrive from the transport as webhook JSON; this module maps
//! the wire envelope onto [`CallEvent`]. Unrecognized event types map
//! to [`EventKind::Other`] instead of failing, so new transport events
//! never break the dispatcher.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Invalid webhook payload: {0}")]
    InvalidEnvelope(#[from] serde_json::Error),

    #[error("Webhook event {event_type} carries no call_control_id")]
    MissingCallId { event_type: String },
}

/// Which leg originated the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// One inbound event, tagged with the call it pertains to.
#[derive(Debug, Clone)]
pub struct CallEvent {
    /// The transport's durable call identifier.
    pub call_id: String,
    pub kind: EventKind,
}

impl CallEvent {
    pub fn new(call_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            call_id: call_id.into(),
            kind,
        }
    }

    /// Parse a Telnyx Call Control webhook body.
    pub fn from_webhook_json(raw: &str) -> Result<Self, EventError> {
        let envelope: WebhookEnvelope = serde_json::from_str(raw)?;
        let WebhookData {
            event_type,
            payload,
        } = envelope.data;

        let call_id = payload
            .get("call_control_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| EventError::MissingCallId {
                event_type: event_type.clone(),
            })?;

        let kind = match event_type.as_str() {
            "call.initiated" => EventKind::CallInitiated {
                direction: parse_direction(&payload),
                from: string_field(&payload, "from"),
                to: string_field(&payload, "to"),
            },
            "call.answered" => EventKind::CallAnswered {
                from: string_field(&payload, "from"),
                to: string_field(&payload, "to"),
            },
            "call.hangup" => EventKind::CallEnded,
            "call.gather.ended" => EventKind::InputReceived {
                // A gather timeout reports no digits; the dispatcher
                // treats the empty string as one invalid attempt.
                digits: string_field(&payload, "digits").unwrap_or_default(),
            },
            "call.recording.saved" => EventKind::RecordingSaved {
                url: payload
                    .get("recording_urls")
                    .and_then(|urls| urls.get("mp3"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                recording_id: string_field(&payload, "recording_id"),
            },
            "call.transcription" => EventKind::TranscriptionSegment {
                text: string_field(&payload, "transcript").unwrap_or_default(),
                confidence: payload
                    .get("confidence")
                    .and_then(|v| v.as_f64())
                    .map(|v| v as f32),
                is_final: payload
                    .get("is_final")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            },
            _ => EventKind::Other(event_type),
        };

        Ok(Self { call_id, kind })
    }
}

/// Event payloads, one variant per transport event the state machine
/// understands plus a catch-all for everything it ignores.
#[derive(Debug, Clone)]
pub enum EventKind {
    CallInitiated {
        direction: Option<CallDirection>,
        from: Option<String>,
        to: Option<String>,
    },
    CallAnswered {
        from: Option<String>,
        to: Option<String>,
    },
    CallEnded,
    InputReceived {
        digits: String,
    },
    RecordingSaved {
        url: Option<String>,
        recording_id: Option<String>,
    },
    TranscriptionSegment {
        text: String,
        confidence: Option<f32>,
        is_final: bool,
    },
    /// Recognized envelope, unrecognized event type. Logged, ignored.
    Other(String),
}

impl EventKind {
    /// Short tag for log lines.
    pub fn tag(&self) -> &str {
        match self {
            Self::CallInitiated { .. } => "call-initiated",
            Self::CallAnswered { .. } => "call-answered",
            Self::CallEnded => "call-ended",
            Self::InputReceived { .. } => "input-received",
            Self::RecordingSaved { .. } => "recording-saved",
            Self::TranscriptionSegment { .. } => "transcription-segment",
            Self::Other(tag) => tag,
        }
    }
}

#[derive(Deserialize)]
struct WebhookEnvelope {
    data: WebhookData,
}

#[derive(Deserialize)]
struct WebhookData {
    event_type: String,
    #[serde(default)]
    payload: serde_json::Value,
}

fn string_field(payload: &serde_json::Value, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn parse_direction(payload: &serde_json::Value) -> Option<CallDirection> {
    match payload.get("direction").and_then(|v| v.as_str()) {
        Some("incoming") | Some("inbound") => Some(CallDirection::Inbound),
        Some("outgoing") | Some("outbound") => Some(CallDirection::Outbound),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(event_type: &str, payload: serde_json::Value) -> String {
        serde_json::json!({
            "data": { "event_type": event_type, "payload": payload }
        })
        .to_string()
    }

    #[test]
    fn parses_gather_ended_digits() {
        let raw = envelope(
            "call.gather.ended",
            serde_json::json!({ "call_control_id": "cc-1", "digits": "1" }),
        );
        let event = CallEvent::from_webhook_json(&raw).unwrap();
        assert_eq!(event.call_id, "cc-1");
        match event.kind {
            EventKind::InputReceived { digits } => assert_eq!(digits, "1"),
            other => panic!("unexpected kind: {}", other.tag()),
        }
    }

    #[test]
    fn gather_timeout_yields_empty_digits() {
        let raw = envelope(
            "call.gather.ended",
            serde_json::json!({ "call_control_id": "cc-1" }),
        );
        let event = CallEvent::from_webhook_json(&raw).unwrap();
        match event.kind {
            EventKind::InputReceived { digits } => assert!(digits.is_empty()),
            other => panic!("unexpected kind: {}", other.tag()),
        }
    }

    #[test]
    fn parses_initiated_direction_and_numbers() {
        let raw = envelope(
            "call.initiated",
            serde_json::json!({
                "call_control_id": "cc-2",
                "direction": "incoming",
                "from": "+15550100",
                "to": "+15550199",
            }),
        );
        let event = CallEvent::from_webhook_json(&raw).unwrap();
        match event.kind {
            EventKind::CallInitiated {
                direction,
                from,
                to,
            } => {
                assert_eq!(direction, Some(CallDirection::Inbound));
                assert_eq!(from.as_deref(), Some("+15550100"));
                assert_eq!(to.as_deref(), Some("+15550199"));
            }
            other => panic!("unexpected kind: {}", other.tag()),
        }
    }

    #[test]
    fn parses_recording_saved_mp3_url() {
        let raw = envelope(
            "call.recording.saved",
            serde_json::json!({
                "call_control_id": "cc-3",
                "recording_id": "rec-9",
                "recording_urls": { "mp3": "https://cdn.example/rec-9.mp3" },
            }),
        );
        let event = CallEvent::from_webhook_json(&raw).unwrap();
        match event.kind {
            EventKind::RecordingSaved { url, recording_id } => {
                assert_eq!(url.as_deref(), Some("https://cdn.example/rec-9.mp3"));
                assert_eq!(recording_id.as_deref(), Some("rec-9"));
            }
            other => panic!("unexpected kind: {}", other.tag()),
        }
    }

    #[test]
    fn parses_transcription_segment() {
        let raw = envelope(
            "call.transcription",
            serde_json::json!({
                "call_control_id": "cc-4",
                "transcript": "penicillin",
                "confidence": 0.93,
                "is_final": true,
            }),
        );
        let event = CallEvent::from_webhook_json(&raw).unwrap();
        match event.kind {
            EventKind::TranscriptionSegment {
                text,
                confidence,
                is_final,
            } => {
                assert_eq!(text, "penicillin");
                assert!(is_final);
                assert!(confidence.unwrap() > 0.9);
            }
            other => panic!("unexpected kind: {}", other.tag()),
        }
    }

    #[test]
    fn unknown_event_type_maps_to_other() {
        let raw = envelope(
            "call.speak.ended",
            serde_json::json!({ "call_control_id": "cc-5" }),
        );
        let event = CallEvent::from_webhook_json(&raw).unwrap();
        match event.kind {
            EventKind::Other(tag) => assert_eq!(tag, "call.speak.ended"),
            other => panic!("unexpected kind: {}", other.tag()),
        }
    }

    #[test]
    fn missing_call_control_id_is_an_error() {
        let raw = envelope("call.answered", serde_json::json!({}));
        let err = CallEvent::from_webhook_json(&raw).unwrap_err();
        assert!(matches!(err, EventError::MissingCallId { .. }));
    }

    #[test]
    fn malformed_envelope_is_an_error() {
        assert!(CallEvent::from_webhook_json("{\"nope\": 1}").is_err());
        assert!(CallEvent::from_webhook_json("not json").is_err());
    }
}
