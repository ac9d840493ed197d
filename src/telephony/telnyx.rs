//! Telnyx Call Control v2 client.
//!
//! Implements the Telephony Action Interface over the REST API and
//! adds outbound dialing for intake campaigns. Log lines carry masked
//! identifiers only.

use serde::{Deserialize, Serialize};

use super::actions::{mask_call_id, mask_number, TelephonyActions, TelephonyError};
use crate::config::Settings;

/// Production API base.
const DEFAULT_BASE_URL: &str = "https://api.telnyx.com/v2";

/// Request timeout for action commands.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How long a gather waits for the caller before reporting no input.
const GATHER_TIMEOUT_MILLIS: u32 = 10_000;

/// TTS voice and language used for every prompt.
const VOICE: &str = "female";
const LANGUAGE: &str = "en-US";

/// Blocking HTTP client for the Telnyx Call Control API.
pub struct TelnyxClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl TelnyxClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS)
    }

    /// Client against a non-default base URL (tests, mock servers).
    pub fn with_base_url(api_key: &str, base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.telnyx_api_key)
    }

    /// Place an outbound intake call.
    ///
    /// Recording starts from answer when enabled in settings; the
    /// transport reports everything that follows through webhooks at
    /// `settings.public_url`.
    pub fn dial(&self, settings: &Settings, to_number: &str) -> Result<DialResult, TelephonyError> {
        let webhook_url = format!("{}/webhooks/telnyx", settings.public_url);
        let body = DialRequest {
            connection_id: &settings.telnyx_connection_id,
            to: to_number,
            from: &settings.telnyx_phone_number,
            webhook_url: &webhook_url,
            webhook_url_method: "POST",
            record: settings.recording_enabled.then_some("record-from-answer"),
            record_format: settings.recording_enabled.then_some("mp3"),
            record_channels: settings.recording_enabled.then_some("single"),
            time_limit_secs: settings.max_call_duration_secs,
        };

        let url = format!("{}/calls", self.base_url);
        let response = self.send(self.client.post(&url).json(&body))?;
        let parsed: DialEnvelope = response
            .json()
            .map_err(|e| TelephonyError::HttpClient(e.to_string()))?;

        tracing::info!(
            to = %mask_number(to_number),
            call = %mask_call_id(&parsed.data.call_control_id),
            "Call initiated"
        );
        Ok(parsed.data)
    }

    fn post_action(
        &self,
        call_id: &str,
        action: &str,
        body: &impl Serialize,
    ) -> Result<(), TelephonyError> {
        let url = format!("{}/calls/{}/actions/{}", self.base_url, call_id, action);
        self.send(self.client.post(&url).json(body))?;
        Ok(())
    }

    fn send(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, TelephonyError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    TelephonyError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    TelephonyError::Timeout(self.timeout_secs)
                } else {
                    TelephonyError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TelephonyError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl TelephonyActions for TelnyxClient {
    fn speak(&self, call_id: &str, text: &str) -> Result<(), TelephonyError> {
        self.post_action(
            call_id,
            "speak",
            &SpeakRequest {
                payload: text,
                voice: VOICE,
                language: LANGUAGE,
            },
        )?;
        // Prompt text is scripted but answers are not; keep both out
        // of the logs.
        tracing::info!(call = %mask_call_id(call_id), "Speaking to call");
        Ok(())
    }

    fn collect_input(
        &self,
        call_id: &str,
        text: &str,
        accepted_digits: &str,
        max_digits: u8,
    ) -> Result<(), TelephonyError> {
        self.post_action(
            call_id,
            "gather_using_speak",
            &GatherRequest {
                payload: text,
                voice: VOICE,
                language: LANGUAGE,
                valid_digits: accepted_digits,
                maximum_digits: max_digits,
                timeout_millis: GATHER_TIMEOUT_MILLIS,
            },
        )?;
        tracing::info!(call = %mask_call_id(call_id), "Gathering input from call");
        Ok(())
    }

    fn hang_up(&self, call_id: &str) -> Result<(), TelephonyError> {
        self.post_action(call_id, "hangup", &serde_json::json!({}))?;
        tracing::info!(call = %mask_call_id(call_id), "Call hung up");
        Ok(())
    }
}

// ── Wire types ──────────────────────────────────────────────

#[derive(Serialize)]
struct SpeakRequest<'a> {
    payload: &'a str,
    voice: &'a str,
    language: &'a str,
}

#[derive(Serialize)]
struct GatherRequest<'a> {
    payload: &'a str,
    voice: &'a str,
    language: &'a str,
    valid_digits: &'a str,
    maximum_digits: u8,
    timeout_millis: u32,
}

#[derive(Serialize)]
struct DialRequest<'a> {
    connection_id: &'a str,
    to: &'a str,
    from: &'a str,
    webhook_url: &'a str,
    webhook_url_method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    record_format: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    record_channels: Option<&'a str>,
    time_limit_secs: u32,
}

#[derive(Deserialize)]
struct DialEnvelope {
    data: DialResult,
}

/// Identifiers Telnyx assigns to a freshly dialed call.
#[derive(Debug, Clone, Deserialize)]
pub struct DialResult {
    pub call_control_id: String,
    #[serde(default)]
    pub call_leg_id: Option<String>,
    #[serde(default)]
    pub call_session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = TelnyxClient::with_base_url("KEY", "https://api.telnyx.com/v2/", 10);
        assert_eq!(client.base_url, "https://api.telnyx.com/v2");
        assert_eq!(client.timeout_secs, 10);
    }

    #[test]
    fn default_base_is_production() {
        let client = TelnyxClient::new("KEY");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn gather_request_serializes_constraints() {
        let body = GatherRequest {
            payload: "Press 1 or 2.",
            voice: VOICE,
            language: LANGUAGE,
            valid_digits: "12",
            maximum_digits: 1,
            timeout_millis: GATHER_TIMEOUT_MILLIS,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["valid_digits"], "12");
        assert_eq!(json["maximum_digits"], 1);
        assert_eq!(json["timeout_millis"], 10_000);
    }

    #[test]
    fn dial_request_omits_recording_when_disabled() {
        let body = DialRequest {
            connection_id: "conn-1",
            to: "+15550100",
            from: "+15550199",
            webhook_url: "https://example.org/webhooks/telnyx",
            webhook_url_method: "POST",
            record: None,
            record_format: None,
            record_channels: None,
            time_limit_secs: 1800,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("record"));
    }

    #[test]
    fn dial_result_parses_envelope() {
        let raw = r#"{"data": {"call_control_id": "cc-1", "call_leg_id": "leg-1"}}"#;
        let parsed: DialEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data.call_control_id, "cc-1");
        assert_eq!(parsed.data.call_leg_id.as_deref(), Some("leg-1"));
        assert!(parsed.data.call_session_id.is_none());
    }
}
