//! HTTP archive backend: a single POST of the completed record.

use super::record::IntakeRecord;
use super::sink::{ArchivalSink, ArchiveError};
use crate::config::Settings;
use crate::telephony::actions::mask_call_id;

/// Request timeout for the archival POST.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Blocking HTTP sink for a configured archive backend.
pub struct HttpArchiveSink {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpArchiveSink {
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Self {
        Self::with_timeout(endpoint, api_key, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(endpoint: &str, api_key: Option<&str>, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            client,
            timeout_secs,
        }
    }

    /// Build a sink from settings, `None` when no backend is
    /// configured (callers fall back to [`super::NullSink`]).
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        settings
            .archive_api_url
            .as_deref()
            .map(|url| Self::new(url, settings.archive_api_key.as_deref()))
    }
}

impl ArchivalSink for HttpArchiveSink {
    fn submit(&self, record: &IntakeRecord) -> Result<(), ArchiveError> {
        let mut request = self.client.post(&self.endpoint).json(record);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_connect() {
                ArchiveError::Connection(self.endpoint.clone())
            } else if e.is_timeout() {
                ArchiveError::Timeout(self.timeout_secs)
            } else {
                ArchiveError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ArchiveError::Api {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(
            record = %record.record_id,
            call = %mask_call_id(&record.call.external_call_id),
            "Intake record pushed to archive backend"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let sink = HttpArchiveSink::new("https://backend.example/api/intake/", None);
        assert_eq!(sink.endpoint, "https://backend.example/api/intake");
    }

    #[test]
    fn from_settings_requires_an_endpoint() {
        let mut settings = Settings {
            telnyx_api_key: "KEY".into(),
            telnyx_connection_id: "conn".into(),
            telnyx_phone_number: "+15550100".into(),
            public_url: "http://localhost:5000".into(),
            archive_api_url: None,
            archive_api_key: None,
            recording_enabled: true,
            transcription_enabled: true,
            max_call_duration_secs: 1800,
        };
        assert!(HttpArchiveSink::from_settings(&settings).is_none());

        settings.archive_api_url = Some("https://backend.example/api/intake".into());
        settings.archive_api_key = Some("token".into());
        let sink = HttpArchiveSink::from_settings(&settings).unwrap();
        assert_eq!(sink.api_key.as_deref(), Some("token"));
    }
}
