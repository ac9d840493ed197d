use std::env;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Careline";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// Environment variables required for live call handling.
const REQUIRED_KEYS: &[&str] = &[
    "TELNYX_API_KEY",
    "TELNYX_CONNECTION_ID",
    "TELNYX_PHONE_NUMBER",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingKeys(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Runtime settings, loaded once from the environment at startup.
///
/// Only the Telnyx credentials are required; the archive backend and
/// the recording/transcription toggles are optional and default to a
/// service that runs calls but archives nowhere.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Telnyx API key (bearer token for Call Control v2).
    pub telnyx_api_key: String,
    /// Telnyx Call Control connection id used when dialing out.
    pub telnyx_connection_id: String,
    /// Caller id for outbound intake calls.
    pub telnyx_phone_number: String,
    /// Publicly reachable base URL Telnyx posts call events to.
    pub public_url: String,
    /// Archive backend endpoint; `None` disables archival entirely.
    pub archive_api_url: Option<String>,
    /// Optional bearer token for the archive backend.
    pub archive_api_key: Option<String>,
    /// Record calls from answer (sent with the dial command).
    pub recording_enabled: bool,
    /// Request live transcription on answered calls.
    pub transcription_enabled: bool,
    /// Hard ceiling on call length, enforced by the transport.
    pub max_call_duration_secs: u32,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// Missing optional keys fall back to defaults; missing required
    /// keys are only reported by [`Settings::validate`], so tests and
    /// offline tooling can build a `Settings` without credentials.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            telnyx_api_key: env_or_default("TELNYX_API_KEY", ""),
            telnyx_connection_id: env_or_default("TELNYX_CONNECTION_ID", ""),
            telnyx_phone_number: env_or_default("TELNYX_PHONE_NUMBER", ""),
            public_url: env_or_default("PUBLIC_URL", "http://localhost:5000"),
            archive_api_url: env::var("ARCHIVE_API_URL").ok().filter(|v| !v.is_empty()),
            archive_api_key: env::var("ARCHIVE_API_KEY").ok().filter(|v| !v.is_empty()),
            recording_enabled: env_flag("RECORDING_ENABLED", true)?,
            transcription_enabled: env_flag("TRANSCRIPTION_ENABLED", true)?,
            max_call_duration_secs: env_u32("MAX_CALL_DURATION", 1800)?,
        })
    }

    /// Verify every required key is present, naming the missing ones.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            &self.telnyx_api_key,
            &self.telnyx_connection_id,
            &self.telnyx_phone_number,
        ];
        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .zip(values)
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| *k)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingKeys(missing.join(", ")))
        }
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: v,
            }),
        },
    }
}

fn env_u32(key: &str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: v,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_settings() -> Settings {
        Settings {
            telnyx_api_key: String::new(),
            telnyx_connection_id: String::new(),
            telnyx_phone_number: String::new(),
            public_url: "http://localhost:5000".into(),
            archive_api_url: None,
            archive_api_key: None,
            recording_enabled: true,
            transcription_enabled: true,
            max_call_duration_secs: 1800,
        }
    }

    #[test]
    fn validate_names_all_missing_keys() {
        let settings = blank_settings();
        let err = settings.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("TELNYX_API_KEY"));
        assert!(msg.contains("TELNYX_CONNECTION_ID"));
        assert!(msg.contains("TELNYX_PHONE_NUMBER"));
    }

    #[test]
    fn validate_passes_with_credentials() {
        let mut settings = blank_settings();
        settings.telnyx_api_key = "KEY".into();
        settings.telnyx_connection_id = "conn-1".into();
        settings.telnyx_phone_number = "+15550100".into();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn validate_reports_partial_missing() {
        let mut settings = blank_settings();
        settings.telnyx_api_key = "KEY".into();
        let msg = settings.validate().unwrap_err().to_string();
        assert!(!msg.contains("TELNYX_API_KEY,"));
        assert!(msg.contains("TELNYX_CONNECTION_ID"));
    }

    #[test]
    fn app_name_is_careline() {
        assert_eq!(APP_NAME, "Careline");
    }

    #[test]
    fn default_filter_scopes_to_crate() {
        assert!(default_log_filter().ends_with("=info"));
    }
}
