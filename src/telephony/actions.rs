//! The Telephony Action Interface.
//!
//! Three one-way commands the dispatcher issues toward the transport.
//! Success means the command was accepted for delivery; what happens
//! on the wire comes back later as inbound events, or not at all.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelephonyError {
    #[error("Cannot reach the telephony API at {0}")]
    Connection(String),

    #[error("Telephony request timed out after {0}s")]
    Timeout(u64),

    #[error("Telephony API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Outbound commands toward the telephony transport.
///
/// All three are fire-and-forget: the dispatcher never blocks waiting
/// for the spoken audio or the gather to finish, only for the command
/// to be accepted.
pub trait TelephonyActions: Send + Sync {
    /// Speak `text` to the caller via TTS.
    fn speak(&self, call_id: &str, text: &str) -> Result<(), TelephonyError>;

    /// Speak `text`, then gather keypad input constrained to
    /// `accepted_digits` and at most `max_digits` symbols.
    fn collect_input(
        &self,
        call_id: &str,
        text: &str,
        accepted_digits: &str,
        max_digits: u8,
    ) -> Result<(), TelephonyError>;

    /// Terminate the call.
    fn hang_up(&self, call_id: &str) -> Result<(), TelephonyError>;
}

/// Mask a phone number for log lines: keep two digits at each end.
///
/// Log output must never carry a full patient number.
pub fn mask_number(number: &str) -> String {
    if number.len() > 4 {
        format!(
            "{}{}{}",
            &number[..2],
            "*".repeat(number.len() - 4),
            &number[number.len() - 2..]
        )
    } else {
        "***".to_string()
    }
}

/// Mask a call control id for log lines: keep the last six characters.
pub fn mask_call_id(call_id: &str) -> String {
    if call_id.len() > 6 {
        format!("...{}", &call_id[call_id.len() - 6..])
    } else {
        call_id.to_string()
    }
}
