//! The mutable unit of conversation state: one [`CallSession`] per
//! live call, mutated only under the store's per-session lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::script::ScriptCursor;
use crate::telephony::CallDirection;

// ═══════════════════════════════════════════
// Conversation states
// ═══════════════════════════════════════════

/// Top-level conversation state. `InIntake` is parameterized by the
/// session's cursor but is a single logical state here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Ringing,
    Answered,
    AwaitingConsent,
    ConsentDeclined,
    InIntake,
    Completing,
    Completed,
    Failed,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ringing => "ringing",
            Self::Answered => "answered",
            Self::AwaitingConsent => "awaiting_consent",
            Self::ConsentDeclined => "consent_declined",
            Self::InIntake => "in_intake",
            Self::Completing => "completing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Terminal states accept no further conversation transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ConsentDeclined | Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Captured data
// ═══════════════════════════════════════════

/// One captured answer, stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedAnswer {
    pub value: String,
    pub captured_at: DateTime<Utc>,
}

/// Who a transcript segment is attributed to. Without diarization
/// everything the transport transcribes is attributed to the patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Agent,
    Patient,
}

/// One live-transcription segment, in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub speaker: Speaker,
    pub text: String,
    pub confidence: Option<f32>,
    pub is_final: bool,
    pub sequence: u32,
    pub captured_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════
// CallSession
// ═══════════════════════════════════════════

/// All conversation state for one call.
///
/// The conversation genuinely suspends between inbound events, so
/// everything needed to continue lives here; no call stack spans two
/// events.
#[derive(Debug)]
pub struct CallSession {
    pub external_call_id: String,
    pub state: CallState,
    pub cursor: ScriptCursor,
    pub consent_given: bool,
    pub consent_timestamp: Option<DateTime<Utc>>,
    /// Invalid attempts for the currently pending gather.
    pub retry_count: u8,
    pub direction: Option<CallDirection>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub started_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub recording_url: Option<String>,
    pub recording_id: Option<String>,
    responses: Vec<(&'static str, CapturedAnswer)>,
    transcripts: Vec<TranscriptSegment>,
    handed_off: bool,
}

impl CallSession {
    pub fn new(external_call_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            external_call_id: external_call_id.into(),
            state: CallState::Ringing,
            cursor: ScriptCursor::start(),
            consent_given: false,
            consent_timestamp: None,
            retry_count: 0,
            direction: None,
            from_number: None,
            to_number: None,
            started_at: now,
            answered_at: None,
            ended_at: None,
            duration_seconds: None,
            recording_url: None,
            recording_id: None,
            responses: Vec::new(),
            transcripts: Vec::new(),
            handed_off: false,
        }
    }

    /// Record affirmative consent. Irreversible: the first grant wins
    /// and the timestamp is set exactly once.
    pub fn grant_consent(&mut self, at: DateTime<Utc>) {
        if !self.consent_given {
            self.consent_given = true;
            self.consent_timestamp = Some(at);
        }
    }

    /// Append a captured answer.
    ///
    /// Refused (with a warning) before consent and for keys already
    /// captured; the script never revisits a question, so a duplicate
    /// write indicates a transition bug rather than caller behavior.
    pub fn record_answer(&mut self, key: &'static str, value: &str, at: DateTime<Utc>) {
        if !self.consent_given {
            tracing::warn!(key, "Refusing to record answer before consent");
            return;
        }
        if self.responses.iter().any(|(k, _)| *k == key) {
            tracing::warn!(key, "Duplicate answer for question key ignored");
            return;
        }
        self.responses.push((
            key,
            CapturedAnswer {
                value: value.to_string(),
                captured_at: at,
            },
        ));
    }

    /// Answered questions in capture order.
    pub fn responses(&self) -> &[(&'static str, CapturedAnswer)] {
        &self.responses
    }

    pub fn has_response(&self, key: &str) -> bool {
        self.responses.iter().any(|(k, _)| *k == key)
    }

    /// Append a transcription segment with the next sequence number.
    pub fn add_transcript(
        &mut self,
        text: &str,
        confidence: Option<f32>,
        is_final: bool,
        at: DateTime<Utc>,
    ) {
        let sequence = self.transcripts.len() as u32;
        self.transcripts.push(TranscriptSegment {
            speaker: Speaker::Patient,
            text: text.to_string(),
            confidence,
            is_final,
            sequence,
            captured_at: at,
        });
    }

    pub fn transcripts(&self) -> &[TranscriptSegment] {
        &self.transcripts
    }

    /// Stamp call end and compute the answered-to-end duration.
    pub fn close(&mut self, at: DateTime<Utc>) {
        self.ended_at = Some(at);
        self.duration_seconds = self
            .answered_at
            .map(|answered| (at - answered).num_seconds());
    }

    /// Claim the one completion handoff for this session. Returns
    /// `true` exactly once.
    pub fn claim_handoff(&mut self) -> bool {
        if self.handed_off {
            false
        } else {
            self.handed_off = true;
            true
        }
    }

    pub fn handoff_claimed(&self) -> bool {
        self.handed_off
    }
}
