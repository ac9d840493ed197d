//! The structured intake document shipped to the archival sink.
//!
//! One record per session, assembled at teardown. Unanswered question
//! keys are simply absent from their section map, never null-filled.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::call::session::{CallState, CapturedAnswer, TranscriptSegment};
use crate::telephony::CallDirection;

/// The complete archival document for one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub record_id: Uuid,
    pub call: CallMetadata,
    pub consent: ConsentBlock,
    pub responses: SectionResponses,
    pub transcripts: Vec<TranscriptSegment>,
    pub completed_at: DateTime<Utc>,
}

/// Consent outcome. The timestamp is present exactly when consent was
/// affirmatively given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentBlock {
    pub given: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Call identifiers, endpoints and timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallMetadata {
    pub external_call_id: String,
    pub outcome: CallState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<CallDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_number: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_id: Option<String>,
}

/// Answered questions partitioned by intake section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionResponses {
    pub history: BTreeMap<String, CapturedAnswer>,
    pub structured_history: BTreeMap<String, CapturedAnswer>,
    pub family_history: BTreeMap<String, CapturedAnswer>,
}

impl SectionResponses {
    /// Total answered questions across all sections.
    pub fn total(&self) -> usize {
        self.history.len() + self.structured_history.len() + self.family_history.len()
    }

    /// Look up an answer in whichever section holds the key.
    pub fn get(&self, key: &str) -> Option<&CapturedAnswer> {
        self.history
            .get(key)
            .or_else(|| self.structured_history.get(key))
            .or_else(|| self.family_history.get(key))
    }
}
