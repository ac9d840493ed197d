//! Completion handoff: assemble the final intake record and forward
//! it, exactly once per session, to the archival sink.

use chrono::Utc;
use uuid::Uuid;

use super::session::CallSession;
use crate::archive::record::{CallMetadata, ConsentBlock, IntakeRecord, SectionResponses};
use crate::archive::sink::ArchivalSink;
use crate::script::catalog;
use crate::script::question::Section;
use crate::telephony::actions::mask_call_id;

/// Assemble the archival document from a closed session.
///
/// Responses are partitioned by catalog section; keys the caller
/// never answered are absent. Keys the catalog does not know are
/// dropped with a warning — they cannot occur through the dispatcher.
pub fn build_record(session: &CallSession) -> IntakeRecord {
    let mut responses = SectionResponses::default();
    for (key, answer) in session.responses() {
        let target = match catalog::section_of(key) {
            Some(Section::History) => &mut responses.history,
            Some(Section::StructuredHistory) => &mut responses.structured_history,
            Some(Section::FamilyHistory) => &mut responses.family_history,
            _ => {
                tracing::warn!(key, "Response key outside the intake catalog dropped");
                continue;
            }
        };
        target.insert(key.to_string(), answer.clone());
    }

    IntakeRecord {
        record_id: Uuid::new_v4(),
        call: CallMetadata {
            external_call_id: session.external_call_id.clone(),
            outcome: session.state,
            direction: session.direction,
            from_number: session.from_number.clone(),
            to_number: session.to_number.clone(),
            started_at: session.started_at,
            answered_at: session.answered_at,
            ended_at: session.ended_at,
            duration_seconds: session.duration_seconds,
            recording_url: session.recording_url.clone(),
            recording_id: session.recording_id.clone(),
        },
        consent: ConsentBlock {
            given: session.consent_given,
            timestamp: session.consent_timestamp,
        },
        responses,
        transcripts: session.transcripts().to_vec(),
        completed_at: session.ended_at.unwrap_or_else(Utc::now),
    }
}

/// One best-effort submission. Sink failure is a warning, never a
/// retry and never a teardown blocker.
pub fn forward(sink: &dyn ArchivalSink, record: &IntakeRecord) {
    match sink.submit(record) {
        Ok(()) => tracing::info!(
            record = %record.record_id,
            call = %mask_call_id(&record.call.external_call_id),
            answers = record.responses.total(),
            "Intake record handed off"
        ),
        Err(e) => tracing::warn!(
            record = %record.record_id,
            error = %e,
            "Archive submission failed; record not retried"
        ),
    }
}
