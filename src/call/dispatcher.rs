//! The event dispatcher / conversation state machine.
//!
//! Consumes inbound telephony events, serializes processing per call
//! via the session lock, drives state transitions, asks the script
//! engine what to say next, and issues telephony actions. The
//! conversation suspends between events; everything needed to resume
//! lives in the [`CallSession`].
//!
//! Anomaly policy: events for unknown or already-retired calls and
//! unrecognized event types are logged and ignored, never errors —
//! the transport redelivers at-least-once and grows new event types.

use std::sync::MutexGuard;

use chrono::Utc;
use thiserror::Error;

use super::handoff;
use super::session::{CallSession, CallState};
use super::store::{SessionHandle, SessionStore, StoreError};
use crate::archive::sink::ArchivalSink;
use crate::script::catalog;
use crate::script::engine;
use crate::script::question::Question;
use crate::telephony::actions::{mask_call_id, TelephonyActions, TelephonyError};
use crate::telephony::event::{CallDirection, CallEvent, EventError, EventKind};

/// Invalid attempts allowed per pending gather before the call fails.
const MAX_INPUT_ATTEMPTS: u8 = 3;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Telephony action failed: {0}")]
    Telephony(#[from] TelephonyError),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid inbound event: {0}")]
    Event(#[from] EventError),
}

/// The conversation state machine over all live calls.
///
/// `handle_event` is safe to call from any number of threads: the
/// store serializes transitions per call id, and calls never share
/// mutable state with each other.
pub struct EventDispatcher {
    store: SessionStore,
    telephony: Box<dyn TelephonyActions>,
    sink: Box<dyn ArchivalSink>,
}

impl EventDispatcher {
    pub fn new(telephony: Box<dyn TelephonyActions>, sink: Box<dyn ArchivalSink>) -> Self {
        Self {
            store: SessionStore::new(),
            telephony,
            sink,
        }
    }

    /// The live-session table (read access for hosts and tests).
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Parse a raw transport webhook body and process it.
    pub fn handle_webhook_json(&self, raw: &str) -> Result<(), DispatchError> {
        let event = CallEvent::from_webhook_json(raw)?;
        self.handle_event(event)
    }

    /// Process one inbound event.
    pub fn handle_event(&self, event: CallEvent) -> Result<(), DispatchError> {
        let CallEvent { call_id, kind } = event;
        tracing::debug!(
            call = %mask_call_id(&call_id),
            event = kind.tag(),
            "Handling call event"
        );
        match kind {
            EventKind::CallInitiated {
                direction,
                from,
                to,
            } => self.on_initiated(&call_id, direction, from, to),
            EventKind::CallAnswered { from, to } => self.on_answered(&call_id, from, to),
            EventKind::InputReceived { digits } => self.on_input(&call_id, &digits),
            EventKind::TranscriptionSegment {
                text,
                confidence,
                is_final,
            } => self.on_transcription(&call_id, &text, confidence, is_final),
            EventKind::RecordingSaved { url, recording_id } => {
                self.on_recording_saved(&call_id, url, recording_id)
            }
            EventKind::CallEnded => self.on_ended(&call_id),
            EventKind::Other(tag) => {
                tracing::debug!(
                    call = %mask_call_id(&call_id),
                    event = %tag,
                    "Ignoring unrecognized event type"
                );
                Ok(())
            }
        }
    }

    // ── Event handlers ──────────────────────────────────────

    fn on_initiated(
        &self,
        call_id: &str,
        direction: Option<CallDirection>,
        from: Option<String>,
        to: Option<String>,
    ) -> Result<(), DispatchError> {
        let (handle, created) = self.store.get_or_create(call_id, Utc::now())?;
        let mut session = self.lock(&handle)?;
        if !created && session.state != CallState::Ringing {
            tracing::info!(
                call = %mask_call_id(call_id),
                state = %session.state,
                "Duplicate call-initiated ignored"
            );
            return Ok(());
        }
        session.state = CallState::Ringing;
        fill_endpoints(&mut session, direction, from, to);
        tracing::info!(call = %mask_call_id(call_id), "Call ringing");
        Ok(())
    }

    fn on_answered(
        &self,
        call_id: &str,
        from: Option<String>,
        to: Option<String>,
    ) -> Result<(), DispatchError> {
        let (handle, _) = self.store.get_or_create(call_id, Utc::now())?;
        let mut session = self.lock(&handle)?;
        if session.state.is_terminal() {
            tracing::info!(
                call = %mask_call_id(call_id),
                "call-answered for terminal session ignored"
            );
            return Ok(());
        }
        if !matches!(session.state, CallState::Ringing | CallState::Answered) {
            tracing::info!(
                call = %mask_call_id(call_id),
                state = %session.state,
                "Duplicate call-answered ignored"
            );
            return Ok(());
        }

        session.state = CallState::Answered;
        if session.answered_at.is_none() {
            session.answered_at = Some(Utc::now());
        }
        fill_endpoints(&mut session, None, from, to);

        // Consent comes first, always; the conversation now suspends
        // until the gather reports back.
        match self.issue_question(call_id, &catalog::CONSENT) {
            Ok(()) => {
                session.state = CallState::AwaitingConsent;
                session.retry_count = 0;
                tracing::info!(
                    call = %mask_call_id(call_id),
                    "Call answered, requesting consent"
                );
                Ok(())
            }
            Err(e) => {
                self.fail_and_teardown(call_id, session);
                Err(e.into())
            }
        }
    }

    fn on_input(&self, call_id: &str, digits: &str) -> Result<(), DispatchError> {
        let Some(handle) = self.store.get(call_id)? else {
            tracing::warn!(
                call = %mask_call_id(call_id),
                "Input for unknown call ignored"
            );
            return Ok(());
        };
        let session = self.lock(&handle)?;
        match session.state {
            CallState::AwaitingConsent => self.on_consent_input(call_id, session, digits),
            CallState::InIntake => self.on_intake_input(call_id, session, digits),
            state if state.is_terminal() => {
                tracing::info!(
                    call = %mask_call_id(call_id),
                    state = %state,
                    "Input for terminal session ignored"
                );
                Ok(())
            }
            state => {
                tracing::warn!(
                    call = %mask_call_id(call_id),
                    state = %state,
                    "Input outside an active gather ignored"
                );
                Ok(())
            }
        }
    }

    fn on_consent_input(
        &self,
        call_id: &str,
        mut session: MutexGuard<'_, CallSession>,
        digits: &str,
    ) -> Result<(), DispatchError> {
        if digits == catalog::CONSENT_GRANT_DIGIT {
            session.grant_consent(Utc::now());
            session.state = CallState::InIntake;
            session.retry_count = 0;
            tracing::info!(call = %mask_call_id(call_id), "Consent granted");

            if let Err(e) = self.telephony.speak(call_id, catalog::CONSENT_ACK) {
                self.fail_and_teardown(call_id, session);
                return Err(e.into());
            }
            self.issue_next_or_complete(call_id, session)
        } else if digits == catalog::CONSENT_DECLINE_DIGIT {
            session.state = CallState::ConsentDeclined;
            tracing::info!(call = %mask_call_id(call_id), "Consent declined");

            let farewell = self
                .telephony
                .speak(call_id, catalog::DECLINE_FAREWELL)
                .and_then(|_| self.telephony.hang_up(call_id));
            if let Err(e) = farewell {
                self.fail_and_teardown(call_id, session);
                return Err(e.into());
            }
            Ok(())
        } else {
            self.handle_invalid_input(call_id, session, &catalog::CONSENT)
        }
    }

    fn on_intake_input(
        &self,
        call_id: &str,
        mut session: MutexGuard<'_, CallSession>,
        digits: &str,
    ) -> Result<(), DispatchError> {
        let Some(question) = engine::next_question(&mut session.cursor) else {
            tracing::warn!(
                call = %mask_call_id(call_id),
                "Input after questionnaire exhausted ignored"
            );
            return Ok(());
        };
        if question.kind.is_voice() {
            tracing::debug!(
                call = %mask_call_id(call_id),
                question = question.key,
                "Digits during a voice question ignored"
            );
            return Ok(());
        }
        if !question.accepts_digits(digits) {
            return self.handle_invalid_input(call_id, session, question);
        }

        session.retry_count = 0;
        session.record_answer(question.key, digits, Utc::now());
        engine::advance(&mut session.cursor, question, digits);
        self.issue_next_or_complete(call_id, session)
    }

    fn on_transcription(
        &self,
        call_id: &str,
        text: &str,
        confidence: Option<f32>,
        is_final: bool,
    ) -> Result<(), DispatchError> {
        let Some(handle) = self.store.get(call_id)? else {
            tracing::debug!(
                call = %mask_call_id(call_id),
                "Transcription for unknown call ignored"
            );
            return Ok(());
        };
        let mut session = self.lock(&handle)?;
        if session.state.is_terminal() {
            tracing::info!(
                call = %mask_call_id(call_id),
                "Transcription for terminal session ignored"
            );
            return Ok(());
        }

        session.add_transcript(text, confidence, is_final, Utc::now());

        // A final segment during a voice question is that question's
        // answer, stored verbatim.
        if session.state != CallState::InIntake || !is_final {
            return Ok(());
        }
        let Some(question) = engine::next_question(&mut session.cursor) else {
            return Ok(());
        };
        if !question.kind.is_voice() {
            return Ok(());
        }

        session.retry_count = 0;
        session.record_answer(question.key, text, Utc::now());
        engine::advance(&mut session.cursor, question, text);
        self.issue_next_or_complete(call_id, session)
    }

    fn on_recording_saved(
        &self,
        call_id: &str,
        url: Option<String>,
        recording_id: Option<String>,
    ) -> Result<(), DispatchError> {
        let Some(handle) = self.store.get(call_id)? else {
            tracing::debug!(
                call = %mask_call_id(call_id),
                "Recording for unknown call ignored"
            );
            return Ok(());
        };
        let mut session = self.lock(&handle)?;
        if session.recording_url.is_none() {
            session.recording_url = url;
        }
        if session.recording_id.is_none() {
            session.recording_id = recording_id;
        }
        tracing::info!(call = %mask_call_id(call_id), "Recording attached to call");
        Ok(())
    }

    fn on_ended(&self, call_id: &str) -> Result<(), DispatchError> {
        let Some(handle) = self.store.get(call_id)? else {
            tracing::debug!(
                call = %mask_call_id(call_id),
                "call-ended for unknown or already retired call ignored"
            );
            return Ok(());
        };
        let mut session = self.lock(&handle)?;
        if !session.claim_handoff() {
            tracing::info!(
                call = %mask_call_id(call_id),
                "Duplicate call-ended ignored"
            );
            return Ok(());
        }

        if !session.state.is_terminal() {
            session.state = if session.consent_given {
                CallState::Completed
            } else {
                CallState::Failed
            };
        }
        session.close(Utc::now());
        tracing::info!(
            call = %mask_call_id(call_id),
            outcome = %session.state,
            duration_seconds = session.duration_seconds,
            "Call ended"
        );

        let record = handoff::build_record(&session);
        drop(session);
        handoff::forward(self.sink.as_ref(), &record);
        self.store.remove(call_id)?;
        Ok(())
    }

    // ── Shared transition pieces ────────────────────────────

    fn lock<'a>(
        &self,
        handle: &'a SessionHandle,
    ) -> Result<MutexGuard<'a, CallSession>, DispatchError> {
        handle
            .lock()
            .map_err(|_| DispatchError::Store(StoreError::LockPoisoned))
    }

    /// Issue a question toward the transport: a gather for touch-tone
    /// questions, plain speech for voice prompts and statements.
    fn issue_question(&self, call_id: &str, question: &Question) -> Result<(), TelephonyError> {
        use crate::script::question::QuestionKind;
        match question.kind {
            QuestionKind::TouchTone {
                accepted_digits,
                max_digits,
            } => self
                .telephony
                .collect_input(call_id, question.prompt, accepted_digits, max_digits),
            QuestionKind::Voice | QuestionKind::Statement => {
                self.telephony.speak(call_id, question.prompt)
            }
        }
    }

    /// Ask the engine for the next question and issue it, or close
    /// out the questionnaire with the scripted statement.
    fn issue_next_or_complete(
        &self,
        call_id: &str,
        mut session: MutexGuard<'_, CallSession>,
    ) -> Result<(), DispatchError> {
        match engine::next_question(&mut session.cursor) {
            Some(question) => {
                if let Err(e) = self.issue_question(call_id, question) {
                    self.fail_and_teardown(call_id, session);
                    return Err(e.into());
                }
                tracing::info!(
                    call = %mask_call_id(call_id),
                    question = question.key,
                    "Question issued"
                );
                Ok(())
            }
            None => {
                session.state = CallState::Completing;
                tracing::info!(
                    call = %mask_call_id(call_id),
                    "Questionnaire complete, speaking closing statement"
                );
                if let Err(e) = self.telephony.speak(call_id, catalog::CLOSING) {
                    self.fail_and_teardown(call_id, session);
                    return Err(e.into());
                }
                Ok(())
            }
        }
    }

    /// One invalid (or absent) answer for the pending gather. Within
    /// budget: re-prompt. Budget spent: farewell, fail, hang up.
    fn handle_invalid_input(
        &self,
        call_id: &str,
        mut session: MutexGuard<'_, CallSession>,
        question: &'static Question,
    ) -> Result<(), DispatchError> {
        session.retry_count += 1;
        if session.retry_count >= MAX_INPUT_ATTEMPTS {
            tracing::warn!(
                call = %mask_call_id(call_id),
                question = question.key,
                "Retry budget exhausted, failing call"
            );
            session.state = CallState::Failed;
            let farewell = self
                .telephony
                .speak(call_id, catalog::RETRY_FAREWELL)
                .and_then(|_| self.telephony.hang_up(call_id));
            if let Err(e) = farewell {
                self.fail_and_teardown(call_id, session);
                return Err(e.into());
            }
            Ok(())
        } else {
            tracing::info!(
                call = %mask_call_id(call_id),
                question = question.key,
                attempt = session.retry_count,
                "Invalid input, re-prompting"
            );
            if let Err(e) = self.issue_question(call_id, question) {
                self.fail_and_teardown(call_id, session);
                return Err(e.into());
            }
            Ok(())
        }
    }

    /// Emergency teardown when an action toward the transport fails:
    /// mark the session failed, hang up best-effort, and hand off
    /// whatever partial data exists so nothing is silently lost.
    fn fail_and_teardown(&self, call_id: &str, mut session: MutexGuard<'_, CallSession>) {
        if !session.state.is_terminal() {
            session.state = CallState::Failed;
        }
        let _ = self.telephony.hang_up(call_id);

        let record = if session.claim_handoff() {
            session.close(Utc::now());
            Some(handoff::build_record(&session))
        } else {
            None
        };
        drop(session);

        if let Some(record) = record {
            handoff::forward(self.sink.as_ref(), &record);
        }
        if let Err(e) = self.store.remove(call_id) {
            tracing::warn!(
                call = %mask_call_id(call_id),
                error = %e,
                "Failed to retire session"
            );
        }
        tracing::warn!(
            call = %mask_call_id(call_id),
            "Session failed; torn down with partial data"
        );
    }
}

fn fill_endpoints(
    session: &mut CallSession,
    direction: Option<CallDirection>,
    from: Option<String>,
    to: Option<String>,
) {
    if session.direction.is_none() {
        session.direction = direction;
    }
    if session.from_number.is_none() {
        session.from_number = from;
    }
    if session.to_number.is_none() {
        session.to_number = to;
    }
}
