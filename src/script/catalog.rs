//! The built-in intake script.
//!
//! Static, ordered definition of every section and question, including
//! per-answer follow-ups. Loaded once at compile time; safe for
//! unsynchronized concurrent reads.

use super::question::{FollowUp, Question, QuestionKind, Section};

// ═══════════════════════════════════════════
// Fixed scripted statements
// ═══════════════════════════════════════════

/// Spoken after consent is granted, before the first question.
pub const CONSENT_ACK: &str =
    "Thank you for providing consent. Let's begin with a few health questions.";

/// Farewell when the caller declines consent.
pub const DECLINE_FAREWELL: &str = "I understand. Thank you for your time. Goodbye.";

/// Farewell when the retry budget is exhausted.
pub const RETRY_FAREWELL: &str =
    "I'm sorry, we were not able to process your responses. \
     A member of our care team will contact you directly. Goodbye.";

/// Closing statement after the last question.
pub const CLOSING: &str =
    "Thank you for completing the health intake questionnaire. \
     Your information has been recorded and will be reviewed by a healthcare provider. \
     You will be contacted soon. Goodbye.";

// ═══════════════════════════════════════════
// Consent
// ═══════════════════════════════════════════

/// The consent gather. Handled specially by the dispatcher: "1"
/// grants, "2" declines, anything else re-prompts.
pub static CONSENT: Question = Question {
    key: "consent",
    prompt: "Hello, this is an automated health intake call. Before we begin, \
             I need your consent to record this conversation and collect your \
             health information. Press 1 to provide consent, or press 2 to decline.",
    kind: QuestionKind::TouchTone {
        accepted_digits: "12",
        max_digits: 1,
    },
    follow_up: None,
};

pub const CONSENT_GRANT_DIGIT: &str = "1";
pub const CONSENT_DECLINE_DIGIT: &str = "2";

// ═══════════════════════════════════════════
// History of the presenting complaint
// ═══════════════════════════════════════════

static HISTORY: [Question; 3] = [
    Question {
        key: "chief_complaint",
        prompt: "What is the main health concern that brings you in today? \
                 After the beep, please describe your symptoms.",
        kind: QuestionKind::Voice,
        follow_up: None,
    },
    Question {
        key: "symptom_duration",
        prompt: "How long have you been experiencing these symptoms? \
                 Press 1 for less than a day, 2 for 1-3 days, 3 for 4-7 days, \
                 or 4 for more than a week.",
        kind: QuestionKind::TouchTone {
            accepted_digits: "1234",
            max_digits: 1,
        },
        follow_up: None,
    },
    Question {
        key: "pain_level",
        prompt: "On a scale of 1 to 10, with 10 being the worst pain, how would \
                 you rate your pain level? Please press a number from 0 to 10.",
        kind: QuestionKind::TouchTone {
            accepted_digits: "0123456789",
            max_digits: 2,
        },
        follow_up: None,
    },
];

// ═══════════════════════════════════════════
// Structured medical history
// ═══════════════════════════════════════════

static ALLERGIES_DETAIL: FollowUp = FollowUp {
    trigger: "1",
    question: Question {
        key: "allergies_detail",
        prompt: "Please describe your medication allergies after the beep.",
        kind: QuestionKind::Voice,
        follow_up: None,
    },
};

static MEDICATIONS_DETAIL: FollowUp = FollowUp {
    trigger: "1",
    question: Question {
        key: "medications_detail",
        prompt: "Please list your current medications after the beep.",
        kind: QuestionKind::Voice,
        follow_up: None,
    },
};

static PAST_HISTORY_DETAIL: FollowUp = FollowUp {
    trigger: "1",
    question: Question {
        key: "past_medical_history_detail",
        prompt: "Please describe your past medical conditions after the beep.",
        kind: QuestionKind::Voice,
        follow_up: None,
    },
};

static STRUCTURED_HISTORY: [Question; 4] = [
    Question {
        key: "allergies",
        prompt: "Do you have any known allergies to medications? \
                 Press 1 for yes, 2 for no.",
        kind: QuestionKind::TouchTone {
            accepted_digits: "12",
            max_digits: 1,
        },
        follow_up: Some(&ALLERGIES_DETAIL),
    },
    Question {
        key: "medications",
        prompt: "Are you currently taking any medications? Press 1 for yes, 2 for no.",
        kind: QuestionKind::TouchTone {
            accepted_digits: "12",
            max_digits: 1,
        },
        follow_up: Some(&MEDICATIONS_DETAIL),
    },
    Question {
        key: "past_medical_history",
        prompt: "Do you have any significant past medical conditions? \
                 Press 1 for yes, 2 for no.",
        kind: QuestionKind::TouchTone {
            accepted_digits: "12",
            max_digits: 1,
        },
        follow_up: Some(&PAST_HISTORY_DETAIL),
    },
    Question {
        key: "last_meal",
        prompt: "When was your last meal? Press 1 for within the last hour, \
                 2 for 1-3 hours ago, 3 for 3-6 hours ago, or 4 for more than 6 hours ago.",
        kind: QuestionKind::TouchTone {
            accepted_digits: "1234",
            max_digits: 1,
        },
        follow_up: None,
    },
];

// ═══════════════════════════════════════════
// Family history
// ═══════════════════════════════════════════

static FAMILY_HISTORY: [Question; 3] = [
    Question {
        key: "heart_disease",
        prompt: "Does anyone in your immediate family have a history of heart \
                 disease? Press 1 for yes, 2 for no.",
        kind: QuestionKind::TouchTone {
            accepted_digits: "12",
            max_digits: 1,
        },
        follow_up: None,
    },
    Question {
        key: "diabetes",
        prompt: "Does anyone in your immediate family have diabetes? \
                 Press 1 for yes, 2 for no.",
        kind: QuestionKind::TouchTone {
            accepted_digits: "12",
            max_digits: 1,
        },
        follow_up: None,
    },
    Question {
        key: "cancer",
        prompt: "Is there a history of cancer in your immediate family? \
                 Press 1 for yes, 2 for no.",
        kind: QuestionKind::TouchTone {
            accepted_digits: "12",
            max_digits: 1,
        },
        follow_up: None,
    },
];

// ═══════════════════════════════════════════
// Lookup
// ═══════════════════════════════════════════

/// The ordered questions of an intake section. Consent and closing
/// carry no cursor-driven questions.
pub fn questions(section: Section) -> &'static [Question] {
    match section {
        Section::History => &HISTORY,
        Section::StructuredHistory => &STRUCTURED_HISTORY,
        Section::FamilyHistory => &FAMILY_HISTORY,
        Section::Consent | Section::Closing => &[],
    }
}

/// The section a response key belongs to, follow-up keys included.
/// `None` for keys the script never produces.
pub fn section_of(key: &str) -> Option<Section> {
    if key == CONSENT.key {
        return Some(Section::Consent);
    }
    for &section in Section::intake_order() {
        for question in questions(section) {
            if question.key == key {
                return Some(section);
            }
            if let Some(f) = question.follow_up {
                if f.question.key == key {
                    return Some(section);
                }
            }
        }
    }
    None
}

/// Look up any question (follow-ups included) by key.
pub fn question_by_key(key: &str) -> Option<&'static Question> {
    if key == CONSENT.key {
        return Some(&CONSENT);
    }
    for &section in Section::intake_order() {
        for question in questions(section) {
            if question.key == key {
                return Some(question);
            }
            if let Some(f) = question.follow_up {
                if f.question.key == key {
                    return Some(&f.question);
                }
            }
        }
    }
    None
}
