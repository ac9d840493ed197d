//! Core types for the intake question script.
//!
//! Questions are immutable static data: the whole script is wired up
//! at compile time in [`crate::script::catalog`] and never mutated.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════
// Question
// ═══════════════════════════════════════════

/// How a question expects its answer to arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    /// Keypad selection. `accepted_digits` is the set of allowed DTMF
    /// symbols; `max_digits` bounds the gather length.
    TouchTone {
        accepted_digits: &'static str,
        max_digits: u8,
    },
    /// Free-form spoken answer, captured verbatim from transcription.
    Voice,
    /// Spoken statement; nothing is collected.
    Statement,
}

impl QuestionKind {
    pub fn is_voice(&self) -> bool {
        matches!(self, Self::Voice)
    }

    pub fn is_touch_tone(&self) -> bool {
        matches!(self, Self::TouchTone { .. })
    }
}

/// A conditional follow-up, issued when its parent question is
/// answered with `trigger` and then treated as an ordinary question.
#[derive(Debug)]
pub struct FollowUp {
    pub trigger: &'static str,
    pub question: Question,
}

/// One scripted question.
#[derive(Debug)]
pub struct Question {
    /// Unique key within the catalog; also the response-map key.
    pub key: &'static str,
    /// The text spoken to the caller.
    pub prompt: &'static str,
    pub kind: QuestionKind,
    /// At most one follow-up per question, keyed by a single answer
    /// value. Kept on the question itself so the engine stays purely
    /// data-driven.
    pub follow_up: Option<&'static FollowUp>,
}

impl Question {
    /// The follow-up question to issue for `answer`, if any.
    pub fn follow_up_for(&self, answer: &str) -> Option<&'static Question> {
        match self.follow_up {
            Some(f) if f.trigger == answer => Some(&f.question),
            _ => None,
        }
    }

    /// Whether a gathered digit string is a valid answer.
    ///
    /// Every symbol must be in the accepted set and the length must
    /// fit the gather bound. Voice and statement questions never
    /// validate digits.
    pub fn accepts_digits(&self, digits: &str) -> bool {
        match self.kind {
            QuestionKind::TouchTone {
                accepted_digits,
                max_digits,
            } => {
                !digits.is_empty()
                    && digits.len() <= max_digits as usize
                    && digits.chars().all(|c| accepted_digits.contains(c))
            }
            QuestionKind::Voice | QuestionKind::Statement => false,
        }
    }
}

// ═══════════════════════════════════════════
// Section
// ═══════════════════════════════════════════

/// The fixed section order of the intake interview.
///
/// Consent and closing are singletons handled specially by the
/// dispatcher; the three middle sections carry the answerable
/// questions the cursor walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Consent,
    History,
    StructuredHistory,
    FamilyHistory,
    Closing,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consent => "consent",
            Self::History => "history",
            Self::StructuredHistory => "structured_history",
            Self::FamilyHistory => "family_history",
            Self::Closing => "closing",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "consent" => Some(Self::Consent),
            "history" => Some(Self::History),
            "structured_history" => Some(Self::StructuredHistory),
            "family_history" => Some(Self::FamilyHistory),
            "closing" => Some(Self::Closing),
            _ => None,
        }
    }

    /// The answerable intake sections, in traversal order.
    pub fn intake_order() -> &'static [Section] {
        &[Self::History, Self::StructuredHistory, Self::FamilyHistory]
    }

    /// The section after `self` in intake order, if any.
    pub fn next_intake(self) -> Option<Section> {
        match self {
            Self::History => Some(Self::StructuredHistory),
            Self::StructuredHistory => Some(Self::FamilyHistory),
            Self::Consent | Self::FamilyHistory | Self::Closing => None,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YES_NO: QuestionKind = QuestionKind::TouchTone {
        accepted_digits: "12",
        max_digits: 1,
    };

    static DETAIL: FollowUp = FollowUp {
        trigger: "1",
        question: Question {
            key: "detail",
            prompt: "Tell me more.",
            kind: QuestionKind::Voice,
            follow_up: None,
        },
    };

    static PARENT: Question = Question {
        key: "parent",
        prompt: "Yes or no?",
        kind: YES_NO,
        follow_up: Some(&DETAIL),
    };

    #[test]
    fn follow_up_matches_trigger_only() {
        assert_eq!(PARENT.follow_up_for("1").map(|q| q.key), Some("detail"));
        assert!(PARENT.follow_up_for("2").is_none());
        assert!(DETAIL.question.follow_up_for("1").is_none());
    }

    #[test]
    fn accepts_digits_within_set_and_length() {
        assert!(PARENT.accepts_digits("1"));
        assert!(PARENT.accepts_digits("2"));
        assert!(!PARENT.accepts_digits("3"));
        assert!(!PARENT.accepts_digits("12"));
        assert!(!PARENT.accepts_digits(""));
    }

    #[test]
    fn multi_digit_answers_respect_max() {
        let pain = Question {
            key: "pain",
            prompt: "Rate your pain.",
            kind: QuestionKind::TouchTone {
                accepted_digits: "0123456789",
                max_digits: 2,
            },
            follow_up: None,
        };
        assert!(pain.accepts_digits("7"));
        assert!(pain.accepts_digits("10"));
        assert!(!pain.accepts_digits("100"));
        assert!(!pain.accepts_digits("1a"));
    }

    #[test]
    fn voice_questions_reject_digits() {
        assert!(!DETAIL.question.accepts_digits("1"));
    }

    #[test]
    fn section_roundtrip() {
        for section in [
            Section::Consent,
            Section::History,
            Section::StructuredHistory,
            Section::FamilyHistory,
            Section::Closing,
        ] {
            assert_eq!(Section::from_str(section.as_str()), Some(section));
        }
        assert_eq!(Section::from_str("unknown"), None);
    }

    #[test]
    fn intake_order_chains_through_next() {
        let order = Section::intake_order();
        assert_eq!(order.len(), 3);
        assert_eq!(order[0].next_intake(), Some(order[1]));
        assert_eq!(order[1].next_intake(), Some(order[2]));
        assert_eq!(order[2].next_intake(), None);
    }

    #[test]
    fn section_serde_uses_snake_case() {
        let json = serde_json::to_string(&Section::StructuredHistory).unwrap();
        assert_eq!(json, "\"structured_history\"");
    }
}
