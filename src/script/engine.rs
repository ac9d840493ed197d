//! The script engine: pure cursor arithmetic over the static catalog.
//!
//! Given a session's progress cursor, computes the next question to
//! issue (crossing section boundaries, expanding follow-ups) and how
//! an accepted answer moves the cursor. Input validation happens in
//! the dispatcher before anything reaches this module.

use super::catalog;
use super::question::{Question, Section};

/// Position within the ordered question sequence.
///
/// `pending_follow_up` holds a follow-up that was triggered by the
/// last answer and must be issued before the normal advance resumes.
#[derive(Debug, Clone, Copy)]
pub struct ScriptCursor {
    pub section: Section,
    pub index: usize,
    pub pending_follow_up: Option<&'static Question>,
}

impl ScriptCursor {
    /// Cursor at the start of the intake questionnaire.
    pub fn start() -> Self {
        Self {
            section: Section::History,
            index: 0,
            pending_follow_up: None,
        }
    }
}

impl Default for ScriptCursor {
    fn default() -> Self {
        Self::start()
    }
}

/// The next question to issue for `cursor`, or `None` when the
/// questionnaire is exhausted.
///
/// Normalizes the cursor across section boundaries as a side effect
/// (advancing to the next section and resetting the index when a
/// section's list is spent), so calling it repeatedly without an
/// intervening answer returns the same question.
pub fn next_question(cursor: &mut ScriptCursor) -> Option<&'static Question> {
    if let Some(follow_up) = cursor.pending_follow_up {
        return Some(follow_up);
    }
    loop {
        let questions = catalog::questions(cursor.section);
        if cursor.index < questions.len() {
            return Some(&questions[cursor.index]);
        }
        cursor.section = cursor.section.next_intake()?;
        cursor.index = 0;
    }
}

/// Move the cursor past `answered`, expanding a follow-up if the
/// answer value triggers one.
///
/// A triggered follow-up becomes the next question, ahead of the
/// normal advance; once the follow-up itself is answered the cursor
/// resumes from the question after its parent.
pub fn advance(cursor: &mut ScriptCursor, answered: &'static Question, answer: &str) {
    if cursor
        .pending_follow_up
        .is_some_and(|f| std::ptr::eq(f, answered))
    {
        cursor.pending_follow_up = None;
        cursor.index += 1;
        return;
    }
    match answered.follow_up_for(answer) {
        Some(follow_up) => cursor.pending_follow_up = Some(follow_up),
        None => cursor.index += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walk the whole script answering every question with `answer`.
    fn walk(answer: &str) -> Vec<&'static str> {
        let mut cursor = ScriptCursor::start();
        let mut asked = Vec::new();
        while let Some(q) = next_question(&mut cursor) {
            asked.push(q.key);
            advance(&mut cursor, q, answer);
        }
        asked
    }

    #[test]
    fn no_answers_trigger_no_follow_ups() {
        let asked = walk("2");
        assert_eq!(
            asked,
            vec![
                "chief_complaint",
                "symptom_duration",
                "pain_level",
                "allergies",
                "medications",
                "past_medical_history",
                "last_meal",
                "heart_disease",
                "diabetes",
                "cancer",
            ]
        );
    }

    #[test]
    fn yes_answers_expand_every_follow_up() {
        let asked = walk("1");
        assert_eq!(
            asked,
            vec![
                "chief_complaint",
                "symptom_duration",
                "pain_level",
                "allergies",
                "allergies_detail",
                "medications",
                "medications_detail",
                "past_medical_history",
                "past_medical_history_detail",
                "last_meal",
                "heart_disease",
                "diabetes",
                "cancer",
            ]
        );
    }

    #[test]
    fn follow_up_is_issued_immediately_then_resumes() {
        let mut cursor = ScriptCursor {
            section: Section::StructuredHistory,
            index: 0,
            pending_follow_up: None,
        };
        let allergies = next_question(&mut cursor).unwrap();
        assert_eq!(allergies.key, "allergies");

        advance(&mut cursor, allergies, "1");
        let detail = next_question(&mut cursor).unwrap();
        assert_eq!(detail.key, "allergies_detail");

        advance(&mut cursor, detail, "penicillin");
        let resumed = next_question(&mut cursor).unwrap();
        assert_eq!(resumed.key, "medications");
    }

    #[test]
    fn resumed_question_matches_no_follow_up_path() {
        // The question after "allergies" must be the same whether or
        // not the follow-up was expanded.
        let mut with_follow_up = ScriptCursor {
            section: Section::StructuredHistory,
            index: 0,
            pending_follow_up: None,
        };
        let q = next_question(&mut with_follow_up).unwrap();
        advance(&mut with_follow_up, q, "1");
        let detail = next_question(&mut with_follow_up).unwrap();
        advance(&mut with_follow_up, detail, "shellfish");

        let mut without = ScriptCursor {
            section: Section::StructuredHistory,
            index: 0,
            pending_follow_up: None,
        };
        let q = next_question(&mut without).unwrap();
        advance(&mut without, q, "2");

        assert_eq!(
            next_question(&mut with_follow_up).unwrap().key,
            next_question(&mut without).unwrap().key,
        );
    }

    #[test]
    fn sections_traverse_in_fixed_order() {
        let mut cursor = ScriptCursor::start();
        let mut sections = Vec::new();
        while let Some(q) = next_question(&mut cursor) {
            if sections.last() != Some(&cursor.section) {
                sections.push(cursor.section);
            }
            advance(&mut cursor, q, "1");
        }
        assert_eq!(
            sections,
            vec![
                Section::History,
                Section::StructuredHistory,
                Section::FamilyHistory,
            ]
        );
    }

    #[test]
    fn exhausted_cursor_stays_exhausted() {
        let mut cursor = ScriptCursor {
            section: Section::FamilyHistory,
            index: catalog::questions(Section::FamilyHistory).len(),
            pending_follow_up: None,
        };
        assert!(next_question(&mut cursor).is_none());
        assert!(next_question(&mut cursor).is_none());
    }

    #[test]
    fn next_question_is_stable_without_an_answer() {
        let mut cursor = ScriptCursor::start();
        let first = next_question(&mut cursor).unwrap().key;
        let again = next_question(&mut cursor).unwrap().key;
        assert_eq!(first, again);
    }
}
