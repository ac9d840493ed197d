//! The intake script: question catalog plus the cursor engine that
//! decides what to ask next and how an answer moves the conversation.

pub mod catalog;
pub mod engine;
pub mod question;

pub use engine::ScriptCursor;
pub use question::{FollowUp, Question, QuestionKind, Section};
