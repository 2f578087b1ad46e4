// src/models/response.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'question_responses' table.
/// One row per (attempt, question); grading overwrites it in place.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub attempt_id: Uuid,
    pub question_id: Uuid,

    /// `None` means the learner left the question unanswered.
    pub option_id: Option<Uuid>,

    pub is_correct: bool,
    pub score: f64,
    pub time_seconds: Option<i32>,

    /// Generated error analysis for incorrect answers.
    pub comment: Option<String>,
}
