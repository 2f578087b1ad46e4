// src/models/attempt.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of an attempt.
/// `IN_PROGRESS` is the only state that accepts a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptState {
    InProgress,
    Graded,
    Abandoned,
}

impl AttemptState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptState::InProgress => "IN_PROGRESS",
            AttemptState::Graded => "GRADED",
            AttemptState::Abandoned => "ABANDONED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptState::InProgress)
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown attempt state: {0}")]
pub struct UnknownAttemptState(pub String);

impl TryFrom<String> for AttemptState {
    type Error = UnknownAttemptState;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "IN_PROGRESS" => Ok(AttemptState::InProgress),
            "GRADED" => Ok(AttemptState::Graded),
            "ABANDONED" => Ok(AttemptState::Abandoned),
            _ => Err(UnknownAttemptState(value)),
        }
    }
}

/// Represents the 'attempts' table in the database.
/// `score_total` and `percent` stay `None` until the attempt is graded.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub learner_id: Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    #[sqlx(try_from = "String")]
    pub state: AttemptState,
    pub score_total: Option<f64>,
    pub percent: Option<f64>,
}

/// Represents the 'quizzes' table, restricted to what attempts need.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    /// `None` means unlimited attempts.
    pub attempt_limit: Option<i32>,
    pub is_active: bool,
}

/// DTO for listing a learner's attempts on one quiz.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttemptListResponse {
    pub attempts: Vec<Attempt>,
    pub total: usize,
}
