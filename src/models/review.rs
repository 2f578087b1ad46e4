// src/models/review.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    question::{OptionView, TopicObjective},
    recommendation::RecommendedResource,
};

/// One submitted answer. `option_id: null` means "no answer".
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    #[serde(default)]
    pub option_id: Option<Uuid>,
    #[validate(range(min = 0, message = "time_seconds cannot be negative"))]
    #[serde(default)]
    pub time_seconds: Option<i32>,
}

/// DTO for finishing an attempt.
/// Answers are unordered across questions; duplicates resolve last-write-wins.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct FinishAttemptRequest {
    #[validate(length(max = 1000, message = "Too many answers submitted."), nested)]
    pub answers: Vec<SubmittedAnswer>,
}

/// Query flags for the finish endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FinishOptions {
    /// `false` forces the rule-based path even when a profile exists.
    #[serde(default = "default_personalize")]
    pub personalize: bool,
}

impl Default for FinishOptions {
    fn default() -> Self {
        Self {
            personalize: default_personalize(),
        }
    }
}

fn default_personalize() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub attempt_id: Uuid,
    pub percent: f64,
    pub total_score: f64,
}

/// Review of one question of a graded attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_id: Uuid,
    pub text: String,
    pub correct: bool,
    pub selected_option: Option<OptionView>,
    pub correct_option: OptionView,
    pub topic_objective: TopicObjective,
    /// Instructor-authored explanation.
    pub explanation: Option<String>,
    /// Generated (or templated) error analysis.
    pub comment: Option<String>,
    pub recommendations: Vec<RecommendedResource>,
}

/// Response of finish and of the result endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptReview {
    pub attempt: AttemptSummary,
    pub questions: Vec<QuestionReview>,
}
