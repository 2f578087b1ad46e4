// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,

    /// The text content of the question.
    pub text: String,

    /// Points awarded for a correct answer.
    pub points: f64,

    pub topic_objective_id: Uuid,

    /// Instructor-authored explanation of the correct answer.
    pub explanation: Option<String>,

    /// Display position inside the quiz.
    pub position: i32,
}

/// Represents the 'options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub text: String,
    pub is_correct: bool,
}

/// Represents the 'topic_objectives' table. Also used as-is in reviews.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TopicObjective {
    pub id: Uuid,
    pub code: Option<String>,
    pub description: String,
}

/// An option as shown in a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionView {
    pub id: Uuid,
    pub text: String,
}

/// One row of a quiz's answer key: the question joined with its topic
/// objective and its single correct option.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionKey {
    pub question_id: Uuid,
    pub text: String,
    pub points: f64,
    pub explanation: Option<String>,
    pub topic_objective: TopicObjective,
    pub correct_option: OptionView,
}
