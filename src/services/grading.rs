// src/services/grading.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{question::QuestionKey, review::SubmittedAnswer},
};

/// The learner's final answer to one question after duplicate collapsing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FinalAnswer {
    pub option_id: Option<Uuid>,
    pub time_seconds: Option<i32>,
}

/// Grading outcome of one question.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub option_id: Option<Uuid>,
    pub is_correct: bool,
    pub earned: f64,
    pub time_seconds: Option<i32>,
}

/// Grading outcome of a whole attempt. `entries` follows answer-key order.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeSheet {
    pub entries: Vec<GradedAnswer>,
    pub earned_score: f64,
    pub max_score: f64,
    pub percent: f64,
}

impl GradeSheet {
    pub fn incorrect(&self) -> impl Iterator<Item = &GradedAnswer> {
        self.entries.iter().filter(|e| !e.is_correct)
    }
}

/// Indexes submissions by question, later entries overwriting earlier ones.
///
/// Rejects the whole batch with `Validation` if any answer targets a
/// question outside the answer key.
pub fn collapse_answers(
    key: &[QuestionKey],
    answers: &[SubmittedAnswer],
) -> Result<HashMap<Uuid, FinalAnswer>, AppError> {
    let mut collapsed = HashMap::with_capacity(answers.len());

    for answer in answers {
        if !key.iter().any(|q| q.question_id == answer.question_id) {
            return Err(AppError::Validation(format!(
                "Question {} does not belong to this quiz",
                answer.question_id
            )));
        }
        collapsed.insert(
            answer.question_id,
            FinalAnswer {
                option_id: answer.option_id,
                time_seconds: answer.time_seconds,
            },
        );
    }

    Ok(collapsed)
}

/// Scores every question of the key, answered or not.
pub fn grade(key: &[QuestionKey], answers: &HashMap<Uuid, FinalAnswer>) -> GradeSheet {
    let mut max_score = 0.0;
    let mut earned_score = 0.0;
    let mut entries = Vec::with_capacity(key.len());

    for question in key {
        max_score += question.points;

        let answer = answers.get(&question.question_id).copied().unwrap_or_default();
        let is_correct = answer.option_id == Some(question.correct_option.id);
        let earned = if is_correct { question.points } else { 0.0 };
        earned_score += earned;

        entries.push(GradedAnswer {
            question_id: question.question_id,
            option_id: answer.option_id,
            is_correct,
            earned,
            time_seconds: answer.time_seconds,
        });
    }

    GradeSheet {
        entries,
        earned_score,
        max_score,
        percent: percent(earned_score, max_score),
    }
}

/// `earned / max * 100` rounded to two decimals; `0.0` for an empty quiz.
pub fn percent(earned: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    round2(earned / max * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
