// src/services/review.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::AttemptState,
        question::{OptionView, QuestionKey},
        recommendation::{AttemptRecommendations, RecommendedResource},
        review::{AttemptReview, AttemptSummary, QuestionReview},
    },
    services::{Engine, recommendations},
};

/// Assembles the review of one question.
/// A selected option whose text is unknown is reported as absent.
pub fn question_review(
    question: &QuestionKey,
    correct: bool,
    selected_option_id: Option<Uuid>,
    option_texts: &HashMap<Uuid, String>,
    comment: Option<String>,
    recommendations: Vec<RecommendedResource>,
) -> QuestionReview {
    let selected_option = selected_option_id.and_then(|id| {
        option_texts.get(&id).map(|text| OptionView {
            id,
            text: text.clone(),
        })
    });

    QuestionReview {
        question_id: question.question_id,
        text: question.text.clone(),
        correct,
        selected_option,
        correct_option: question.correct_option.clone(),
        topic_objective: question.topic_objective.clone(),
        explanation: question.explanation.clone(),
        comment,
        recommendations,
    }
}

impl Engine {
    /// Rebuilds the finish response of a graded attempt from stored rows.
    pub async fn attempt_result(&self, attempt_id: Uuid, actor: Uuid) -> Result<AttemptReview, AppError> {
        let attempt = self.owned_attempt(attempt_id, actor).await?;
        if attempt.state != AttemptState::Graded {
            return Err(AppError::InvalidState(format!(
                "Results are only available for graded attempts (attempt is {})",
                attempt.state
            )));
        }

        let key = self.store.answer_key(attempt.quiz_id).await?;
        let mut responses: HashMap<Uuid, _> = self
            .store
            .responses(attempt_id)
            .await?
            .into_iter()
            .map(|r| (r.question_id, r))
            .collect();
        let mut grouped = recommendations::group_by_question(self.store.recommendations(attempt_id).await?);

        let selected_ids: Vec<Uuid> = responses.values().filter_map(|r| r.option_id).collect();
        let option_texts = self.store.option_texts(&selected_ids).await?;

        let questions = key
            .iter()
            .map(|question| {
                let response = responses.remove(&question.question_id);
                let (correct, option_id, comment) = match response {
                    Some(r) => (r.is_correct, r.option_id, r.comment),
                    None => (false, None, None),
                };
                question_review(
                    question,
                    correct,
                    option_id,
                    &option_texts,
                    comment,
                    grouped.remove(&question.question_id).unwrap_or_default(),
                )
            })
            .collect();

        Ok(AttemptReview {
            attempt: AttemptSummary {
                attempt_id,
                percent: attempt.percent.unwrap_or(0.0),
                total_score: attempt.score_total.unwrap_or(0.0),
            },
            questions,
        })
    }

    /// Persisted recommendations of an attempt, grouped per question in quiz order.
    pub async fn attempt_recommendations(
        &self,
        attempt_id: Uuid,
        actor: Uuid,
    ) -> Result<AttemptRecommendations, AppError> {
        let attempt = self.owned_attempt(attempt_id, actor).await?;
        let key = self.store.answer_key(attempt.quiz_id).await?;
        let grouped = recommendations::group_by_question(self.store.recommendations(attempt_id).await?);

        let items = recommendations::into_items(grouped, key.iter().map(|q| q.question_id));
        let total_recommendations = items.iter().map(|i| i.recommendations.len()).sum();

        Ok(AttemptRecommendations {
            attempt_id,
            items,
            total_recommendations,
        })
    }
}
