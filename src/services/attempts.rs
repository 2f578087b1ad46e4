// src/services/attempts.rs

use std::collections::HashMap;

use futures::{StreamExt, stream};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptListResponse, AttemptState, Quiz},
        question::QuestionKey,
        review::{AttemptReview, AttemptSummary, FinishOptions, SubmittedAnswer},
    },
    services::{
        Engine,
        fallback::{Remediation, RemediationPlan},
        grading::{collapse_answers, grade},
        personalized::LearnerContext,
        review::question_review,
    },
};

impl Engine {
    async fn existing_quiz(&self, quiz_id: Uuid) -> Result<Quiz, AppError> {
        self.store
            .quiz(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
    }

    /// Loads an attempt and checks that `actor` owns it. Ownership is checked
    /// before any state check.
    pub async fn owned_attempt(&self, attempt_id: Uuid, actor: Uuid) -> Result<Attempt, AppError> {
        let attempt = self
            .store
            .attempt(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;

        if attempt.learner_id != actor {
            return Err(AppError::Forbidden(
                "This attempt belongs to another learner".to_string(),
            ));
        }
        Ok(attempt)
    }

    pub async fn list_attempts(&self, learner_id: Uuid, quiz_id: Uuid) -> Result<AttemptListResponse, AppError> {
        self.existing_quiz(quiz_id).await?;
        let attempts = self.store.attempts_for(learner_id, quiz_id).await?;
        Ok(AttemptListResponse {
            total: attempts.len(),
            attempts,
        })
    }

    pub async fn start_attempt(&self, learner_id: Uuid, quiz_id: Uuid) -> Result<Attempt, AppError> {
        let quiz = self.existing_quiz(quiz_id).await?;
        if !quiz.is_active {
            return Err(AppError::InvalidState("This quiz is not active".to_string()));
        }

        let previous = self.store.attempts_for(learner_id, quiz_id).await?;
        if previous.iter().any(|a| a.state == AttemptState::InProgress) {
            return Err(AppError::Conflict(
                "An attempt is already in progress for this quiz".to_string(),
            ));
        }
        if let Some(limit) = quiz.attempt_limit {
            if previous.len() >= limit.max(0) as usize {
                return Err(AppError::Conflict(format!(
                    "Attempt limit of {} reached",
                    limit
                )));
            }
        }

        let attempt = self.store.create_attempt(learner_id, quiz_id).await?;
        tracing::info!(
            "Attempt {} started: learner={} quiz={}",
            attempt.id,
            learner_id,
            quiz_id
        );
        Ok(attempt)
    }

    pub async fn abandon_attempt(&self, attempt_id: Uuid, actor: Uuid) -> Result<Attempt, AppError> {
        let attempt = self.owned_attempt(attempt_id, actor).await?;
        ensure_in_progress(&attempt)?;

        let abandoned = self
            .store
            .abandon_attempt(attempt_id)
            .await?
            .ok_or_else(not_in_progress)?;

        tracing::info!("Attempt {} abandoned", attempt_id);
        Ok(abandoned)
    }

    /// Grades the attempt, then remediates every incorrect question.
    ///
    /// Only the grading step can fail the call. Remediation degrades per
    /// question and its outcome is folded into the review.
    pub async fn finish_attempt(
        &self,
        attempt_id: Uuid,
        actor: Uuid,
        answers: &[SubmittedAnswer],
        options: FinishOptions,
    ) -> Result<AttemptReview, AppError> {
        let attempt = self.owned_attempt(attempt_id, actor).await?;
        ensure_in_progress(&attempt)?;

        let quiz = self.existing_quiz(attempt.quiz_id).await?;
        let key = self.store.answer_key(quiz.id).await?;
        let final_answers = collapse_answers(&key, answers)?;
        let sheet = grade(&key, &final_answers);

        let selected_ids: Vec<Uuid> = sheet.entries.iter().filter_map(|e| e.option_id).collect();
        let option_texts = self.store.option_texts(&selected_ids).await?;

        if !self.store.record_grading(attempt_id, &sheet).await? {
            return Err(not_in_progress());
        }
        tracing::info!(
            "Attempt {} graded: {}/{} ({}%)",
            attempt_id,
            sheet.earned_score,
            sheet.max_score,
            sheet.percent
        );

        let ctx = if options.personalize && self.generator.is_some() {
            self.learner_context(actor, quiz.course_id).await
        } else {
            None
        };
        let plan = match (self.generator.as_deref(), ctx.as_ref()) {
            (Some(generator), Some(ctx)) => RemediationPlan::Personalized { generator, ctx },
            _ => RemediationPlan::Basic,
        };

        // Owned items: the stream must not borrow from two local scopes.
        let incorrect: Vec<(QuestionKey, Option<String>)> = sheet
            .incorrect()
            .filter_map(|entry| {
                let question = key.iter().find(|q| q.question_id == entry.question_id)?;
                let selected = entry.option_id.and_then(|id| option_texts.get(&id)).cloned();
                Some((question.clone(), selected))
            })
            .collect();

        let mut remediations: HashMap<Uuid, Remediation> = stream::iter(incorrect)
            .map(|(question, selected)| async move {
                let remediation = self
                    .remediate(attempt_id, &question, selected.as_deref(), plan)
                    .await;
                (question.question_id, remediation)
            })
            .buffered(self.settings.llm_concurrency.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect();

        let questions = key
            .iter()
            .zip(&sheet.entries)
            .map(|(question, entry)| {
                let remediation = remediations.remove(&question.question_id).unwrap_or_default();
                question_review(
                    question,
                    entry.is_correct,
                    entry.option_id,
                    &option_texts,
                    remediation.comment,
                    remediation.recommendations,
                )
            })
            .collect();

        Ok(AttemptReview {
            attempt: AttemptSummary {
                attempt_id,
                percent: sheet.percent,
                total_score: sheet.earned_score,
            },
            questions,
        })
    }

    /// Personalization needs both profiles; anything less means the basic path.
    async fn learner_context(&self, learner_id: Uuid, course_id: Uuid) -> Option<LearnerContext> {
        match self.profiles.get_profile(learner_id, course_id).await {
            Ok(profile) => match (profile.learning_profile, profile.course_profile) {
                (Some(learning), Some(course)) => Some(LearnerContext::from_profiles(
                    &learning,
                    &course,
                    &self.settings.policy,
                )),
                _ => {
                    tracing::debug!(
                        "Learner {} has no complete profile for course {}",
                        learner_id,
                        course_id
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Profile lookup failed for learner {}: {}", learner_id, e);
                None
            }
        }
    }
}

fn ensure_in_progress(attempt: &Attempt) -> Result<(), AppError> {
    if attempt.state.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "Attempt is {}",
            attempt.state
        )));
    }
    Ok(())
}

fn not_in_progress() -> AppError {
    AppError::InvalidState("Attempt is no longer in progress".to_string())
}
