// src/services/fallback.rs

use uuid::Uuid;

use crate::{
    llm::TextGenerator,
    models::{
        question::QuestionKey,
        recommendation::{RecommendationSource, RecommendedResource},
    },
    services::{Engine, personalized::LearnerContext},
};

/// How the remediation stage treats the incorrect questions of one attempt.
#[derive(Clone, Copy)]
pub enum RemediationPlan<'a> {
    /// Rule-based resources only, no generated text.
    Basic,
    Personalized {
        generator: &'a dyn TextGenerator,
        ctx: &'a LearnerContext,
    },
}

/// What an incorrect question ends up with after remediation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Remediation {
    pub comment: Option<String>,
    pub recommendations: Vec<RecommendedResource>,
}

/// Comment stored when the error analysis could not be generated.
pub fn fallback_comment(topic_description: &str) -> String {
    format!(
        "Review the concept: {}; practice with the course's resources on this topic.",
        topic_description
    )
}

impl Engine {
    /// Remediates one incorrect question. Never fails: every collaborator
    /// error is logged and replaced by the degraded result.
    pub async fn remediate(
        &self,
        attempt_id: Uuid,
        question: &QuestionKey,
        selected_option: Option<&str>,
        plan: RemediationPlan<'_>,
    ) -> Remediation {
        match plan {
            RemediationPlan::Basic => Remediation {
                comment: None,
                recommendations: self
                    .basic_or_empty(
                        attempt_id,
                        question,
                        self.settings.basic_limit,
                        RecommendationSource::RuleBased,
                    )
                    .await,
            },
            RemediationPlan::Personalized { generator, ctx } => {
                let (comment, recommendations) = tokio::join!(
                    self.comment_or_template(generator, attempt_id, question, selected_option, ctx),
                    self.personalized_or_fallback(generator, attempt_id, question, ctx),
                );
                Remediation {
                    comment: Some(comment),
                    recommendations,
                }
            }
        }
    }

    async fn comment_or_template(
        &self,
        generator: &dyn TextGenerator,
        attempt_id: Uuid,
        question: &QuestionKey,
        selected_option: Option<&str>,
        ctx: &LearnerContext,
    ) -> String {
        let comment = match self
            .analyze_error(generator, question, selected_option, ctx)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "Error analysis failed for question {}: {}",
                    question.question_id,
                    e
                );
                fallback_comment(&question.topic_objective.description)
            }
        };

        if let Err(e) = self
            .store
            .set_comment(attempt_id, question.question_id, &comment)
            .await
        {
            tracing::error!(
                "Failed to store comment for attempt {} question {}: {}",
                attempt_id,
                question.question_id,
                e
            );
        }

        comment
    }

    async fn personalized_or_fallback(
        &self,
        generator: &dyn TextGenerator,
        attempt_id: Uuid,
        question: &QuestionKey,
        ctx: &LearnerContext,
    ) -> Vec<RecommendedResource> {
        match self
            .recommend_personalized(generator, attempt_id, question, ctx)
            .await
        {
            Ok(recommendations) => recommendations,
            Err(e) => {
                tracing::warn!(
                    "Personalized recommendations failed for question {}, using fallback: {}",
                    question.question_id,
                    e
                );
                self.basic_or_empty(
                    attempt_id,
                    question,
                    self.settings.fallback_limit,
                    RecommendationSource::FallbackBasic,
                )
                .await
            }
        }
    }

    async fn basic_or_empty(
        &self,
        attempt_id: Uuid,
        question: &QuestionKey,
        limit: usize,
        source: RecommendationSource,
    ) -> Vec<RecommendedResource> {
        self.recommend_basic(
            attempt_id,
            question.question_id,
            question.topic_objective.id,
            limit,
            source,
        )
        .await
        .unwrap_or_else(|e| {
            tracing::error!(
                "{} recommendations failed for question {}: {}",
                source,
                question.question_id,
                e
            );
            Vec::new()
        })
    }
}
