// src/services/recommendations.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        recommendation::{
            QuestionRecommendations, Recommendation, RecommendationSource, RecommendedResource,
            StoredRecommendation,
        },
        resource::Resource,
    },
    store::AttemptStore,
};

/// Persists an already ranked list in one batch; position 0 becomes rank 1.
///
/// Personalized rows overwrite rank / why_text / source of an existing
/// (attempt, question, resource) row. Every other source is insert-if-absent.
/// A failed batch leaves nothing behind for this question.
pub async fn persist_ranked(
    store: &dyn AttemptStore,
    attempt_id: Uuid,
    question_id: Uuid,
    ranked: &[(Resource, Option<String>)],
    source: RecommendationSource,
) -> Result<(), AppError> {
    let recs: Vec<Recommendation> = ranked
        .iter()
        .enumerate()
        .map(|(idx, (resource, why_text))| Recommendation {
            attempt_id,
            question_id,
            resource_id: resource.id,
            rank: idx as i32 + 1,
            why_text: why_text.clone(),
            source,
        })
        .collect();

    let written = store.save_recommendations(&recs).await?;
    if written < recs.len() {
        tracing::debug!(
            "{} of {} recommendations already present: attempt={} question={}",
            recs.len() - written,
            recs.len(),
            attempt_id,
            question_id
        );
    }

    Ok(())
}

/// Groups persisted rows per question, keeping the store's rank order.
pub fn group_by_question(stored: Vec<StoredRecommendation>) -> HashMap<Uuid, Vec<RecommendedResource>> {
    let mut grouped: HashMap<Uuid, Vec<RecommendedResource>> = HashMap::new();
    for row in stored {
        grouped
            .entry(row.recommendation.question_id)
            .or_default()
            .push(RecommendedResource::from_resource(
                &row.resource,
                row.recommendation.why_text,
            ));
    }
    grouped
}

/// Flattens grouped rows into the per-question DTO, in `order`.
pub fn into_items(
    mut grouped: HashMap<Uuid, Vec<RecommendedResource>>,
    order: impl IntoIterator<Item = Uuid>,
) -> Vec<QuestionRecommendations> {
    order
        .into_iter()
        .filter_map(|question_id| {
            grouped
                .remove(&question_id)
                .map(|recommendations| QuestionRecommendations {
                    question_id,
                    recommendations,
                })
        })
        .collect()
}
