// src/services/basic.rs

use std::cmp::Ordering;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        recommendation::{RecommendationSource, RecommendedResource},
        resource::Resource,
    },
    services::{Engine, recommendations},
};

/// Rule-based order: mandatory first, then display order, then shortest
/// duration with unknown durations last. Resource id breaks remaining ties.
pub fn rank_basic(mut resources: Vec<Resource>) -> Vec<Resource> {
    resources.sort_by(basic_order);
    resources
}

pub fn basic_order(a: &Resource, b: &Resource) -> Ordering {
    b.is_mandatory
        .cmp(&a.is_mandatory)
        .then(a.display_order.cmp(&b.display_order))
        .then(match (a.duration_minutes, b.duration_minutes) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then(a.id.cmp(&b.id))
}

impl Engine {
    /// Attaches the top rule-based resources of a topic objective to an
    /// incorrect question. Existing rows for the same resource are kept as-is.
    pub async fn recommend_basic(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        topic_objective_id: Uuid,
        limit: usize,
        source: RecommendationSource,
    ) -> Result<Vec<RecommendedResource>, AppError> {
        let resources = self
            .catalog
            .resources_for_topic_objective(topic_objective_id)
            .await?;

        if resources.is_empty() {
            tracing::debug!("No resources for topic objective {}", topic_objective_id);
            return Ok(Vec::new());
        }

        let selected: Vec<Resource> = rank_basic(resources).into_iter().take(limit).collect();
        let ranked: Vec<(Resource, Option<String>)> =
            selected.into_iter().map(|r| (r, None)).collect();

        recommendations::persist_ranked(
            self.store.as_ref(),
            attempt_id,
            question_id,
            &ranked,
            source,
        )
        .await?;

        Ok(ranked
            .iter()
            .map(|(r, why)| RecommendedResource::from_resource(r, why.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(mandatory: bool, order: i32, duration: Option<i32>) -> Resource {
        Resource {
            id: Uuid::new_v4(),
            topic_objective_id: Uuid::nil(),
            title: format!("m={} o={} d={:?}", mandatory, order, duration),
            resource_type: "video".to_string(),
            url: "https://example.org".to_string(),
            duration_minutes: duration,
            difficulty: None,
            is_mandatory: mandatory,
            display_order: order,
        }
    }

    #[test]
    fn test_mandatory_then_order_then_duration() {
        let optional_first = resource(false, 1, Some(5));
        let mandatory_late = resource(true, 3, Some(10));
        let mandatory_early_long = resource(true, 1, Some(40));
        let mandatory_early_short = resource(true, 1, Some(15));
        let mandatory_early_unknown = resource(true, 1, None);

        let ranked = rank_basic(vec![
            optional_first.clone(),
            mandatory_early_unknown.clone(),
            mandatory_late.clone(),
            mandatory_early_long.clone(),
            mandatory_early_short.clone(),
        ]);

        let ids: Vec<Uuid> = ranked.iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                mandatory_early_short.id,
                mandatory_early_long.id,
                mandatory_early_unknown.id,
                mandatory_late.id,
                optional_first.id,
            ]
        );
    }

    #[test]
    fn test_empty_catalog_ranks_nothing() {
        assert!(rank_basic(Vec::new()).is_empty());
    }
}
