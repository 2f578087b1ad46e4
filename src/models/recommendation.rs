// src/models/recommendation.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::resource::Resource;

/// Which path produced a recommendation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationSource {
    RuleBased,
    LlmPersonalized,
    FallbackBasic,
}

impl RecommendationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationSource::RuleBased => "rule-based",
            RecommendationSource::LlmPersonalized => "llm-personalized",
            RecommendationSource::FallbackBasic => "fallback-basic",
        }
    }
}

impl fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown recommendation source: {0}")]
pub struct UnknownSource(pub String);

impl TryFrom<String> for RecommendationSource {
    type Error = UnknownSource;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "rule-based" => Ok(RecommendationSource::RuleBased),
            "llm-personalized" => Ok(RecommendationSource::LlmPersonalized),
            "fallback-basic" => Ok(RecommendationSource::FallbackBasic),
            _ => Err(UnknownSource(value)),
        }
    }
}

/// Represents the 'recommendations' table.
/// Unique on (attempt_id, question_id, resource_id).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Recommendation {
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub resource_id: Uuid,
    /// 1-based position within the question's list.
    pub rank: i32,
    pub why_text: Option<String>,
    #[sqlx(try_from = "String")]
    pub source: RecommendationSource,
}

/// A persisted recommendation joined with its resource.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecommendation {
    pub recommendation: Recommendation,
    pub resource: Resource,
}

/// A recommended resource as returned to the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedResource {
    pub resource_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub url: String,
    pub duration_minutes: Option<i32>,
    pub mandatory: bool,
    pub why_text: Option<String>,
}

impl RecommendedResource {
    pub fn from_resource(resource: &Resource, why_text: Option<String>) -> Self {
        Self {
            resource_id: resource.id,
            title: resource.title.clone(),
            resource_type: resource.resource_type.clone(),
            url: resource.url.clone(),
            duration_minutes: resource.duration_minutes,
            mandatory: resource.is_mandatory,
            why_text,
        }
    }
}

/// DTO: persisted recommendations of one question.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionRecommendations {
    pub question_id: Uuid,
    pub recommendations: Vec<RecommendedResource>,
}

/// DTO: persisted recommendations of a whole attempt.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttemptRecommendations {
    pub attempt_id: Uuid,
    pub items: Vec<QuestionRecommendations>,
    pub total_recommendations: usize,
}
