// src/services/policy.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Lookup tables and weights of the personalized ranking.
/// Loadable from JSON; every missing field keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationPolicy {
    /// Learner prerequisite level -> resource difficulty label.
    pub level_difficulty: HashMap<String, String>,
    pub default_level: String,
    pub default_difficulty: String,

    /// Weekly availability bucket -> per-resource minute budget.
    pub time_budgets: HashMap<String, u32>,
    pub default_time_bucket: String,
    pub default_time_budget: u32,

    /// Resource types considered hands-on practice.
    pub practice_types: Vec<String>,

    pub weights: ScoreWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub difficulty_match: f64,
    pub preferred_modality: f64,
    pub within_time_budget: f64,
    pub mandatory: f64,
    pub practice: f64,
    pub unknown_duration: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            difficulty_match: 10.0,
            preferred_modality: 5.0,
            within_time_budget: 3.0,
            mandatory: 2.0,
            practice: 1.0,
            unknown_duration: 0.3,
        }
    }
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        let level_difficulty = [
            ("beginner", "beginner"),
            ("intermediate", "intermediate"),
            ("advanced", "advanced"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let time_budgets = [("h1_3", 20), ("h3_6", 30), ("h6_10", 45), ("h10_plus", 90)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        Self {
            level_difficulty,
            default_level: "intermediate".to_string(),
            default_difficulty: "intermediate".to_string(),
            time_budgets,
            default_time_bucket: "h3_6".to_string(),
            default_time_budget: 30,
            practice_types: vec!["exercise".to_string(), "interactive".to_string()],
            weights: ScoreWeights::default(),
        }
    }
}

impl RecommendationPolicy {
    /// Reads a policy file, or returns the defaults when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::InternalServerError(format!("cannot read policy file {}: {}", path, e))
        })?;
        let policy = serde_json::from_str(&raw)?;
        tracing::info!("Loaded recommendation policy from {}", path);
        Ok(policy)
    }

    pub fn target_difficulty(&self, level: &str) -> &str {
        self.level_difficulty
            .get(&normalize(level))
            .map(String::as_str)
            .unwrap_or(self.default_difficulty.as_str())
    }

    pub fn time_budget(&self, bucket: &str) -> u32 {
        self.time_budgets
            .get(&normalize(bucket))
            .copied()
            .unwrap_or(self.default_time_budget)
    }

    pub fn is_practice(&self, resource_type: &str) -> bool {
        let resource_type = normalize(resource_type);
        self.practice_types.iter().any(|t| normalize(t) == resource_type)
    }
}

/// Case- and whitespace-insensitive form used for every label comparison.
pub fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}
