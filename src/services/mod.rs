// src/services/mod.rs

//! Grading and remediation logic, independent of HTTP and of the storage backend.

pub mod attempts;
pub mod basic;
pub mod fallback;
pub mod grading;
pub mod personalized;
pub mod policy;
pub mod recommendations;
pub mod review;

use std::{sync::Arc, time::Duration};

use crate::{
    config::{Config, FALLBACK_RECOMMENDATION_LIMIT},
    llm::TextGenerator,
    services::policy::RecommendationPolicy,
    store::{AttemptStore, ProfileProvider, ResourceCatalog},
};

/// Tunables of the remediation stage.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub basic_limit: usize,
    pub personalized_limit: usize,
    pub fallback_limit: usize,
    pub llm_timeout: Duration,
    pub llm_concurrency: usize,
    pub policy: RecommendationPolicy,
}

impl EngineSettings {
    pub fn from_config(config: &Config, policy: RecommendationPolicy) -> Self {
        Self {
            basic_limit: config.recommendation_limit,
            personalized_limit: config.personalized_recommendation_limit,
            fallback_limit: FALLBACK_RECOMMENDATION_LIMIT,
            llm_timeout: config.llm_timeout(),
            llm_concurrency: config.llm_concurrency.max(1),
            policy,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            basic_limit: crate::config::DEFAULT_RECOMMENDATION_LIMIT,
            personalized_limit: crate::config::DEFAULT_RECOMMENDATION_LIMIT,
            fallback_limit: FALLBACK_RECOMMENDATION_LIMIT,
            llm_timeout: Duration::from_secs(crate::config::DEFAULT_LLM_TIMEOUT_SECS),
            llm_concurrency: crate::config::DEFAULT_LLM_CONCURRENCY,
            policy: RecommendationPolicy::default(),
        }
    }
}

/// The grading and remediation engine with its collaborators.
/// `generator: None` disables personalization entirely.
#[derive(Clone)]
pub struct Engine {
    pub store: Arc<dyn AttemptStore>,
    pub catalog: Arc<dyn ResourceCatalog>,
    pub profiles: Arc<dyn ProfileProvider>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub settings: EngineSettings,
}

impl Engine {
    pub fn new(
        store: Arc<dyn AttemptStore>,
        catalog: Arc<dyn ResourceCatalog>,
        profiles: Arc<dyn ProfileProvider>,
        generator: Option<Arc<dyn TextGenerator>>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            profiles,
            generator,
            settings,
        }
    }
}
