// src/store/mod.rs

//! Storage seams of the engine.
//!
//! `AttemptStore` owns attempts, responses and recommendations.
//! `ResourceCatalog` and `ProfileProvider` are read-only collaborators.
//! `PgStore` implements all three against PostgreSQL; `MemoryStore` keeps
//! everything in-process.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::{AppError, ExternalError},
    models::{
        attempt::{Attempt, Quiz},
        profile::LearnerProfile,
        question::QuestionKey,
        recommendation::{Recommendation, StoredRecommendation},
        resource::Resource,
        response::QuestionResponse,
    },
    services::grading::GradeSheet,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>, AppError>;

    async fn attempt(&self, attempt_id: Uuid) -> Result<Option<Attempt>, AppError>;

    /// All attempts of a learner on a quiz, oldest first.
    async fn attempts_for(&self, learner_id: Uuid, quiz_id: Uuid) -> Result<Vec<Attempt>, AppError>;

    /// Creates an `IN_PROGRESS` attempt.
    /// Fails with `Conflict` if one is already in progress for (learner, quiz).
    async fn create_attempt(&self, learner_id: Uuid, quiz_id: Uuid) -> Result<Attempt, AppError>;

    /// Answer key of every question of the quiz, in display order.
    async fn answer_key(&self, quiz_id: Uuid) -> Result<Vec<QuestionKey>, AppError>;

    /// Texts of the given options; unknown ids are absent from the map.
    async fn option_texts(&self, option_ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError>;

    /// Moves the attempt `IN_PROGRESS -> GRADED` with the sheet's totals and
    /// upserts one response per graded question, atomically.
    /// Returns `false` and writes nothing if the attempt was no longer in progress.
    async fn record_grading(&self, attempt_id: Uuid, sheet: &GradeSheet) -> Result<bool, AppError>;

    /// Moves the attempt `IN_PROGRESS -> ABANDONED`.
    /// Returns `None` if the attempt was no longer in progress.
    async fn abandon_attempt(&self, attempt_id: Uuid) -> Result<Option<Attempt>, AppError>;

    async fn set_comment(&self, attempt_id: Uuid, question_id: Uuid, comment: &str) -> Result<(), AppError>;

    /// Writes a batch of recommendations atomically: either every row lands or none does.
    ///
    /// `llm-personalized` rows update rank / why_text / source of an existing
    /// (attempt, question, resource) row. Other sources are insert-if-absent.
    /// Returns how many rows were inserted or updated.
    async fn save_recommendations(&self, recs: &[Recommendation]) -> Result<usize, AppError>;

    async fn responses(&self, attempt_id: Uuid) -> Result<Vec<QuestionResponse>, AppError>;

    /// Persisted recommendations of an attempt, ordered by question then rank.
    async fn recommendations(&self, attempt_id: Uuid) -> Result<Vec<StoredRecommendation>, AppError>;
}

#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    async fn resources_for_topic_objective(&self, topic_objective_id: Uuid) -> Result<Vec<Resource>, AppError>;
}

#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn get_profile(&self, learner_id: Uuid, course_id: Uuid) -> Result<LearnerProfile, ExternalError>;
}
