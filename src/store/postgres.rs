// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, ExternalError},
    models::{
        attempt::{Attempt, Quiz},
        profile::{CourseProfile, LearnerProfile, LearningProfile},
        question::{OptionView, QuestionKey, TopicObjective},
        recommendation::{Recommendation, RecommendationSource, StoredRecommendation},
        resource::Resource,
        response::QuestionResponse,
    },
    services::grading::GradeSheet,
    store::{AttemptStore, ProfileProvider, ResourceCatalog},
};

const ATTEMPT_COLUMNS: &str =
    "id, quiz_id, learner_id, started_at, ended_at, state, score_total, percent";

/// PostgreSQL implementation of every storage seam.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Helper struct for fetching a quiz's answer key in one query.
#[derive(FromRow)]
struct AnswerKeyRow {
    question_id: Uuid,
    text: String,
    points: f64,
    explanation: Option<String>,
    topic_objective_id: Uuid,
    topic_objective_code: Option<String>,
    topic_objective_description: String,
    correct_option_id: Option<Uuid>,
    correct_option_text: Option<String>,
}

impl TryFrom<AnswerKeyRow> for QuestionKey {
    type Error = AppError;

    fn try_from(row: AnswerKeyRow) -> Result<Self, Self::Error> {
        let (Some(id), Some(text)) = (row.correct_option_id, row.correct_option_text) else {
            return Err(AppError::InternalServerError(format!(
                "Question {} has no correct option",
                row.question_id
            )));
        };

        Ok(QuestionKey {
            question_id: row.question_id,
            text: row.text,
            points: row.points,
            explanation: row.explanation,
            topic_objective: TopicObjective {
                id: row.topic_objective_id,
                code: row.topic_objective_code,
                description: row.topic_objective_description,
            },
            correct_option: OptionView { id, text },
        })
    }
}

/// A recommendation row joined with its resource.
#[derive(FromRow)]
struct StoredRecommendationRow {
    attempt_id: Uuid,
    question_id: Uuid,
    resource_id: Uuid,
    rank: i32,
    why_text: Option<String>,
    #[sqlx(try_from = "String")]
    source: RecommendationSource,
    topic_objective_id: Uuid,
    title: String,
    resource_type: String,
    url: String,
    duration_minutes: Option<i32>,
    difficulty: Option<String>,
    is_mandatory: bool,
    display_order: i32,
}

impl From<StoredRecommendationRow> for StoredRecommendation {
    fn from(row: StoredRecommendationRow) -> Self {
        StoredRecommendation {
            recommendation: Recommendation {
                attempt_id: row.attempt_id,
                question_id: row.question_id,
                resource_id: row.resource_id,
                rank: row.rank,
                why_text: row.why_text,
                source: row.source,
            },
            resource: Resource {
                id: row.resource_id,
                topic_objective_id: row.topic_objective_id,
                title: row.title,
                resource_type: row.resource_type,
                url: row.url,
                duration_minutes: row.duration_minutes,
                difficulty: row.difficulty,
                is_mandatory: row.is_mandatory,
                display_order: row.display_order,
            },
        }
    }
}

#[async_trait]
impl AttemptStore for PgStore {
    async fn quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            "SELECT id, course_id, title, attempt_limit, is_active FROM quizzes WHERE id = $1",
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    async fn attempt(&self, attempt_id: Uuid) -> Result<Option<Attempt>, AppError> {
        let sql = format!("SELECT {} FROM attempts WHERE id = $1", ATTEMPT_COLUMNS);
        let attempt = sqlx::query_as::<_, Attempt>(&sql)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(attempt)
    }

    async fn attempts_for(&self, learner_id: Uuid, quiz_id: Uuid) -> Result<Vec<Attempt>, AppError> {
        let sql = format!(
            "SELECT {} FROM attempts WHERE learner_id = $1 AND quiz_id = $2 ORDER BY started_at, id",
            ATTEMPT_COLUMNS
        );
        let attempts = sqlx::query_as::<_, Attempt>(&sql)
            .bind(learner_id)
            .bind(quiz_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(attempts)
    }

    async fn create_attempt(&self, learner_id: Uuid, quiz_id: Uuid) -> Result<Attempt, AppError> {
        let sql = format!(
            "INSERT INTO attempts (id, quiz_id, learner_id, state) \
             VALUES ($1, $2, $3, 'IN_PROGRESS') RETURNING {}",
            ATTEMPT_COLUMNS
        );

        sqlx::query_as::<_, Attempt>(&sql)
            .bind(Uuid::new_v4())
            .bind(quiz_id)
            .bind(learner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                // Partial unique index on (learner_id, quiz_id) WHERE state = 'IN_PROGRESS'
                let unique = e
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation());
                if unique {
                    AppError::Conflict("An attempt is already in progress for this quiz".to_string())
                } else {
                    tracing::error!("Failed to create attempt: {:?}", e);
                    AppError::InternalServerError(e.to_string())
                }
            })
    }

    async fn answer_key(&self, quiz_id: Uuid) -> Result<Vec<QuestionKey>, AppError> {
        let rows = sqlx::query_as::<_, AnswerKeyRow>(
            r#"
            SELECT
                q.id AS question_id,
                q.text,
                q.points,
                q.explanation,
                t.id AS topic_objective_id,
                t.code AS topic_objective_code,
                t.description AS topic_objective_description,
                o.id AS correct_option_id,
                o.text AS correct_option_text
            FROM questions q
            JOIN topic_objectives t ON t.id = q.topic_objective_id
            LEFT JOIN options o ON o.question_id = q.id AND o.is_correct
            WHERE q.quiz_id = $1
            ORDER BY q.position, q.id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QuestionKey::try_from).collect()
    }

    async fn option_texts(&self, option_ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError> {
        if option_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (Uuid, String)>("SELECT id, text FROM options WHERE id = ANY($1)")
            .bind(option_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }

    async fn record_grading(&self, attempt_id: Uuid, sheet: &GradeSheet) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-swap: only one finisher sees a row updated.
        let updated = sqlx::query(
            r#"
            UPDATE attempts
            SET state = 'GRADED', ended_at = NOW(), score_total = $2, percent = $3
            WHERE id = $1 AND state = 'IN_PROGRESS'
            "#,
        )
        .bind(attempt_id)
        .bind(sheet.earned_score)
        .bind(sheet.percent)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for entry in &sheet.entries {
            sqlx::query(
                r#"
                INSERT INTO question_responses
                    (attempt_id, question_id, option_id, is_correct, score, time_seconds, comment)
                VALUES ($1, $2, $3, $4, $5, $6, NULL)
                ON CONFLICT (attempt_id, question_id) DO UPDATE
                SET option_id = EXCLUDED.option_id,
                    is_correct = EXCLUDED.is_correct,
                    score = EXCLUDED.score,
                    time_seconds = EXCLUDED.time_seconds,
                    comment = NULL
                "#,
            )
            .bind(attempt_id)
            .bind(entry.question_id)
            .bind(entry.option_id)
            .bind(entry.is_correct)
            .bind(entry.earned)
            .bind(entry.time_seconds)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn abandon_attempt(&self, attempt_id: Uuid) -> Result<Option<Attempt>, AppError> {
        let sql = format!(
            "UPDATE attempts SET state = 'ABANDONED', ended_at = NOW() \
             WHERE id = $1 AND state = 'IN_PROGRESS' RETURNING {}",
            ATTEMPT_COLUMNS
        );
        let attempt = sqlx::query_as::<_, Attempt>(&sql)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(attempt)
    }

    async fn set_comment(&self, attempt_id: Uuid, question_id: Uuid, comment: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE question_responses SET comment = $3 WHERE attempt_id = $1 AND question_id = $2",
        )
        .bind(attempt_id)
        .bind(question_id)
        .bind(comment)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_recommendations(&self, recs: &[Recommendation]) -> Result<usize, AppError> {
        const INSERT_IF_ABSENT: &str = r#"
            INSERT INTO recommendations (attempt_id, question_id, resource_id, rank, why_text, source)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (attempt_id, question_id, resource_id) DO NOTHING
            "#;
        const UPSERT: &str = r#"
            INSERT INTO recommendations (attempt_id, question_id, resource_id, rank, why_text, source)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (attempt_id, question_id, resource_id) DO UPDATE
            SET rank = EXCLUDED.rank,
                why_text = EXCLUDED.why_text,
                source = EXCLUDED.source
            "#;

        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for rec in recs {
            let sql = match rec.source {
                RecommendationSource::LlmPersonalized => UPSERT,
                RecommendationSource::RuleBased | RecommendationSource::FallbackBasic => INSERT_IF_ABSENT,
            };
            // An error drops `tx`, which rolls back every row of the batch.
            let result = sqlx::query(sql)
                .bind(rec.attempt_id)
                .bind(rec.question_id)
                .bind(rec.resource_id)
                .bind(rec.rank)
                .bind(rec.why_text.as_deref())
                .bind(rec.source.as_str())
                .execute(&mut *tx)
                .await?;
            written += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn responses(&self, attempt_id: Uuid) -> Result<Vec<QuestionResponse>, AppError> {
        let responses = sqlx::query_as::<_, QuestionResponse>(
            r#"
            SELECT attempt_id, question_id, option_id, is_correct, score, time_seconds, comment
            FROM question_responses
            WHERE attempt_id = $1
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(responses)
    }

    async fn recommendations(&self, attempt_id: Uuid) -> Result<Vec<StoredRecommendation>, AppError> {
        let rows = sqlx::query_as::<_, StoredRecommendationRow>(
            r#"
            SELECT
                rec.attempt_id,
                rec.question_id,
                rec.resource_id,
                rec.rank,
                rec.why_text,
                rec.source,
                r.topic_objective_id,
                r.title,
                r.type AS resource_type,
                r.url,
                r.duration_minutes,
                r.difficulty,
                r.is_mandatory,
                r.display_order
            FROM recommendations rec
            JOIN resources r ON r.id = rec.resource_id
            WHERE rec.attempt_id = $1
            ORDER BY rec.question_id, rec.rank
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredRecommendation::from).collect())
    }
}

#[async_trait]
impl ResourceCatalog for PgStore {
    async fn resources_for_topic_objective(&self, topic_objective_id: Uuid) -> Result<Vec<Resource>, AppError> {
        let resources = sqlx::query_as::<_, Resource>(
            r#"
            SELECT id, topic_objective_id, title, type, url, duration_minutes, difficulty,
                   is_mandatory, display_order
            FROM resources
            WHERE topic_objective_id = $1
            ORDER BY display_order, id
            "#,
        )
        .bind(topic_objective_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch resources for {}: {:?}", topic_objective_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(resources)
    }
}

#[async_trait]
impl ProfileProvider for PgStore {
    async fn get_profile(&self, learner_id: Uuid, course_id: Uuid) -> Result<LearnerProfile, ExternalError> {
        let learning_profile = sqlx::query_as::<_, LearningProfile>(
            "SELECT preferred_modalities, interests, career FROM learning_profiles WHERE learner_id = $1",
        )
        .bind(learner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ExternalError::Lookup(e.to_string()))?;

        let course_profile = sqlx::query_as::<_, CourseProfile>(
            r#"
            SELECT prereq_level, weekly_time, goals
            FROM course_profiles
            WHERE learner_id = $1 AND course_id = $2
            "#,
        )
        .bind(learner_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ExternalError::Lookup(e.to_string()))?;

        Ok(LearnerProfile {
            learning_profile,
            course_profile,
        })
    }
}
