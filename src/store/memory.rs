// src/store/memory.rs

//! In-process store. Backs the integration tests and local runs without a database.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, ExternalError},
    models::{
        attempt::{Attempt, AttemptState, Quiz},
        profile::{CourseProfile, LearnerProfile, LearningProfile},
        question::{OptionView, Question, QuestionKey, QuestionOption, TopicObjective},
        recommendation::{Recommendation, RecommendationSource, StoredRecommendation},
        resource::Resource,
        response::QuestionResponse,
    },
    services::grading::GradeSheet,
    store::{AttemptStore, ProfileProvider, ResourceCatalog},
};

#[derive(Default)]
struct Inner {
    quizzes: HashMap<Uuid, Quiz>,
    topic_objectives: HashMap<Uuid, TopicObjective>,
    questions: Vec<Question>,
    options: Vec<QuestionOption>,
    resources: Vec<Resource>,
    learning_profiles: HashMap<Uuid, LearningProfile>,
    course_profiles: HashMap<(Uuid, Uuid), CourseProfile>,
    attempts: Vec<Attempt>,
    responses: HashMap<(Uuid, Uuid), QuestionResponse>,
    recommendations: Vec<Recommendation>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_quiz(&self, quiz: Quiz) {
        self.lock().quizzes.insert(quiz.id, quiz);
    }

    pub fn add_topic_objective(&self, topic_objective: TopicObjective) {
        self.lock()
            .topic_objectives
            .insert(topic_objective.id, topic_objective);
    }

    pub fn add_question(&self, question: Question) {
        self.lock().questions.push(question);
    }

    pub fn add_option(&self, option: QuestionOption) {
        self.lock().options.push(option);
    }

    pub fn add_resource(&self, resource: Resource) {
        self.lock().resources.push(resource);
    }

    pub fn set_learning_profile(&self, learner_id: Uuid, profile: LearningProfile) {
        self.lock().learning_profiles.insert(learner_id, profile);
    }

    pub fn set_course_profile(&self, learner_id: Uuid, course_id: Uuid, profile: CourseProfile) {
        self.lock()
            .course_profiles
            .insert((learner_id, course_id), profile);
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>, AppError> {
        Ok(self.lock().quizzes.get(&quiz_id).cloned())
    }

    async fn attempt(&self, attempt_id: Uuid) -> Result<Option<Attempt>, AppError> {
        Ok(self
            .lock()
            .attempts
            .iter()
            .find(|a| a.id == attempt_id)
            .cloned())
    }

    async fn attempts_for(&self, learner_id: Uuid, quiz_id: Uuid) -> Result<Vec<Attempt>, AppError> {
        Ok(self
            .lock()
            .attempts
            .iter()
            .filter(|a| a.learner_id == learner_id && a.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    async fn create_attempt(&self, learner_id: Uuid, quiz_id: Uuid) -> Result<Attempt, AppError> {
        let mut inner = self.lock();
        let in_progress = inner.attempts.iter().any(|a| {
            a.learner_id == learner_id && a.quiz_id == quiz_id && a.state == AttemptState::InProgress
        });
        if in_progress {
            return Err(AppError::Conflict(
                "An attempt is already in progress for this quiz".to_string(),
            ));
        }

        let attempt = Attempt {
            id: Uuid::new_v4(),
            quiz_id,
            learner_id,
            started_at: Utc::now(),
            ended_at: None,
            state: AttemptState::InProgress,
            score_total: None,
            percent: None,
        };
        inner.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn answer_key(&self, quiz_id: Uuid) -> Result<Vec<QuestionKey>, AppError> {
        let inner = self.lock();
        let mut questions: Vec<&Question> = inner
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .collect();
        questions.sort_by_key(|q| q.position);

        questions
            .into_iter()
            .map(|q| {
                let topic_objective = inner
                    .topic_objectives
                    .get(&q.topic_objective_id)
                    .cloned()
                    .ok_or_else(|| {
                        AppError::InternalServerError(format!(
                            "Question {} references a missing topic objective",
                            q.id
                        ))
                    })?;
                let correct = inner
                    .options
                    .iter()
                    .find(|o| o.question_id == q.id && o.is_correct)
                    .ok_or_else(|| {
                        AppError::InternalServerError(format!(
                            "Question {} has no correct option",
                            q.id
                        ))
                    })?;

                Ok(QuestionKey {
                    question_id: q.id,
                    text: q.text.clone(),
                    points: q.points,
                    explanation: q.explanation.clone(),
                    topic_objective,
                    correct_option: OptionView {
                        id: correct.id,
                        text: correct.text.clone(),
                    },
                })
            })
            .collect()
    }

    async fn option_texts(&self, option_ids: &[Uuid]) -> Result<HashMap<Uuid, String>, AppError> {
        Ok(self
            .lock()
            .options
            .iter()
            .filter(|o| option_ids.contains(&o.id))
            .map(|o| (o.id, o.text.clone()))
            .collect())
    }

    async fn record_grading(&self, attempt_id: Uuid, sheet: &GradeSheet) -> Result<bool, AppError> {
        let mut inner = self.lock();
        let Some(attempt) = inner
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id && a.state == AttemptState::InProgress)
        else {
            return Ok(false);
        };

        attempt.state = AttemptState::Graded;
        attempt.ended_at = Some(Utc::now());
        attempt.score_total = Some(sheet.earned_score);
        attempt.percent = Some(sheet.percent);

        for entry in &sheet.entries {
            inner.responses.insert(
                (attempt_id, entry.question_id),
                QuestionResponse {
                    attempt_id,
                    question_id: entry.question_id,
                    option_id: entry.option_id,
                    is_correct: entry.is_correct,
                    score: entry.earned,
                    time_seconds: entry.time_seconds,
                    comment: None,
                },
            );
        }
        Ok(true)
    }

    async fn abandon_attempt(&self, attempt_id: Uuid) -> Result<Option<Attempt>, AppError> {
        let mut inner = self.lock();
        Ok(inner
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id && a.state == AttemptState::InProgress)
            .map(|attempt| {
                attempt.state = AttemptState::Abandoned;
                attempt.ended_at = Some(Utc::now());
                attempt.clone()
            }))
    }

    async fn set_comment(&self, attempt_id: Uuid, question_id: Uuid, comment: &str) -> Result<(), AppError> {
        if let Some(response) = self.lock().responses.get_mut(&(attempt_id, question_id)) {
            response.comment = Some(comment.to_string());
        }
        Ok(())
    }

    async fn save_recommendations(&self, recs: &[Recommendation]) -> Result<usize, AppError> {
        // One lock for the whole batch keeps it all-or-nothing.
        let mut inner = self.lock();
        let mut written = 0;

        for rec in recs {
            match inner.recommendations.iter_mut().find(|r| same_key(r, rec)) {
                Some(existing) if rec.source == RecommendationSource::LlmPersonalized => {
                    existing.rank = rec.rank;
                    existing.why_text = rec.why_text.clone();
                    existing.source = rec.source;
                    written += 1;
                }
                Some(_) => {}
                None => {
                    inner.recommendations.push(rec.clone());
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    async fn responses(&self, attempt_id: Uuid) -> Result<Vec<QuestionResponse>, AppError> {
        Ok(self
            .lock()
            .responses
            .values()
            .filter(|r| r.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn recommendations(&self, attempt_id: Uuid) -> Result<Vec<StoredRecommendation>, AppError> {
        let inner = self.lock();
        let mut stored: Vec<StoredRecommendation> = inner
            .recommendations
            .iter()
            .filter(|r| r.attempt_id == attempt_id)
            .filter_map(|r| {
                inner
                    .resources
                    .iter()
                    .find(|res| res.id == r.resource_id)
                    .map(|resource| StoredRecommendation {
                        recommendation: r.clone(),
                        resource: resource.clone(),
                    })
            })
            .collect();

        stored.sort_by_key(|s| (s.recommendation.question_id, s.recommendation.rank));
        Ok(stored)
    }
}

fn same_key(a: &Recommendation, b: &Recommendation) -> bool {
    a.attempt_id == b.attempt_id && a.question_id == b.question_id && a.resource_id == b.resource_id
}

#[async_trait]
impl ResourceCatalog for MemoryStore {
    async fn resources_for_topic_objective(&self, topic_objective_id: Uuid) -> Result<Vec<Resource>, AppError> {
        Ok(self
            .lock()
            .resources
            .iter()
            .filter(|r| r.topic_objective_id == topic_objective_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProfileProvider for MemoryStore {
    async fn get_profile(&self, learner_id: Uuid, course_id: Uuid) -> Result<LearnerProfile, ExternalError> {
        let inner = self.lock();
        Ok(LearnerProfile {
            learning_profile: inner.learning_profiles.get(&learner_id).cloned(),
            course_profile: inner.course_profiles.get(&(learner_id, course_id)).cloned(),
        })
    }
}
