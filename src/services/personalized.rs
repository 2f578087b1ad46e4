// src/services/personalized.rs

use std::cmp::Ordering;

use futures::future::try_join_all;
use uuid::Uuid;

use crate::{
    error::{AppError, ExternalError},
    llm::{TextGenerator, generate_within},
    models::{
        profile::{CourseProfile, LearningProfile},
        question::QuestionKey,
        recommendation::{RecommendationSource, RecommendedResource},
        resource::Resource,
    },
    services::{
        Engine,
        basic::rank_basic,
        policy::{RecommendationPolicy, normalize},
        recommendations,
    },
    utils::text::{plain_text, truncate_chars},
};

pub const ERROR_ANALYSIS_MAX_TOKENS: u32 = 150;
pub const WHY_TEXT_MAX_TOKENS: u32 = 80;
const QUESTION_PROMPT_CHARS: usize = 200;

/// What the ranking and the prompts need to know about a learner.
#[derive(Debug, Clone, PartialEq)]
pub struct LearnerContext {
    pub level: String,
    pub target_difficulty: String,
    pub time_bucket: String,
    pub time_budget_minutes: u32,
    pub preferred_modalities: Vec<String>,
}

impl LearnerContext {
    pub fn from_profiles(
        learning: &LearningProfile,
        course: &CourseProfile,
        policy: &RecommendationPolicy,
    ) -> Self {
        let level = course
            .prereq_level
            .as_deref()
            .map(normalize)
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| policy.default_level.clone());
        let time_bucket = course
            .weekly_time
            .as_deref()
            .map(normalize)
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| policy.default_time_bucket.clone());

        Self {
            target_difficulty: policy.target_difficulty(&level).to_string(),
            time_budget_minutes: policy.time_budget(&time_bucket),
            level,
            time_bucket,
            preferred_modalities: learning
                .preferred_modalities
                .iter()
                .map(|m| normalize(m))
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn is_advanced(&self) -> bool {
        self.level == "advanced"
    }

    fn time_description(&self) -> &'static str {
        match self.time_bucket.as_str() {
            "h1_3" => "little time",
            "h3_6" => "moderate time",
            "h6_10" => "a good amount of time",
            "h10_plus" => "plenty of time",
            _ => "moderate time",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResource {
    pub resource: Resource,
    pub score: f64,
}

/// Weighted relevance of one resource for one learner.
pub fn score_resource(resource: &Resource, ctx: &LearnerContext, policy: &RecommendationPolicy) -> f64 {
    let weights = &policy.weights;
    let mut score = 0.0;

    let difficulty = resource
        .difficulty
        .as_deref()
        .map(normalize)
        .unwrap_or_else(|| policy.default_difficulty.clone());
    if difficulty == ctx.target_difficulty {
        score += weights.difficulty_match;
    }

    if ctx
        .preferred_modalities
        .iter()
        .any(|m| *m == normalize(&resource.resource_type))
    {
        score += weights.preferred_modality;
    }

    // Unknown duration is treated as fitting the budget.
    let minutes = resource.duration_minutes.unwrap_or(0).max(0) as u32;
    if minutes <= ctx.time_budget_minutes {
        score += weights.within_time_budget;
    }

    if resource.is_mandatory {
        score += weights.mandatory;
    }

    if policy.is_practice(&resource.resource_type) {
        score += weights.practice;
    }

    if matches!(resource.duration_minutes, None | Some(0)) {
        score += weights.unknown_duration;
    }

    score
}

/// Sorts by descending score; equal scores keep the rule-based order.
pub fn rank_personalized(
    resources: Vec<Resource>,
    ctx: &LearnerContext,
    policy: &RecommendationPolicy,
) -> Vec<ScoredResource> {
    let mut scored: Vec<ScoredResource> = rank_basic(resources)
        .into_iter()
        .map(|resource| ScoredResource {
            score: score_resource(&resource, ctx, policy),
            resource,
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored
}

pub fn error_analysis_prompt(
    question: &QuestionKey,
    selected_option: Option<&str>,
    ctx: &LearnerContext,
) -> String {
    let tone = if ctx.is_advanced() {
        "Technical and direct"
    } else {
        "Clear and educational"
    };

    format!(
        "Write a short analysis of the learner's mistake (at most 80 words, 3 sentences).

QUESTION:
{question}

TOPIC:
{topic}

MISTAKE:
Selected: {selected}
Correct: {correct}

LEVEL: {level}

STRUCTURE (3 short sentences):
1. Which concept or skill failed, specifically
2. Why that concept matters
3. What the learner should do to reinforce it

TONE: {tone}
",
        question = truncate_chars(&question.text, QUESTION_PROMPT_CHARS),
        topic = question.topic_objective.description,
        selected = selected_option.unwrap_or("no answer"),
        correct = question.correct_option.text,
        level = ctx.level,
        tone = tone,
    )
}

pub fn why_text_prompt(resource: &Resource, topic_description: &str, ctx: &LearnerContext) -> String {
    let duration = match resource.duration_minutes {
        Some(minutes) => format!("{} min", minutes),
        None => "variable duration".to_string(),
    };
    let modalities = if ctx.preferred_modalities.is_empty() {
        "not specified".to_string()
    } else {
        ctx.preferred_modalities.join(", ")
    };

    format!(
        "Write one sentence (at most 40 words) explaining why this course resource helps the learner.

Resource: {title}
Type: {kind}
Duration: {duration}
Difficulty: {difficulty}
Topic: {topic}
Learner level: {level}
Available time: {time} (about {budget} min per resource)
Prefers: {modalities}

Instructions:
- Connect the resource with the learner's profile (level, modality, time)
- Say whether the difficulty suits the learner
- Plain text only: no bold, italics, markdown or emojis
- At most 40 words
",
        title = resource.title,
        kind = resource.resource_type,
        duration = duration,
        difficulty = resource.difficulty.as_deref().unwrap_or("unspecified"),
        topic = topic_description,
        level = ctx.level,
        time = ctx.time_description(),
        budget = ctx.time_budget_minutes,
        modalities = modalities,
    )
}

/// Why the personalized resource step could not complete.
#[derive(Debug, thiserror::Error)]
pub enum PersonalizationError {
    #[error("resource lookup failed: {0}")]
    Catalog(AppError),
    #[error("why-text generation failed: {0}")]
    Generation(#[from] ExternalError),
    #[error("persisting recommendations failed: {0}")]
    Persistence(AppError),
}

impl Engine {
    /// Generated explanation of an incorrect answer, cleaned to plain text.
    pub async fn analyze_error(
        &self,
        generator: &dyn TextGenerator,
        question: &QuestionKey,
        selected_option: Option<&str>,
        ctx: &LearnerContext,
    ) -> Result<String, ExternalError> {
        let prompt = error_analysis_prompt(question, selected_option, ctx);
        let raw = generate_within(
            generator,
            &prompt,
            ERROR_ANALYSIS_MAX_TOKENS,
            self.settings.llm_timeout,
        )
        .await?;

        non_empty(plain_text(&raw))
    }

    async fn explain_resource(
        &self,
        generator: &dyn TextGenerator,
        resource: &Resource,
        topic_description: &str,
        ctx: &LearnerContext,
    ) -> Result<String, ExternalError> {
        let prompt = why_text_prompt(resource, topic_description, ctx);
        let raw = generate_within(generator, &prompt, WHY_TEXT_MAX_TOKENS, self.settings.llm_timeout).await?;
        non_empty(plain_text(&raw))
    }

    /// Scores the topic objective's resources for this learner, explains the
    /// top ones and upserts them. Any failure aborts the whole step so the
    /// caller can fall back.
    pub async fn recommend_personalized(
        &self,
        generator: &dyn TextGenerator,
        attempt_id: Uuid,
        question: &QuestionKey,
        ctx: &LearnerContext,
    ) -> Result<Vec<RecommendedResource>, PersonalizationError> {
        let resources = self
            .catalog
            .resources_for_topic_objective(question.topic_objective.id)
            .await
            .map_err(PersonalizationError::Catalog)?;

        let top: Vec<ScoredResource> = rank_personalized(resources, ctx, &self.settings.policy)
            .into_iter()
            .take(self.settings.personalized_limit)
            .collect();

        for scored in &top {
            tracing::debug!(
                "Question {}: candidate '{}' scored {:.1}",
                question.question_id,
                scored.resource.title,
                scored.score
            );
        }

        let why_texts = try_join_all(top.iter().map(|scored| {
            self.explain_resource(
                generator,
                &scored.resource,
                &question.topic_objective.description,
                ctx,
            )
        }))
        .await?;

        let ranked: Vec<(Resource, Option<String>)> = top
            .into_iter()
            .zip(why_texts)
            .map(|(scored, why)| (scored.resource, Some(why)))
            .collect();

        recommendations::persist_ranked(
            self.store.as_ref(),
            attempt_id,
            question.question_id,
            &ranked,
            RecommendationSource::LlmPersonalized,
        )
        .await
        .map_err(PersonalizationError::Persistence)?;

        Ok(ranked
            .iter()
            .map(|(r, why)| RecommendedResource::from_resource(r, why.clone()))
            .collect())
    }
}

fn non_empty(text: String) -> Result<String, ExternalError> {
    if text.is_empty() {
        Err(ExternalError::EmptyCompletion)
    } else {
        Ok(text)
    }
}
