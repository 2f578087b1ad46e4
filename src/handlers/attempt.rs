// src/handlers/attempt.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::review::{FinishAttemptRequest, FinishOptions},
    services::Engine,
    utils::jwt::Claims,
};

/// List the caller's attempts on a quiz.
pub async fn list_attempts(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = claims.learner_id()?;
    let attempts = engine.list_attempts(learner_id, quiz_id).await?;
    Ok(Json(attempts))
}

/// Start a new attempt on a quiz.
pub async fn start_attempt(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = claims.learner_id()?;
    let attempt = engine.start_attempt(learner_id, quiz_id).await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Submit answers, grade, and remediate.
///
/// `?personalize=false` skips the profile-aware path.
pub async fn finish_attempt(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
    Query(options): Query<FinishOptions>,
    Json(payload): Json<FinishAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = claims.learner_id()?;

    // A non-owner gets 403 whatever the payload holds.
    engine.owned_attempt(attempt_id, learner_id).await?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let review = engine
        .finish_attempt(attempt_id, learner_id, &payload.answers, options)
        .await?;

    Ok(Json(review))
}

pub async fn abandon_attempt(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = claims.learner_id()?;
    let attempt = engine.abandon_attempt(attempt_id, learner_id).await?;
    Ok(Json(attempt))
}
