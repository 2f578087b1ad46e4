// src/handlers/result.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{error::AppError, services::Engine, utils::jwt::Claims};

/// Rebuild the review of a graded attempt.
pub async fn get_result(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = claims.learner_id()?;
    let review = engine.attempt_result(attempt_id, learner_id).await?;
    Ok(Json(review))
}

pub async fn get_recommendations(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = claims.learner_id()?;
    let recommendations = engine.attempt_recommendations(attempt_id, learner_id).await?;
    Ok(Json(recommendations))
}
