// src/models/resource.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'resources' table: the remediation catalog.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub topic_objective_id: Uuid,
    pub title: String,

    /// Kind of material, e.g. 'video', 'reading', 'exercise', 'interactive'.
    /// Mapped from the database column 'type'.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub resource_type: String,

    pub url: String,

    /// `None` when the author did not record a duration.
    pub duration_minutes: Option<i32>,

    /// 'beginner', 'intermediate' or 'advanced'.
    pub difficulty: Option<String>,

    pub is_mandatory: bool,

    pub display_order: i32,
}
