// src/models/profile.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// General learning preferences of a learner ('learning_profiles' table).
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct LearningProfile {
    /// Resource types the learner prefers, e.g. ["video", "exercise"].
    #[serde(default)]
    pub preferred_modalities: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub career: Option<String>,
}

/// Course-specific profile of a learner ('course_profiles' table).
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CourseProfile {
    /// Self-assessed prerequisite level: 'beginner', 'intermediate' or 'advanced'.
    pub prereq_level: Option<String>,
    /// Weekly availability bucket, e.g. 'h1_3', 'h3_6', 'h6_10', 'h10_plus'.
    pub weekly_time: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
}

/// Both profiles of a learner for one course. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learning_profile: Option<LearningProfile>,
    pub course_profile: Option<CourseProfile>,
}
