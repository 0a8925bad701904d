use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::{DifficultyLevel, InputType};

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ActivityQuery {
    #[serde(default)]
    #[validate(range(min = 0, message = "skip must not be negative"))]
    pub(crate) skip: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 1, max = 200, message = "limit must be in range 1..200"))]
    pub(crate) limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ActivityStatus {
    Unanswered,
    Pending,
    Evaluated,
    Failed,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SkillOverviewResponse {
    pub(crate) skill_name: String,
    pub(crate) session_count: i64,
    pub(crate) evaluated_count: i64,
    pub(crate) average_clarity: Option<f64>,
    pub(crate) average_correctness: Option<f64>,
    pub(crate) average_depth: Option<f64>,
    pub(crate) average_delivery: Option<f64>,
    pub(crate) average_score: Option<f64>,
    pub(crate) last_practiced_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OverviewResponse {
    pub(crate) total_sessions: i64,
    pub(crate) total_evaluations: i64,
    pub(crate) average_score: Option<f64>,
    pub(crate) skills: Vec<SkillOverviewResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActivityItemResponse {
    pub(crate) session_id: String,
    pub(crate) skill_name: String,
    pub(crate) mode: String,
    pub(crate) input_type: InputType,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: String,
    pub(crate) answer_count: i64,
    pub(crate) latest_answer_id: Option<String>,
    pub(crate) status: ActivityStatus,
    pub(crate) score: Option<f64>,
}
