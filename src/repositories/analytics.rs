use sqlx::{FromRow, PgPool};
use time::PrimitiveDateTime;

use crate::db::types::{DifficultyLevel, InputType, JudgementStatus};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct SkillAverageRow {
    pub(crate) skill_name: String,
    pub(crate) session_count: i64,
    pub(crate) evaluated_count: i64,
    pub(crate) avg_clarity: Option<f64>,
    pub(crate) avg_correctness: Option<f64>,
    pub(crate) avg_depth: Option<f64>,
    pub(crate) avg_delivery: Option<f64>,
    pub(crate) last_practiced_at: PrimitiveDateTime,
}

/// Per-skill averages over the user's succeeded judgements. Skills practiced
/// without a successful evaluation still appear, with `None` averages.
pub(crate) async fn skill_averages(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<SkillAverageRow>, sqlx::Error> {
    sqlx::query_as::<_, SkillAverageRow>(
        "SELECT s.skill_name,
                COUNT(DISTINCT s.id) AS session_count,
                COUNT(j.id) AS evaluated_count,
                AVG(j.clarity) AS avg_clarity,
                AVG(j.correctness) AS avg_correctness,
                AVG(j.depth) AS avg_depth,
                AVG(j.delivery) AS avg_delivery,
                MAX(s.created_at) AS last_practiced_at
         FROM skill_sessions s
         LEFT JOIN judgements j ON j.session_id = s.id AND j.status = $2
         WHERE s.user_id = $1
         GROUP BY s.skill_name
         ORDER BY s.skill_name",
    )
    .bind(user_id)
    .bind(JudgementStatus::Succeeded)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ActivityRow {
    pub(crate) session_id: String,
    pub(crate) skill_name: String,
    pub(crate) mode: String,
    pub(crate) input_type: InputType,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) answer_count: i64,
    pub(crate) latest_answer_id: Option<String>,
    pub(crate) judgement_status: Option<JudgementStatus>,
    pub(crate) clarity: Option<f64>,
    pub(crate) correctness: Option<f64>,
    pub(crate) depth: Option<f64>,
    pub(crate) delivery: Option<f64>,
}

/// The user's sessions, newest first, each with its latest attempt's judgement.
pub(crate) async fn recent_activity(
    pool: &PgPool,
    user_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<ActivityRow>, sqlx::Error> {
    sqlx::query_as::<_, ActivityRow>(
        "SELECT s.id AS session_id, s.skill_name, s.mode, s.input_type, s.difficulty, s.created_at,
                (SELECT COUNT(*) FROM user_answers a WHERE a.session_id = s.id) AS answer_count,
                latest.id AS latest_answer_id,
                j.status AS judgement_status,
                j.clarity, j.correctness, j.depth, j.delivery
         FROM skill_sessions s
         LEFT JOIN LATERAL (
             SELECT a.id FROM user_answers a
             WHERE a.session_id = s.id
             ORDER BY a.attempt_number DESC
             LIMIT 1
         ) latest ON TRUE
         LEFT JOIN judgements j ON j.answer_id = latest.id
         WHERE s.user_id = $1
         ORDER BY s.created_at DESC, s.id
         OFFSET $2 LIMIT $3",
    )
    .bind(user_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 200))
    .fetch_all(pool)
    .await
}
