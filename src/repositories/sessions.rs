use sqlx::PgPool;

use crate::db::models::SkillSession;
use crate::db::types::{DifficultyLevel, InputType};

pub(crate) const COLUMNS: &str =
    "id, user_id, skill_name, mode, input_type, difficulty, created_at, updated_at";

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) skill_name: &'a str,
    pub(crate) mode: &'a str,
    pub(crate) input_type: InputType,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    session: CreateSession<'_>,
) -> Result<SkillSession, sqlx::Error> {
    sqlx::query_as::<_, SkillSession>(&format!(
        "INSERT INTO skill_sessions (
            id, user_id, skill_name, mode, input_type, difficulty, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
        RETURNING {COLUMNS}"
    ))
    .bind(session.id)
    .bind(session.user_id)
    .bind(session.skill_name)
    .bind(session.mode)
    .bind(session.input_type)
    .bind(session.difficulty)
    .bind(session.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<SkillSession>, sqlx::Error> {
    sqlx::query_as::<_, SkillSession>(&format!(
        "SELECT {COLUMNS} FROM skill_sessions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Same as [`find_by_id`] but takes a row lock for the rest of the transaction,
/// serializing answer submissions to one session.
pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<SkillSession>, sqlx::Error> {
    sqlx::query_as::<_, SkillSession>(&format!(
        "SELECT {COLUMNS} FROM skill_sessions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}
