use sqlx::PgPool;

use crate::db::models::UserAnswer;

const COLUMNS: &str =
    "id, session_id, attempt_number, raw_text, transcript, duration_seconds, created_at";

pub(crate) struct CreateAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) session_id: &'a str,
    pub(crate) raw_text: &'a str,
    pub(crate) transcript: Option<&'a str>,
    pub(crate) duration_seconds: Option<f64>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

/// Inserts the answer as the next attempt of its session. Callers hold the
/// session row lock so the attempt number cannot race.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    answer: CreateAnswer<'_>,
) -> Result<UserAnswer, sqlx::Error> {
    sqlx::query_as::<_, UserAnswer>(&format!(
        "INSERT INTO user_answers (
            id, session_id, attempt_number, raw_text, transcript, duration_seconds, created_at
        ) VALUES (
            $1, $2,
            (SELECT COALESCE(MAX(attempt_number), 0) + 1 FROM user_answers WHERE session_id = $2),
            $3, $4, $5, $6
        )
        RETURNING {COLUMNS}"
    ))
    .bind(answer.id)
    .bind(answer.session_id)
    .bind(answer.raw_text)
    .bind(answer.transcript)
    .bind(answer.duration_seconds)
    .bind(answer.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_in_session(
    pool: &PgPool,
    session_id: &str,
    answer_id: &str,
) -> Result<Option<UserAnswer>, sqlx::Error> {
    sqlx::query_as::<_, UserAnswer>(&format!(
        "SELECT {COLUMNS} FROM user_answers WHERE id = $1 AND session_id = $2"
    ))
    .bind(answer_id)
    .bind(session_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_latest(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<UserAnswer>, sqlx::Error> {
    sqlx::query_as::<_, UserAnswer>(&format!(
        "SELECT {COLUMNS} FROM user_answers WHERE session_id = $1
         ORDER BY attempt_number DESC LIMIT 1"
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await
}

/// All attempts of a session, newest first.
pub(crate) async fn list_for_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Vec<UserAnswer>, sqlx::Error> {
    sqlx::query_as::<_, UserAnswer>(&format!(
        "SELECT {COLUMNS} FROM user_answers WHERE session_id = $1
         ORDER BY attempt_number DESC"
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await
}
