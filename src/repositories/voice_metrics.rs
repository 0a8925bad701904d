use sqlx::PgPool;

use crate::db::models::VoiceMetrics;

const COLUMNS: &str = "id, session_id, answer_id, wpm, filler_words, long_pauses, created_at";

pub(crate) struct CreateVoiceMetrics<'a> {
    pub(crate) id: &'a str,
    pub(crate) session_id: &'a str,
    pub(crate) answer_id: Option<&'a str>,
    pub(crate) wpm: f64,
    pub(crate) filler_words: i32,
    pub(crate) long_pauses: i32,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    metrics: CreateVoiceMetrics<'_>,
) -> Result<VoiceMetrics, sqlx::Error> {
    sqlx::query_as::<_, VoiceMetrics>(&format!(
        "INSERT INTO voice_metrics (
            id, session_id, answer_id, wpm, filler_words, long_pauses, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        RETURNING {COLUMNS}"
    ))
    .bind(metrics.id)
    .bind(metrics.session_id)
    .bind(metrics.answer_id)
    .bind(metrics.wpm)
    .bind(metrics.filler_words)
    .bind(metrics.long_pauses)
    .bind(metrics.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_latest_for_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<VoiceMetrics>, sqlx::Error> {
    sqlx::query_as::<_, VoiceMetrics>(&format!(
        "SELECT {COLUMNS} FROM voice_metrics WHERE session_id = $1
         ORDER BY created_at DESC, id DESC LIMIT 1"
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await
}

/// Metrics to feed the evaluator for `answer_id`: the ones recorded with that
/// answer if any, otherwise the session's most recent.
pub(crate) async fn find_for_evaluation(
    pool: &PgPool,
    session_id: &str,
    answer_id: &str,
) -> Result<Option<VoiceMetrics>, sqlx::Error> {
    sqlx::query_as::<_, VoiceMetrics>(&format!(
        "SELECT {COLUMNS} FROM voice_metrics WHERE session_id = $1
         ORDER BY (answer_id = $2) DESC NULLS LAST, created_at DESC, id DESC LIMIT 1"
    ))
    .bind(session_id)
    .bind(answer_id)
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
pub(crate) async fn count_for_session(pool: &PgPool, session_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM voice_metrics WHERE session_id = $1")
        .bind(session_id)
        .fetch_one(pool)
        .await
}
