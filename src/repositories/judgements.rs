use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Judgement;
use crate::db::types::{JudgementStatus, Reaction};

const COLUMNS: &str = "\
    id, answer_id, session_id, status, clarity, correctness, depth, delivery, \
    missing_concepts, reaction, feedback, improvement_suggestions, delivery_feedback, \
    model_version, error, created_at, updated_at";

pub(crate) async fn find_by_answer(
    pool: &PgPool,
    answer_id: &str,
) -> Result<Option<Judgement>, sqlx::Error> {
    sqlx::query_as::<_, Judgement>(&format!("SELECT {COLUMNS} FROM judgements WHERE answer_id = $1"))
        .bind(answer_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_for_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Vec<Judgement>, sqlx::Error> {
    sqlx::query_as::<_, Judgement>(&format!(
        "SELECT {COLUMNS} FROM judgements WHERE session_id = $1 ORDER BY created_at DESC"
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
pub(crate) async fn count_for_answer(pool: &PgPool, answer_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM judgements WHERE answer_id = $1")
        .bind(answer_id)
        .fetch_one(pool)
        .await
}

pub(crate) struct ClaimJudgement<'a> {
    pub(crate) id: &'a str,
    pub(crate) answer_id: &'a str,
    pub(crate) session_id: &'a str,
    pub(crate) model_version: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

/// Inserts a `pending` judgement for the answer. Returns `None` when another
/// judgement already holds the answer (the UNIQUE constraint decides who wins).
pub(crate) async fn claim_new(
    pool: &PgPool,
    claim: ClaimJudgement<'_>,
) -> Result<Option<Judgement>, sqlx::Error> {
    sqlx::query_as::<_, Judgement>(&format!(
        "INSERT INTO judgements (
            id, answer_id, session_id, status, model_version, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$6)
        ON CONFLICT (answer_id) DO NOTHING
        RETURNING {COLUMNS}"
    ))
    .bind(claim.id)
    .bind(claim.answer_id)
    .bind(claim.session_id)
    .bind(JudgementStatus::Pending)
    .bind(claim.model_version)
    .bind(claim.now)
    .fetch_optional(pool)
    .await
}

/// Moves a `failed` judgement, or a `pending` one not touched since
/// `stale_before`, back to `pending`. Returns the row only to the caller that
/// performed the transition.
pub(crate) async fn reclaim(
    pool: &PgPool,
    id: &str,
    stale_before: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<Option<Judgement>, sqlx::Error> {
    sqlx::query_as::<_, Judgement>(&format!(
        "UPDATE judgements SET status = $2, error = NULL, updated_at = $3
         WHERE id = $1
           AND (status = $4 OR (status = $2 AND updated_at < $5))
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(JudgementStatus::Pending)
    .bind(now)
    .bind(JudgementStatus::Failed)
    .bind(stale_before)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CompleteJudgement<'a> {
    pub(crate) status: JudgementStatus,
    pub(crate) clarity: f64,
    pub(crate) correctness: f64,
    pub(crate) depth: f64,
    pub(crate) delivery: f64,
    pub(crate) missing_concepts: &'a [String],
    pub(crate) reaction: Reaction,
    pub(crate) feedback: &'a str,
    pub(crate) improvement_suggestions: &'a [String],
    pub(crate) delivery_feedback: &'a str,
    pub(crate) model_version: &'a str,
    pub(crate) error: Option<&'a str>,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Stores the evaluation outcome on a judgement this caller claimed.
///
/// `claimed_at` is the `updated_at` the claim returned. Returns `None` when the
/// row has moved on since (another caller reclaimed or completed it).
pub(crate) async fn complete(
    pool: &PgPool,
    id: &str,
    claimed_at: PrimitiveDateTime,
    outcome: CompleteJudgement<'_>,
) -> Result<Option<Judgement>, sqlx::Error> {
    sqlx::query_as::<_, Judgement>(&format!(
        "UPDATE judgements SET
            status = $2,
            clarity = $3,
            correctness = $4,
            depth = $5,
            delivery = $6,
            missing_concepts = $7,
            reaction = $8,
            feedback = $9,
            improvement_suggestions = $10,
            delivery_feedback = $11,
            model_version = $12,
            error = $13,
            updated_at = $14
         WHERE id = $1 AND status = $15 AND updated_at = $16
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(outcome.status)
    .bind(outcome.clarity)
    .bind(outcome.correctness)
    .bind(outcome.depth)
    .bind(outcome.delivery)
    .bind(Json(outcome.missing_concepts))
    .bind(outcome.reaction)
    .bind(outcome.feedback)
    .bind(Json(outcome.improvement_suggestions))
    .bind(outcome.delivery_feedback)
    .bind(outcome.model_version)
    .bind(outcome.error)
    .bind(outcome.updated_at)
    .bind(JudgementStatus::Pending)
    .bind(claimed_at)
    .fetch_optional(pool)
    .await
}
