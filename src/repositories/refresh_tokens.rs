use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::RefreshToken;

const COLUMNS: &str = "id, user_id, token_hash, expires_at, revoked_at, created_at";

pub(crate) struct CreateRefreshToken<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) token_hash: &'a str,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateRefreshToken<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
         VALUES ($1,$2,$3,$4,$5)",
    )
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.token_hash)
    .bind(params.expires_at)
    .bind(params.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Atomically revokes a live token and returns it, so a refresh token can be
/// exchanged at most once.
pub(crate) async fn consume(
    executor: impl sqlx::PgExecutor<'_>,
    token_hash: &str,
    now: PrimitiveDateTime,
) -> Result<Option<RefreshToken>, sqlx::Error> {
    sqlx::query_as::<_, RefreshToken>(&format!(
        "UPDATE refresh_tokens SET revoked_at = $2
         WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > $2
         RETURNING {COLUMNS}"
    ))
    .bind(token_hash)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn revoke_all_for_user(
    pool: &PgPool,
    user_id: &str,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = $2 WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete_expired(pool: &PgPool, now: PrimitiveDateTime) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
