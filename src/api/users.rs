use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use time::Duration;
use uuid::Uuid;

use crate::api::errors::{ApiError, ApiResponse};
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::guards::CurrentUser;
use crate::api::validation::{normalize_email, require_text, validate_payload};
use crate::core::redis::auth_rate_key;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::analytics::{ActivityItemResponse, ActivityQuery, OverviewResponse};
use crate::schemas::auth::{AuthResponse, RefreshRequest};
use crate::schemas::user::{default_name, UserCreate, UserLogin, UserResponse, UserUpdate};
use crate::services::analytics;

/// Max attempts per window for auth endpoints (signup/login/refresh).
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

const BAD_CREDENTIALS: &str = "Incorrect email or password";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(signup))
        .route("/login", post(login))
        .route("/token/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me).patch(update_me).delete(delete_me))
        .route("/me/overview", get(overview))
        .route("/me/activity", get(activity))
}

async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserCreate>,
) -> Result<ApiResponse<AuthResponse>, ApiError> {
    validate_payload(&payload)?;
    if let Some(name) = payload.name.as_deref() {
        require_text(name, "Name must not be blank")?;
    }

    let email = normalize_email(&payload.email);
    enforce_auth_rate_limit(&state, "signup", &email, "Too many signup attempts, try again later")
        .await?;

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .map(str::to_string)
        .unwrap_or_else(|| default_name(&email));

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            name: &name,
            role: payload.role.unwrap_or(UserRole::Engineer),
            hashed_password,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?
    .ok_or_else(|| ApiError::Conflict("User with this email already exists".to_string()))?;

    tracing::info!(user_id = %user.id, "User registered");
    let response = issue_tokens(&state, user).await?;
    Ok(ApiResponse::ok(response, "User created"))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserLogin>,
) -> Result<ApiResponse<AuthResponse>, ApiError> {
    validate_payload(&payload)?;

    let email = normalize_email(&payload.email);
    enforce_auth_rate_limit(&state, "login", &email, "Too many login attempts, try again later")
        .await?;

    let user = repositories::users::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized(BAD_CREDENTIALS))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized(BAD_CREDENTIALS))?;
    if !verified {
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    }

    let response = issue_tokens(&state, user).await?;
    Ok(ApiResponse::ok(response, "Login successful"))
}

async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<ApiResponse<AuthResponse>, ApiError> {
    validate_payload(&payload)?;

    let token_hash = security::hash_refresh_token(&payload.refresh_token);
    let consumed = repositories::refresh_tokens::consume(state.db(), &token_hash, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to consume refresh token"))?
        .ok_or(ApiError::Unauthorized("Invalid or expired refresh token"))?;

    let user = repositories::users::find_by_id(state.db(), &consumed.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("User not found"))?;

    let response = issue_tokens(&state, user).await?;
    Ok(ApiResponse::ok(response, "Token refreshed"))
}

async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let revoked =
        repositories::refresh_tokens::revoke_all_for_user(state.db(), &user.id, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to revoke refresh tokens"))?;

    tracing::info!(user_id = %user.id, revoked, "User logged out");
    Ok(ApiResponse::ok(serde_json::json!({ "revoked": revoked }), "Logged out"))
}

async fn me(CurrentUser(user): CurrentUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(UserResponse::from_db(user), "Current user")
}

async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<UserUpdate>,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    validate_payload(&payload)?;
    if let Some(name) = payload.name.as_deref() {
        require_text(name, "Name must not be blank")?;
    }

    let hashed_password = match payload.password.as_deref() {
        Some(password) => Some(
            security::hash_password(password)
                .map_err(|e| ApiError::internal(e, "Failed to hash password"))?,
        ),
        None => None,
    };

    let updated = repositories::users::update(
        state.db(),
        &user.id,
        repositories::users::UpdateUser {
            name: payload.name.map(|name| name.trim().to_string()),
            role: payload.role,
            hashed_password,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))?
    .ok_or(ApiError::Unauthorized("User not found"))?;

    Ok(ApiResponse::ok(UserResponse::from_db(updated), "User updated"))
}

async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let deleted = repositories::users::delete(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete user"))?;
    if !deleted {
        return Err(ApiError::Unauthorized("User not found"));
    }

    tracing::info!(user_id = %user.id, "User deleted");
    Ok(ApiResponse::ok(serde_json::json!({ "id": user.id }), "User deleted"))
}

async fn overview(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<OverviewResponse>, ApiError> {
    let overview = analytics::overview(state.db(), &user.id).await?;
    Ok(ApiResponse::ok(overview, "Overview loaded"))
}

async fn activity(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> Result<ApiResponse<Vec<ActivityItemResponse>>, ApiError> {
    validate_payload(&query)?;
    let items = analytics::activity(state.db(), &user.id, query.skip, query.limit).await?;
    Ok(ApiResponse::ok(items, "Activity loaded"))
}

async fn enforce_auth_rate_limit(
    state: &AppState,
    action: &str,
    email: &str,
    message: &'static str,
) -> Result<(), ApiError> {
    let allowed = state
        .redis()
        .rate_limit(&auth_rate_key(action, email), AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, action, "Rate limit check failed; allowing request");
            true
        });

    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests(message))
    }
}

/// New access token plus a freshly stored refresh token.
async fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let refresh_token = security::generate_refresh_token();
    let now = primitive_now_utc();
    let lifetime = Duration::days(state.settings().security().refresh_token_expire_days as i64);
    repositories::refresh_tokens::create(
        state.db(),
        repositories::refresh_tokens::CreateRefreshToken {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            token_hash: &security::hash_refresh_token(&refresh_token),
            expires_at: now + lifetime,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store refresh token"))?;

    Ok(AuthResponse {
        user: UserResponse::from_db(user),
        token,
        token_type: "bearer".to_string(),
        refresh_token,
    })
}

#[cfg(test)]
mod tests;
