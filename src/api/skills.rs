use axum::{extract::State, routing::get, Router};
use uuid::Uuid;

use crate::api::errors::{ApiError, ApiResponse};
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::guards::CurrentUser;
use crate::api::validation::{require_text, validate_payload};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::skill::{SkillCreate, SkillQuery, SkillResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_skills).post(create_skill))
}

async fn list_skills(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    ApiQuery(query): ApiQuery<SkillQuery>,
) -> Result<ApiResponse<Vec<SkillResponse>>, ApiError> {
    let category = query.category.as_deref().map(str::trim).filter(|value| !value.is_empty());
    let skills = repositories::skills::list(state.db(), category)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list skills"))?;

    Ok(ApiResponse::ok(
        skills.into_iter().map(SkillResponse::from_db).collect(),
        "Skills loaded",
    ))
}

async fn create_skill(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<SkillCreate>,
) -> Result<ApiResponse<SkillResponse>, ApiError> {
    validate_payload(&payload)?;
    require_text(&payload.name, "Skill name must not be blank")?;
    require_text(&payload.category, "Category must not be blank")?;

    let skill = repositories::skills::create(
        state.db(),
        repositories::skills::CreateSkill {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            category: payload.category.trim(),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create skill"))?
    .ok_or_else(|| ApiError::Conflict("Skill with this name already exists".to_string()))?;

    tracing::info!(skill = %skill.name, created_by = %user.id, "Skill created");
    Ok(ApiResponse::ok(SkillResponse::from_db(skill), "Skill created"))
}
