use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use crate::api::errors::{ApiError, ApiResponse};
use crate::api::extract::{ApiJson, ApiPath, OptionalJson};
use crate::api::guards::CurrentUser;
use crate::api::validation::{require_text, validate_payload};
use crate::core::state::AppState;
use crate::db::types::JudgementStatus;
use crate::schemas::session::{
    AnswerSubmit, AnswerSubmitResponse, EvaluateRequest, JudgementResponse, SessionCreate,
    SessionResponse, SessionSummaryResponse,
};
use crate::services::session_workflow::{self, NewAnswer, NewSession};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/:session_id/answer", post(submit_answer))
        .route("/:session_id/evaluate", post(evaluate_session))
        .route("/:session_id/summary", get(session_summary))
}

async fn create_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<SessionCreate>,
) -> Result<ApiResponse<SessionResponse>, ApiError> {
    validate_payload(&payload)?;
    require_text(&payload.skill_name, "Skill name must not be blank")?;
    require_text(&payload.mode, "Mode must not be blank")?;

    let session = session_workflow::create_session(
        &state,
        NewSession {
            user_id: &user.id,
            skill_name: &payload.skill_name,
            mode: &payload.mode,
            input_type: payload.input_type,
            difficulty: payload.difficulty,
        },
    )
    .await?;

    Ok(ApiResponse::ok(SessionResponse::from_db(session), "Session created"))
}

async fn submit_answer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(session_id): ApiPath<String>,
    ApiJson(payload): ApiJson<AnswerSubmit>,
) -> Result<ApiResponse<AnswerSubmitResponse>, ApiError> {
    validate_payload(&payload)?;
    if !payload.has_content() {
        return Err(ApiError::BadRequest("Answer text or transcript is required".to_string()));
    }

    let transcript = payload.transcript.as_deref().filter(|text| !text.trim().is_empty());
    let submitted = session_workflow::submit_answer(
        &state,
        &user.id,
        &session_id,
        NewAnswer {
            raw_text: &payload.raw_text,
            transcript,
            duration_seconds: payload.duration_seconds,
            voice_metrics: payload.voice_metrics.map(Into::into),
        },
    )
    .await?;

    Ok(ApiResponse::ok(AnswerSubmitResponse::from_submitted(submitted), "Answer submitted"))
}

async fn evaluate_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(session_id): ApiPath<String>,
    OptionalJson(payload): OptionalJson<EvaluateRequest>,
) -> Result<ApiResponse<JudgementResponse>, ApiError> {
    validate_payload(&payload)?;

    let judgement = session_workflow::evaluate_session(
        &state,
        &user.id,
        &session_id,
        payload.answer_id.as_deref(),
    )
    .await?;

    let message = match judgement.status {
        JudgementStatus::Succeeded => "Evaluation completed",
        JudgementStatus::Failed => "Evaluation failed",
        JudgementStatus::Pending => "Evaluation in progress",
    };
    Ok(ApiResponse::ok(JudgementResponse::from_db(judgement), message))
}

async fn session_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(session_id): ApiPath<String>,
) -> Result<ApiResponse<SessionSummaryResponse>, ApiError> {
    let summary = session_workflow::get_session_summary(&state, &user.id, &session_id).await?;
    Ok(ApiResponse::ok(SessionSummaryResponse::from_summary(summary), "Session summary"))
}
