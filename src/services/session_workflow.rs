use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, primitive_seconds_ago};
use crate::db::models::{Judgement, SkillSession, UserAnswer, VoiceMetrics};
use crate::db::types::{DifficultyLevel, InputType, JudgementStatus};
use crate::repositories;
use crate::services::evaluation::{EvaluationRequest, VoiceSignals};

#[derive(Debug, Error)]
pub(crate) enum WorkflowError {
    #[error("Session not found")]
    SessionNotFound,
    #[error("Answer not found")]
    AnswerNotFound,
    #[error("Access denied")]
    Forbidden,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub(crate) struct NewSession<'a> {
    pub(crate) user_id: &'a str,
    pub(crate) skill_name: &'a str,
    pub(crate) mode: &'a str,
    pub(crate) input_type: InputType,
    pub(crate) difficulty: DifficultyLevel,
}

pub(crate) struct NewAnswer<'a> {
    pub(crate) raw_text: &'a str,
    pub(crate) transcript: Option<&'a str>,
    pub(crate) duration_seconds: Option<f64>,
    pub(crate) voice_metrics: Option<VoiceSignals>,
}

#[derive(Debug)]
pub(crate) struct SubmittedAnswer {
    pub(crate) answer: UserAnswer,
    pub(crate) voice_metrics: Option<VoiceMetrics>,
}

#[derive(Debug)]
pub(crate) struct Attempt {
    pub(crate) answer: UserAnswer,
    pub(crate) evaluation: Option<Judgement>,
}

#[derive(Debug)]
pub(crate) struct SessionSummary {
    pub(crate) session: SkillSession,
    pub(crate) attempts: Vec<Attempt>,
    pub(crate) voice_metrics: Option<VoiceMetrics>,
}

/// Starts a practice session. Several open sessions on the same skill are allowed.
pub(crate) async fn create_session(
    state: &AppState,
    new: NewSession<'_>,
) -> Result<SkillSession, WorkflowError> {
    let session = repositories::sessions::create(
        state.db(),
        repositories::sessions::CreateSession {
            id: &Uuid::new_v4().to_string(),
            user_id: new.user_id,
            skill_name: new.skill_name,
            mode: new.mode,
            input_type: new.input_type,
            difficulty: new.difficulty,
            created_at: primitive_now_utc(),
        },
    )
    .await?;

    tracing::info!(
        session_id = %session.id,
        user_id = %session.user_id,
        skill = %session.skill_name,
        "Session created"
    );

    Ok(session)
}

/// Stores a new attempt. Voice metrics are kept only for voice sessions.
pub(crate) async fn submit_answer(
    state: &AppState,
    user_id: &str,
    session_id: &str,
    new: NewAnswer<'_>,
) -> Result<SubmittedAnswer, WorkflowError> {
    let mut tx = state.db().begin().await?;

    let session = repositories::sessions::lock_by_id(&mut *tx, session_id)
        .await?
        .ok_or(WorkflowError::SessionNotFound)?;
    ensure_owner(&session, user_id)?;

    let now = primitive_now_utc();
    let answer_id = Uuid::new_v4().to_string();
    let answer = repositories::answers::create(
        &mut *tx,
        repositories::answers::CreateAnswer {
            id: &answer_id,
            session_id,
            raw_text: new.raw_text,
            transcript: new.transcript,
            duration_seconds: new.duration_seconds,
            created_at: now,
        },
    )
    .await?;

    let voice_metrics = match (session.input_type, new.voice_metrics) {
        (InputType::Voice, Some(signals)) => Some(
            repositories::voice_metrics::create(
                &mut *tx,
                repositories::voice_metrics::CreateVoiceMetrics {
                    id: &Uuid::new_v4().to_string(),
                    session_id,
                    answer_id: Some(&answer.id),
                    wpm: signals.wpm,
                    filler_words: signals.filler_words,
                    long_pauses: signals.long_pauses,
                    created_at: now,
                },
            )
            .await?,
        ),
        (InputType::Text, Some(_)) => {
            tracing::debug!(session_id, "Ignoring voice metrics for a text session");
            None
        }
        (_, None) => None,
    };

    tx.commit().await?;

    let input_label = match session.input_type {
        InputType::Text => "text",
        InputType::Voice => "voice",
    };
    metrics::counter!("answers_submitted_total", "input_type" => input_label).increment(1);
    tracing::info!(
        session_id,
        answer_id = %answer.id,
        attempt = answer.attempt_number,
        with_voice_metrics = voice_metrics.is_some(),
        "Answer submitted"
    );

    Ok(SubmittedAnswer { answer, voice_metrics })
}

/// Evaluates one attempt (the latest when `answer_id` is `None`).
///
/// A succeeded judgement is returned as stored. Otherwise the caller must win
/// the judgement row (fresh insert, or reclaim of a failed/stale-pending row)
/// before calling the provider; a caller that loses gets the current row.
pub(crate) async fn evaluate_session(
    state: &AppState,
    user_id: &str,
    session_id: &str,
    answer_id: Option<&str>,
) -> Result<Judgement, WorkflowError> {
    let pool = state.db();
    let session = repositories::sessions::find_by_id(pool, session_id)
        .await?
        .ok_or(WorkflowError::SessionNotFound)?;
    ensure_owner(&session, user_id)?;

    let answer = match answer_id {
        Some(answer_id) => {
            repositories::answers::find_in_session(pool, session_id, answer_id).await?
        }
        None => repositories::answers::find_latest(pool, session_id).await?,
    }
    .ok_or(WorkflowError::AnswerNotFound)?;

    let model_version = state.evaluator().model().to_string();
    let now = primitive_now_utc();
    let stale_before = primitive_seconds_ago(state.settings().ai().pending_stale_seconds);

    let claimed = match repositories::judgements::find_by_answer(pool, &answer.id).await? {
        Some(existing) if existing.status == JudgementStatus::Succeeded => return Ok(existing),
        Some(existing) => {
            match repositories::judgements::reclaim(pool, &existing.id, stale_before, now).await? {
                Some(claimed) => {
                    tracing::info!(
                        judgement_id = %claimed.id,
                        previous_status = existing.status.as_str(),
                        "Re-running evaluation"
                    );
                    claimed
                }
                None => return Ok(existing),
            }
        }
        None => {
            let claim = repositories::judgements::claim_new(
                pool,
                repositories::judgements::ClaimJudgement {
                    id: &Uuid::new_v4().to_string(),
                    answer_id: &answer.id,
                    session_id,
                    model_version: &model_version,
                    now,
                },
            )
            .await?;
            match claim {
                Some(claimed) => claimed,
                None => {
                    return repositories::judgements::find_by_answer(pool, &answer.id)
                        .await?
                        .ok_or(WorkflowError::AnswerNotFound);
                }
            }
        }
    };

    let voice = match session.input_type {
        InputType::Voice => {
            repositories::voice_metrics::find_for_evaluation(pool, session_id, &answer.id)
                .await?
                .map(|metrics| VoiceSignals {
                    wpm: metrics.wpm,
                    filler_words: metrics.filler_words,
                    long_pauses: metrics.long_pauses,
                })
        }
        InputType::Text => None,
    };

    let outcome = state
        .evaluator()
        .evaluate(&EvaluationRequest {
            answer_id: &answer.id,
            answer_text: answer.evaluation_text(),
            skill_name: &session.skill_name,
            difficulty: session.difficulty,
            voice,
        })
        .await;

    let assessment = outcome.assessment();
    let completed = repositories::judgements::complete(
        pool,
        &claimed.id,
        claimed.updated_at,
        repositories::judgements::CompleteJudgement {
            status: outcome.status(),
            clarity: assessment.clarity,
            correctness: assessment.correctness,
            depth: assessment.depth,
            delivery: assessment.delivery,
            missing_concepts: &assessment.missing_concepts,
            reaction: assessment.reaction,
            feedback: &assessment.feedback,
            improvement_suggestions: &assessment.improvement_suggestions,
            delivery_feedback: &assessment.delivery_feedback,
            model_version: &model_version,
            error: outcome.error(),
            updated_at: primitive_now_utc(),
        },
    )
    .await?;

    match completed {
        Some(judgement) => Ok(judgement),
        None => {
            tracing::warn!(
                judgement_id = %claimed.id,
                "Judgement was reclaimed during evaluation; keeping the stored result"
            );
            repositories::judgements::find_by_answer(pool, &answer.id)
                .await?
                .ok_or(WorkflowError::AnswerNotFound)
        }
    }
}

pub(crate) async fn get_session_summary(
    state: &AppState,
    user_id: &str,
    session_id: &str,
) -> Result<SessionSummary, WorkflowError> {
    let pool = state.db();
    let session = repositories::sessions::find_by_id(pool, session_id)
        .await?
        .ok_or(WorkflowError::SessionNotFound)?;
    ensure_owner(&session, user_id)?;

    let answers = repositories::answers::list_for_session(pool, session_id).await?;
    let judgements = repositories::judgements::list_for_session(pool, session_id).await?;
    let voice_metrics =
        repositories::voice_metrics::find_latest_for_session(pool, session_id).await?;

    Ok(SessionSummary { session, attempts: pair_attempts(answers, judgements), voice_metrics })
}

fn ensure_owner(session: &SkillSession, user_id: &str) -> Result<(), WorkflowError> {
    if session.user_id == user_id {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden)
    }
}

/// Pairs each answer (already newest first) with its judgement. A legacy
/// judgement stored without an answer id is attached only when the session
/// has exactly one answer and nothing else matched it.
pub(crate) fn pair_attempts(answers: Vec<UserAnswer>, judgements: Vec<Judgement>) -> Vec<Attempt> {
    let mut by_answer: HashMap<String, Judgement> = HashMap::new();
    let mut legacy: Option<Judgement> = None;

    for judgement in judgements {
        match judgement.answer_id.clone() {
            Some(answer_id) => {
                by_answer.entry(answer_id).or_insert(judgement);
            }
            None => {
                if legacy.is_none() {
                    legacy = Some(judgement);
                }
            }
        }
    }

    let single_answer = answers.len() == 1;
    answers
        .into_iter()
        .map(|answer| {
            let evaluation = match by_answer.remove(&answer.id) {
                Some(judgement) => Some(judgement),
                None if single_answer => legacy.take(),
                None => None,
            };
            Attempt { answer, evaluation }
        })
        .collect()
}
