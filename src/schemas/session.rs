use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Judgement, SkillSession, UserAnswer, VoiceMetrics};
use crate::db::types::{DifficultyLevel, InputType, JudgementStatus, Reaction};
use crate::services::evaluation::VoiceSignals;
use crate::services::session_workflow::{Attempt, SessionSummary, SubmittedAnswer};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SessionCreate {
    #[serde(alias = "skillName")]
    #[validate(length(min = 1, max = 100, message = "Skill name must be 1..100 characters long"))]
    pub(crate) skill_name: String,
    #[validate(length(min = 1, max = 32, message = "Mode must be 1..32 characters long"))]
    pub(crate) mode: String,
    #[serde(alias = "inputType")]
    pub(crate) input_type: InputType,
    pub(crate) difficulty: DifficultyLevel,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub(crate) struct VoiceMetricsInput {
    #[validate(range(min = 0.0, max = 1000.0, message = "wpm must be in range 0..1000"))]
    pub(crate) wpm: f64,
    #[serde(alias = "fillerWords")]
    #[validate(range(min = 0, message = "fillerWords must not be negative"))]
    pub(crate) filler_words: i32,
    #[serde(alias = "longPauses")]
    #[validate(range(min = 0, message = "longPauses must not be negative"))]
    pub(crate) long_pauses: i32,
}

impl From<VoiceMetricsInput> for VoiceSignals {
    fn from(input: VoiceMetricsInput) -> Self {
        Self { wpm: input.wpm, filler_words: input.filler_words, long_pauses: input.long_pauses }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerSubmit {
    #[serde(default, alias = "rawText")]
    #[validate(length(max = 20000, message = "Answer must be at most 20000 characters long"))]
    pub(crate) raw_text: String,
    #[serde(default)]
    #[validate(length(max = 20000, message = "Transcript must be at most 20000 characters long"))]
    pub(crate) transcript: Option<String>,
    #[serde(default, alias = "durationSeconds", alias = "duration")]
    #[validate(range(min = 0.0, message = "Duration must not be negative"))]
    pub(crate) duration_seconds: Option<f64>,
    #[serde(default, alias = "voiceMetrics")]
    #[validate(nested)]
    pub(crate) voice_metrics: Option<VoiceMetricsInput>,
}

impl AnswerSubmit {
    /// An answer needs either typed text or a transcript.
    pub(crate) fn has_content(&self) -> bool {
        !self.raw_text.trim().is_empty()
            || self.transcript.as_deref().is_some_and(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct EvaluateRequest {
    #[serde(default, alias = "answerId")]
    #[validate(length(min = 1, max = 64, message = "answerId must be 1..64 characters long"))]
    pub(crate) answer_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) skill_name: String,
    pub(crate) mode: String,
    pub(crate) input_type: InputType,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: String,
}

impl SessionResponse {
    pub(crate) fn from_db(session: SkillSession) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id,
            skill_name: session.skill_name,
            mode: session.mode,
            input_type: session.input_type,
            difficulty: session.difficulty,
            created_at: format_primitive(session.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerResponse {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) raw_text: String,
    pub(crate) transcript: Option<String>,
    pub(crate) duration_seconds: Option<f64>,
    pub(crate) created_at: String,
}

impl AnswerResponse {
    pub(crate) fn from_db(answer: UserAnswer) -> Self {
        Self {
            id: answer.id,
            session_id: answer.session_id,
            attempt_number: answer.attempt_number,
            raw_text: answer.raw_text,
            transcript: answer.transcript,
            duration_seconds: answer.duration_seconds,
            created_at: format_primitive(answer.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VoiceMetricsResponse {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) answer_id: Option<String>,
    pub(crate) wpm: f64,
    pub(crate) filler_words: i32,
    pub(crate) long_pauses: i32,
    pub(crate) created_at: String,
}

impl VoiceMetricsResponse {
    pub(crate) fn from_db(metrics: VoiceMetrics) -> Self {
        Self {
            id: metrics.id,
            session_id: metrics.session_id,
            answer_id: metrics.answer_id,
            wpm: metrics.wpm,
            filler_words: metrics.filler_words,
            long_pauses: metrics.long_pauses,
            created_at: format_primitive(metrics.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JudgementResponse {
    pub(crate) id: String,
    pub(crate) answer_id: Option<String>,
    pub(crate) session_id: String,
    pub(crate) status: JudgementStatus,
    pub(crate) clarity: f64,
    pub(crate) correctness: f64,
    pub(crate) depth: f64,
    pub(crate) delivery: f64,
    pub(crate) missing_concepts: Vec<String>,
    pub(crate) reaction: Reaction,
    pub(crate) feedback: String,
    pub(crate) improvement_suggestions: Vec<String>,
    pub(crate) delivery_feedback: String,
    pub(crate) model_version: String,
    pub(crate) error: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl JudgementResponse {
    pub(crate) fn from_db(judgement: Judgement) -> Self {
        Self {
            id: judgement.id,
            answer_id: judgement.answer_id,
            session_id: judgement.session_id,
            status: judgement.status,
            clarity: judgement.clarity,
            correctness: judgement.correctness,
            depth: judgement.depth,
            delivery: judgement.delivery,
            missing_concepts: judgement.missing_concepts.0,
            reaction: judgement.reaction,
            feedback: judgement.feedback,
            improvement_suggestions: judgement.improvement_suggestions.0,
            delivery_feedback: judgement.delivery_feedback,
            model_version: judgement.model_version,
            error: judgement.error,
            created_at: format_primitive(judgement.created_at),
            updated_at: format_primitive(judgement.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerSubmitResponse {
    pub(crate) answer: AnswerResponse,
    pub(crate) voice_metrics: Option<VoiceMetricsResponse>,
}

impl AnswerSubmitResponse {
    pub(crate) fn from_submitted(submitted: SubmittedAnswer) -> Self {
        Self {
            answer: AnswerResponse::from_db(submitted.answer),
            voice_metrics: submitted.voice_metrics.map(VoiceMetricsResponse::from_db),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttemptResponse {
    pub(crate) answer: AnswerResponse,
    pub(crate) evaluation: Option<JudgementResponse>,
}

impl AttemptResponse {
    fn from_attempt(attempt: Attempt) -> Self {
        Self {
            answer: AnswerResponse::from_db(attempt.answer),
            evaluation: attempt.evaluation.map(JudgementResponse::from_db),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionSummaryResponse {
    pub(crate) session: SessionResponse,
    pub(crate) attempts: Vec<AttemptResponse>,
    pub(crate) voice_metrics: Option<VoiceMetricsResponse>,
}

impl SessionSummaryResponse {
    pub(crate) fn from_summary(summary: SessionSummary) -> Self {
        Self {
            session: SessionResponse::from_db(summary.session),
            attempts: summary.attempts.into_iter().map(AttemptResponse::from_attempt).collect(),
            voice_metrics: summary.voice_metrics.map(VoiceMetricsResponse::from_db),
        }
    }
}
