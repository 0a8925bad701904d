use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{DifficultyLevel, InputType, JudgementStatus, Reaction, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) role: UserRole,
    pub(crate) hashed_password: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct RefreshToken {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) token_hash: String,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) revoked_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Skill {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SkillSession {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) skill_name: String,
    pub(crate) mode: String,
    pub(crate) input_type: InputType,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct UserAnswer {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) raw_text: String,
    pub(crate) transcript: Option<String>,
    pub(crate) duration_seconds: Option<f64>,
    pub(crate) created_at: PrimitiveDateTime,
}

impl UserAnswer {
    /// Text sent for scoring: the transcript when one was captured, the raw text otherwise.
    pub(crate) fn evaluation_text(&self) -> &str {
        match self.transcript.as_deref() {
            Some(transcript) if !transcript.trim().is_empty() => transcript,
            _ => &self.raw_text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct VoiceMetrics {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) answer_id: Option<String>,
    pub(crate) wpm: f64,
    pub(crate) filler_words: i32,
    pub(crate) long_pauses: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Judgement {
    pub(crate) id: String,
    pub(crate) answer_id: Option<String>,
    pub(crate) session_id: String,
    pub(crate) status: JudgementStatus,
    pub(crate) clarity: f64,
    pub(crate) correctness: f64,
    pub(crate) depth: f64,
    pub(crate) delivery: f64,
    pub(crate) missing_concepts: Json<Vec<String>>,
    pub(crate) reaction: Reaction,
    pub(crate) feedback: String,
    pub(crate) improvement_suggestions: Json<Vec<String>>,
    pub(crate) delivery_feedback: String,
    pub(crate) model_version: String,
    pub(crate) error: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Judgement {
    /// Mean of the three content scores (clarity, correctness, depth).
    pub(crate) fn base_score(&self) -> f64 {
        (self.clarity + self.correctness + self.depth) / 3.0
    }
}
