use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Engineer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "inputtype", rename_all = "lowercase")]
pub(crate) enum InputType {
    Text,
    Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficultylevel", rename_all = "lowercase")]
pub(crate) enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "judgementstatus", rename_all = "lowercase")]
pub(crate) enum JudgementStatus {
    Pending,
    Succeeded,
    Failed,
}

impl JudgementStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            JudgementStatus::Pending => "pending",
            JudgementStatus::Succeeded => "succeeded",
            JudgementStatus::Failed => "failed",
        }
    }
}

/// How the evaluator "reacted" to an answer; anything unrecognized becomes `Neutral`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "reaction", rename_all = "lowercase")]
pub(crate) enum Reaction {
    Impressed,
    Satisfied,
    #[default]
    Neutral,
    Confused,
    Concerned,
}

impl Reaction {
    pub(crate) const ALL: [Reaction; 5] = [
        Reaction::Impressed,
        Reaction::Satisfied,
        Reaction::Neutral,
        Reaction::Confused,
        Reaction::Concerned,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Reaction::Impressed => "impressed",
            Reaction::Satisfied => "satisfied",
            Reaction::Neutral => "neutral",
            Reaction::Confused => "confused",
            Reaction::Concerned => "concerned",
        }
    }

    pub(crate) fn parse_lenient(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|reaction| reaction.as_str() == normalized).unwrap_or_default()
    }
}
