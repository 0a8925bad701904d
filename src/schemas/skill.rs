use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Skill;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SkillCreate {
    #[validate(length(min = 1, max = 100, message = "Skill name must be 1..100 characters long"))]
    pub(crate) name: String,
    #[validate(length(min = 1, max = 100, message = "Category must be 1..100 characters long"))]
    pub(crate) category: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SkillQuery {
    #[serde(default)]
    pub(crate) category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SkillResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) created_at: String,
}

impl SkillResponse {
    pub(crate) fn from_db(skill: Skill) -> Self {
        Self {
            id: skill.id,
            name: skill.name,
            category: skill.category,
            created_at: format_primitive(skill.created_at),
        }
    }
}
