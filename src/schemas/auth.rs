use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::user::UserResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RefreshRequest {
    #[serde(alias = "refreshToken")]
    #[validate(length(min = 1, max = 512, message = "Refresh token is required"))]
    pub(crate) refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthResponse {
    pub(crate) user: UserResponse,
    pub(crate) token: String,
    pub(crate) token_type: String,
    pub(crate) refresh_token: String,
}
