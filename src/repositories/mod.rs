pub(crate) mod analytics;
pub(crate) mod answers;
pub(crate) mod health;
pub(crate) mod judgements;
pub(crate) mod refresh_tokens;
pub(crate) mod sessions;
pub(crate) mod skills;
pub(crate) mod users;
pub(crate) mod voice_metrics;
