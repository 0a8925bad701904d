use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;

/// Catalog offered on a fresh install, as `(name, category)`.
pub(crate) const DEFAULT_SKILLS: &[(&str, &str)] = &[
    ("Redis", "Databases"),
    ("PostgreSQL", "Databases"),
    ("SQL Indexing", "Databases"),
    ("HTTP", "Networking"),
    ("TCP/IP", "Networking"),
    ("REST API Design", "Backend"),
    ("Caching Strategies", "Backend"),
    ("Message Queues", "Backend"),
    ("Docker", "DevOps"),
    ("Kubernetes", "DevOps"),
    ("Git", "Tooling"),
    ("System Design", "Architecture"),
    ("Concurrency", "Fundamentals"),
    ("Data Structures", "Fundamentals"),
];

/// Inserts any missing default skills. Existing rows are left untouched.
pub(crate) async fn ensure_default_skills(state: &AppState) -> anyhow::Result<()> {
    if !state.settings().catalog().seed_default_skills {
        tracing::debug!("SEED_DEFAULT_SKILLS disabled; skipping skill catalog seeding");
        return Ok(());
    }

    let now = primitive_now_utc();
    let mut inserted = 0usize;
    for (name, category) in DEFAULT_SKILLS {
        let created = repositories::skills::create(
            state.db(),
            repositories::skills::CreateSkill {
                id: &Uuid::new_v4().to_string(),
                name,
                category,
                created_at: now,
            },
        )
        .await?;
        if created.is_some() {
            inserted += 1;
        }
    }

    if inserted > 0 {
        tracing::info!(inserted, "Seeded default skills");
    } else {
        tracing::info!("Default skills already present");
    }

    Ok(())
}

pub(crate) async fn prune_expired_refresh_tokens(state: &AppState) -> anyhow::Result<()> {
    let removed =
        repositories::refresh_tokens::delete_expired(state.db(), primitive_now_utc()).await?;
    if removed > 0 {
        tracing::info!(removed, "Pruned expired refresh tokens");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn default_skill_names_are_unique() {
        let mut names = DEFAULT_SKILLS.iter().map(|(name, _)| *name).collect::<Vec<_>>();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DEFAULT_SKILLS.len());
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let Some(ctx) = test_support::setup_test_context().await else {
            return;
        };
        std::env::set_var("SEED_DEFAULT_SKILLS", "1");
        let settings = crate::core::config::Settings::load().expect("settings");
        let state = crate::core::state::AppState::new(
            settings,
            ctx.state.db().clone(),
            ctx.state.redis().clone(),
            ctx.state.evaluator().clone(),
        );

        ensure_default_skills(&state).await.expect("first seed");
        ensure_default_skills(&state).await.expect("second seed");

        let skills = repositories::skills::list(state.db(), None).await.expect("skills");
        assert_eq!(skills.len(), DEFAULT_SKILLS.len());

        let databases =
            repositories::skills::list(state.db(), Some("Databases")).await.expect("skills");
        assert!(databases.iter().any(|skill| skill.name == "Redis"));
    }
}
