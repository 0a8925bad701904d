use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Skill;

const COLUMNS: &str = "id, name, category, created_at";

pub(crate) async fn list(pool: &PgPool, category: Option<&str>) -> Result<Vec<Skill>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM skills"));
    if let Some(category) = category {
        builder.push(" WHERE LOWER(category) = LOWER(");
        builder.push_bind(category);
        builder.push(")");
    }
    builder.push(" ORDER BY category, name");

    builder.build_query_as::<Skill>().fetch_all(pool).await
}

pub(crate) async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Skill>, sqlx::Error> {
    sqlx::query_as::<_, Skill>(&format!("SELECT {COLUMNS} FROM skills WHERE name = $1"))
        .bind(name)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateSkill<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) category: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

/// Returns `None` when a skill with the same name already exists.
pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSkill<'_>,
) -> Result<Option<Skill>, sqlx::Error> {
    sqlx::query_as::<_, Skill>(&format!(
        "INSERT INTO skills (id, name, category, created_at) VALUES ($1,$2,$3,$4)
         ON CONFLICT (name) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.category)
    .bind(params.created_at)
    .fetch_optional(pool)
    .await
}
