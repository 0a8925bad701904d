use sqlx::PgPool;
use thiserror::Error;

use crate::core::time::format_primitive;
use crate::db::types::JudgementStatus;
use crate::repositories::analytics::{self as analytics_repo, ActivityRow, SkillAverageRow};
use crate::schemas::analytics::{
    ActivityItemResponse, ActivityStatus, OverviewResponse, SkillOverviewResponse,
};

pub(crate) const DEFAULT_ACTIVITY_LIMIT: i64 = 20;

#[derive(Debug, Error)]
pub(crate) enum AnalyticsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub(crate) async fn overview(pool: &PgPool, user_id: &str) -> Result<OverviewResponse, AnalyticsError> {
    let rows = analytics_repo::skill_averages(pool, user_id).await?;
    Ok(summarize_overview(rows))
}

pub(crate) async fn activity(
    pool: &PgPool,
    user_id: &str,
    skip: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<ActivityItemResponse>, AnalyticsError> {
    let rows = analytics_repo::recent_activity(
        pool,
        user_id,
        skip.unwrap_or(0),
        limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT),
    )
    .await?;
    Ok(rows.into_iter().map(activity_item).collect())
}

/// Folds per-skill rows into the overview. The overall average is weighted by
/// the number of succeeded evaluations behind each skill.
pub(crate) fn summarize_overview(rows: Vec<SkillAverageRow>) -> OverviewResponse {
    let total_sessions = rows.iter().map(|row| row.session_count).sum();
    let total_evaluations: i64 = rows.iter().map(|row| row.evaluated_count).sum();

    let mut weighted_sum = 0.0;
    let skills = rows
        .into_iter()
        .map(|row| {
            let average_score = base_score(row.avg_clarity, row.avg_correctness, row.avg_depth);
            if let Some(score) = average_score {
                weighted_sum += score * row.evaluated_count as f64;
            }
            SkillOverviewResponse {
                skill_name: row.skill_name,
                session_count: row.session_count,
                evaluated_count: row.evaluated_count,
                average_clarity: row.avg_clarity.map(round2),
                average_correctness: row.avg_correctness.map(round2),
                average_depth: row.avg_depth.map(round2),
                average_delivery: row.avg_delivery.map(round2),
                average_score: average_score.map(round2),
                last_practiced_at: format_primitive(row.last_practiced_at),
            }
        })
        .collect();

    let average_score =
        (total_evaluations > 0).then(|| round2(weighted_sum / total_evaluations as f64));

    OverviewResponse { total_sessions, total_evaluations, average_score, skills }
}

pub(crate) fn activity_item(row: ActivityRow) -> ActivityItemResponse {
    let status = match (row.latest_answer_id.as_ref(), row.judgement_status) {
        (None, _) => ActivityStatus::Unanswered,
        (Some(_), None | Some(JudgementStatus::Pending)) => ActivityStatus::Pending,
        (Some(_), Some(JudgementStatus::Succeeded)) => ActivityStatus::Evaluated,
        (Some(_), Some(JudgementStatus::Failed)) => ActivityStatus::Failed,
    };
    let score = match status {
        ActivityStatus::Evaluated => {
            base_score(row.clarity, row.correctness, row.depth).map(round2)
        }
        _ => None,
    };

    ActivityItemResponse {
        session_id: row.session_id,
        skill_name: row.skill_name,
        mode: row.mode,
        input_type: row.input_type,
        difficulty: row.difficulty,
        created_at: format_primitive(row.created_at),
        answer_count: row.answer_count,
        latest_answer_id: row.latest_answer_id,
        status,
        score,
    }
}

fn base_score(clarity: Option<f64>, correctness: Option<f64>, depth: Option<f64>) -> Option<f64> {
    Some((clarity? + correctness? + depth?) / 3.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
