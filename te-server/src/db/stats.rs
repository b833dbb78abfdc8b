//! Population aggregates used by scoring

use sqlx::SqlitePool;
use std::collections::HashMap;
use te_common::Result;

/// One ranked participant: totals plus the attributes peers are bucketed by
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ParticipantScore {
    pub id: String,
    pub country_code: String,
    pub age_range: Option<String>,
    pub education_level: Option<String>,
    pub occupation_field: Option<String>,
    pub income_bucket: Option<String>,
    pub correct: i64,
    pub total: i64,
}

/// Every participant with at least one trial
pub async fn participant_scores(pool: &SqlitePool) -> Result<Vec<ParticipantScore>> {
    let rows = sqlx::query_as::<_, ParticipantScore>(
        r#"
        SELECT p.id, p.country_code, p.age_range, p.education_level, p.occupation_field,
               p.income_bucket,
               SUM(t.is_correct) AS correct,
               COUNT(*) AS total
        FROM participants p
        JOIN trials t ON t.participant_id = p.id
        GROUP BY p.id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Pooled (correct, total) per image category across all participants
pub async fn category_totals(pool: &SqlitePool) -> Result<HashMap<String, (i64, i64)>> {
    let rows: Vec<(String, i64, i64)> = sqlx::query_as(
        r#"
        SELECT i.category, SUM(t.is_correct), COUNT(*)
        FROM trials t
        JOIN images i ON i.id = t.image_id
        GROUP BY i.category
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(category, correct, total)| (category, (correct, total)))
        .collect())
}
