//! Participant rows

use sqlx::SqlitePool;
use te_common::db::{Demographics, Participant};
use te_common::Result;
use uuid::Uuid;

/// Insert a new anonymous participant, returning its id
pub async fn create_participant(
    pool: &SqlitePool,
    self_rated_skill: i64,
    country_code: &str,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO participants (id, self_rated_skill, country_code) VALUES (?, ?, ?)",
    )
    .bind(&id)
    .bind(self_rated_skill)
    .bind(country_code)
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn get_participant(pool: &SqlitePool, id: &str) -> Result<Option<Participant>> {
    let participant = sqlx::query_as::<_, Participant>(
        r#"
        SELECT id, self_rated_skill, country_code, age_range, education_level, gender,
               occupation_field, income_bucket, income_median, income_currency,
               demographics_updated_at
        FROM participants
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(participant)
}

/// Overwrite a participant's demographics
///
/// `income` is the (median, currency) reference recorded with an income
/// bucket. Returns false when no participant has `id`.
pub async fn update_demographics(
    pool: &SqlitePool,
    id: &str,
    demographics: &Demographics,
    income: Option<(i64, &str)>,
) -> Result<bool> {
    let (income_median, income_currency) = match income {
        Some((median, currency)) => (Some(median), Some(currency)),
        None => (None, None),
    };
    let updated_at = chrono::Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE participants
        SET age_range = ?, education_level = ?, gender = ?, occupation_field = ?,
            income_bucket = ?, income_median = ?, income_currency = ?,
            demographics_updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&demographics.age_range)
    .bind(&demographics.education_level)
    .bind(&demographics.gender)
    .bind(&demographics.occupation_field)
    .bind(&demographics.income_bucket)
    .bind(income_median)
    .bind(income_currency)
    .bind(updated_at)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
