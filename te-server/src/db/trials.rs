//! Trial rows

use sqlx::SqlitePool;
use te_common::db::NewTrial;
use te_common::Result;

/// Insert all trials of one submission atomically
pub async fn insert_trials(pool: &SqlitePool, trials: &[NewTrial]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for trial in trials {
        sqlx::query(
            r#"
            INSERT INTO trials
                (participant_id, image_id, user_choice, is_correct, confidence, response_time_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&trial.participant_id)
        .bind(&trial.image_id)
        .bind(trial.user_choice.as_str())
        .bind(trial.is_correct)
        .bind(trial.confidence)
        .bind(trial.response_time_ms)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// A participant's trial joined with its image, for the answer grid
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrialDetail {
    pub image_id: String,
    pub user_choice: String,
    pub is_correct: bool,
    pub confidence: i64,
    pub response_time_ms: i64,
    pub source_type: String,
    pub category: String,
    pub image_url: String,
    pub author: Option<String>,
    pub model: Option<String>,
    pub created_at: Option<String>,
}

/// Trials in submission order
pub async fn trials_for_participant(
    pool: &SqlitePool,
    participant_id: &str,
) -> Result<Vec<TrialDetail>> {
    let rows = sqlx::query_as::<_, TrialDetail>(
        r#"
        SELECT t.image_id, t.user_choice, t.is_correct, t.confidence, t.response_time_ms,
               i.source_type, i.category, i.image_url, i.author, i.model, i.created_at
        FROM trials t
        JOIN images i ON i.id = t.image_id
        WHERE t.participant_id = ?
        ORDER BY t.id
        "#,
    )
    .bind(participant_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
