//! Image catalog queries

use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use te_common::db::{Image, SourceType};
use te_common::Result;
use tracing::warn;

pub async fn count_by_source(pool: &SqlitePool, source: SourceType) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE source_type = ?")
        .bind(source.as_str())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Contiguous window of one stratum, in catalog insertion order
pub async fn window_by_source(
    pool: &SqlitePool,
    source: SourceType,
    offset: i64,
    limit: i64,
) -> Result<Vec<Image>> {
    let images = sqlx::query_as::<_, Image>(
        r#"
        SELECT id, source_type, category, image_url, author, model, created_at
        FROM images
        WHERE source_type = ?
        ORDER BY rowid
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(source.as_str())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(images)
}

/// Ground truth for the given ids; unknown ids are absent from the map
pub async fn source_types(
    pool: &SqlitePool,
    ids: &[String],
) -> Result<HashMap<String, SourceType>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id, source_type FROM images WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let rows: Vec<(String, String)> = builder.build_query_as().fetch_all(pool).await?;

    let mut truth = HashMap::with_capacity(rows.len());
    for (id, source_type) in rows {
        match source_type.parse::<SourceType>() {
            Ok(source) => {
                truth.insert(id, source);
            }
            Err(e) => warn!("Skipping image {}: {}", id, e),
        }
    }
    Ok(truth)
}

/// Insert or replace a catalog entry
pub async fn upsert_image<'e, E>(executor: E, image: &Image) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO images (id, source_type, category, image_url, author, model, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            source_type = excluded.source_type,
            category = excluded.category,
            image_url = excluded.image_url,
            author = excluded.author,
            model = excluded.model,
            created_at = excluded.created_at
        "#,
    )
    .bind(&image.id)
    .bind(&image.source_type)
    .bind(&image.category)
    .bind(&image.image_url)
    .bind(&image.author)
    .bind(&image.model)
    .bind(&image.created_at)
    .execute(executor)
    .await?;
    Ok(())
}
