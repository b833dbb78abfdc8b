//! Survey queries
//!
//! Schema creation lives in `te_common::db::init`; this module holds the
//! reads and writes behind each endpoint.

pub mod images;
pub mod participants;
pub mod stats;
pub mod trials;

use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Open (or create) the survey database
pub async fn init_database_pool(db_path: &Path) -> te_common::Result<SqlitePool> {
    let pool = te_common::db::init_database(db_path).await?;

    let images: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
        .fetch_one(&pool)
        .await?;
    let participants: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
        .fetch_one(&pool)
        .await?;
    info!(images, participants, "Survey database ready");

    Ok(pool)
}
