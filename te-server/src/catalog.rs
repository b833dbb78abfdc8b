//! Image catalog import
//!
//! Loads a JSON array of image descriptions into the `images` table.
//! The whole file is validated before anything is written.

use serde::Deserialize;
use sqlx::SqlitePool;
use std::path::Path;
use te_common::db::{Image, SourceType};
use te_common::{Error, Result};
use tracing::info;
use uuid::Uuid;

use crate::db::images;

/// One entry of a catalog file
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub source_type: SourceType,
    pub category: String,
    pub image_url: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub human: usize,
    pub ai: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.human + self.ai
    }
}

impl CatalogEntry {
    fn into_image(self) -> Result<Image> {
        let id = match self.id {
            Some(id) => Uuid::parse_str(id.trim())
                .map_err(|e| Error::InvalidInput(format!("Image id {:?}: {}", id, e)))?
                .to_string(),
            None => Uuid::new_v4().to_string(),
        };
        if self.category.trim().is_empty() {
            return Err(Error::InvalidInput(format!("Image {} has an empty category", id)));
        }
        if self.image_url.trim().is_empty() {
            return Err(Error::InvalidInput(format!("Image {} has an empty image_url", id)));
        }

        Ok(Image {
            id,
            source_type: self.source_type.as_str().to_string(),
            category: self.category.trim().to_string(),
            image_url: self.image_url.trim().to_string(),
            author: self.author,
            model: self.model,
            created_at: self.created_at,
        })
    }
}

/// Parse catalog JSON into validated image rows
pub fn parse_catalog(json: &str) -> Result<Vec<Image>> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
    entries.into_iter().map(CatalogEntry::into_image).collect()
}

/// Import a catalog file, inserting new images and updating existing ids
pub async fn import_images(pool: &SqlitePool, path: &Path) -> Result<ImportSummary> {
    let content = std::fs::read_to_string(path)?;
    let catalog = parse_catalog(&content)?;

    // All or nothing: a failing row leaves the catalog as it was
    let mut tx = pool.begin().await?;
    let mut summary = ImportSummary::default();
    for image in &catalog {
        images::upsert_image(&mut *tx, image).await?;
        match image.source()? {
            SourceType::Human => summary.human += 1,
            SourceType::Ai => summary.ai += 1,
        }
    }
    tx.commit().await?;

    info!(
        human = summary.human,
        ai = summary.ai,
        "Imported {} images from {}",
        summary.total(),
        path.display()
    );
    Ok(summary)
}
