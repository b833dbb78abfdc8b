//! Balanced image sampling for a test session
//!
//! A session shows N images, half human and half AI where the catalog
//! allows. Each stratum contributes one contiguous window starting at a
//! random offset; the combined set is shuffled before it is returned.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use sqlx::SqlitePool;
use te_common::db::{Image, SourceType};
use tracing::{debug, error};

use crate::db::images;

/// How many images to take from each stratum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePlan {
    pub human_limit: i64,
    pub ai_limit: i64,
}

/// Split `n` between the strata given their sizes
///
/// Humans get at most `floor(n / 2)`. The AI stratum takes the remainder,
/// so a short human catalog is backfilled with AI images (never the
/// reverse).
pub fn plan_balanced_sample(n: i64, human_count: i64, ai_count: i64) -> SamplePlan {
    let n = n.max(0);
    let half = n / 2;
    let human_limit = half.min(human_count.max(0));
    let ai_limit = (n - human_limit).min(ai_count.max(0));
    SamplePlan {
        human_limit,
        ai_limit,
    }
}

/// Random start of a `limit`-sized window in a stratum of `count` rows
///
/// 0 when the whole stratum fits, else uniform over `0..=count - limit`.
pub fn random_window_start<R: Rng + ?Sized>(rng: &mut R, count: i64, limit: i64) -> i64 {
    if count <= 0 || count <= limit {
        return 0;
    }
    let max_start = (count - limit).max(0);
    rng.gen_range(0..=max_start)
}

/// Image as handed to the client at the start of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestImage {
    pub id: String,
    pub image_url: String,
    pub category: String,
}

impl From<Image> for TestImage {
    fn from(image: Image) -> Self {
        Self {
            id: image.id,
            image_url: image.image_url,
            category: image.category,
        }
    }
}

/// Select and shuffle a balanced set of `n` images
///
/// Storage failures for one stratum are logged and that stratum contributes
/// nothing; the session still starts with whatever the other stratum gave.
pub async fn select_test_images<R: Rng + ?Sized>(
    pool: &SqlitePool,
    n: i64,
    rng: &mut R,
) -> Vec<TestImage> {
    let human_count = stratum_count(pool, SourceType::Human).await;
    let ai_count = stratum_count(pool, SourceType::Ai).await;
    let plan = plan_balanced_sample(n, human_count, ai_count);

    let human_start = random_window_start(rng, human_count, plan.human_limit);
    let ai_start = random_window_start(rng, ai_count, plan.ai_limit);

    debug!(
        human_count,
        ai_count,
        human_limit = plan.human_limit,
        ai_limit = plan.ai_limit,
        human_start,
        ai_start,
        "Sampling test images"
    );

    let capacity = (plan.human_limit + plan.ai_limit) as usize;
    let mut selected: Vec<TestImage> = Vec::with_capacity(capacity);
    selected.extend(stratum_window(pool, SourceType::Human, human_start, plan.human_limit).await);
    selected.extend(stratum_window(pool, SourceType::Ai, ai_start, plan.ai_limit).await);

    selected.shuffle(rng);
    selected
}

async fn stratum_count(pool: &SqlitePool, source: SourceType) -> i64 {
    match images::count_by_source(pool, source).await {
        Ok(count) => count,
        Err(e) => {
            error!("images({}) count error: {}", source, e);
            0
        }
    }
}

async fn stratum_window(
    pool: &SqlitePool,
    source: SourceType,
    start: i64,
    limit: i64,
) -> Vec<TestImage> {
    if limit <= 0 {
        return Vec::new();
    }
    match images::window_by_source(pool, source, start, limit).await {
        Ok(rows) => rows.into_iter().map(TestImage::from).collect(),
        Err(e) => {
            error!("images({}) error: {}", source, e);
            Vec::new()
        }
    }
}
