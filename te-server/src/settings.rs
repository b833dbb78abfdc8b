//! Runtime survey settings
//!
//! Loaded once at startup from the `settings` table. Missing or NULL keys
//! fall back to the built-in default and are written back, so the table
//! always lists every tunable.

use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use te_common::{Error, Result};
use tracing::{info, warn};

/// Environment override for the number of images per test session
pub const TEST_IMAGE_COUNT_ENV: &str = "TURINGEYES_TEST_IMAGE_COUNT";

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Images handed out per session (N)
    pub test_image_count: i64,
    /// Upper bound on trials accepted in one submission
    pub max_trials_per_submission: usize,
    /// Response times are clamped to 0..=this
    pub response_time_max_ms: i64,
    /// Income median recorded alongside an income bucket
    pub income_median: i64,
    pub income_currency: String,
    pub cookie_max_age: Duration,
    /// Add `Secure` to the participant cookie (production deployments)
    pub cookie_secure: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            test_image_count: 40,
            max_trials_per_submission: 100,
            response_time_max_ms: 600_000,
            income_median: 50_000,
            income_currency: "USD".to_string(),
            cookie_max_age: Duration::from_secs(60 * 60 * 24 * 90),
            cookie_secure: false,
        }
    }
}

impl RuntimeSettings {
    /// Load runtime settings from database
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();

        let mut test_image_count =
            get_setting(pool, "test_image_count", defaults.test_image_count).await?;
        if let Some(count) = env_image_count() {
            info!("Using {}={} (overrides database)", TEST_IMAGE_COUNT_ENV, count);
            test_image_count = count;
        }
        if test_image_count < 0 {
            warn!("Negative test_image_count {}, using 0", test_image_count);
            test_image_count = 0;
        }

        let mut response_time_max_ms =
            get_setting(pool, "response_time_max_ms", defaults.response_time_max_ms).await?;
        if response_time_max_ms < 0 {
            warn!("Negative response_time_max_ms {}, using 0", response_time_max_ms);
            response_time_max_ms = 0;
        }

        let settings = Self {
            test_image_count,
            max_trials_per_submission: get_setting(
                pool,
                "max_trials_per_submission",
                defaults.max_trials_per_submission,
            )
            .await?,
            response_time_max_ms,
            income_median: get_setting(pool, "income_median", defaults.income_median).await?,
            income_currency: get_setting(pool, "income_currency", defaults.income_currency).await?,
            cookie_max_age: Duration::from_secs(
                get_setting(pool, "cookie_max_age_secs", defaults.cookie_max_age.as_secs()).await?,
            ),
            cookie_secure: get_setting(pool, "cookie_secure", defaults.cookie_secure).await?,
        };

        info!(
            test_image_count = settings.test_image_count,
            max_trials = settings.max_trials_per_submission,
            "Loaded runtime settings from database"
        );
        Ok(settings)
    }
}

fn env_image_count() -> Option<i64> {
    let raw = std::env::var(TEST_IMAGE_COUNT_ENV).ok()?;
    match raw.trim().parse::<i64>() {
        Ok(count) => Some(count),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", TEST_IMAGE_COUNT_ENV, raw, e);
            None
        }
    }
}

/// Read one setting, writing the default back when missing or NULL
async fn get_setting<T>(pool: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::fmt::Display,
{
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match value.flatten() {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| Error::Config(format!("Invalid value for setting '{}': {}", key, e))),
        None => {
            let default_str = default.to_string();
            info!("Setting '{}' not found in database, using default: {}", key, default_str);
            sqlx::query(
                "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
            )
            .bind(key)
            .bind(&default_str)
            .execute(pool)
            .await?;
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = te_common::db::init_database(&dir.path().join("settings.db"))
            .await
            .unwrap();
        (dir, pool)
    }

    #[tokio::test]
    #[serial]
    async fn test_load_defaults() {
        std::env::remove_var(TEST_IMAGE_COUNT_ENV);
        let (_dir, pool) = test_pool().await;

        let settings = RuntimeSettings::load(&pool).await.unwrap();

        assert_eq!(settings.test_image_count, 40);
        assert_eq!(settings.max_trials_per_submission, 100);
        assert_eq!(settings.response_time_max_ms, 600_000);
        assert_eq!(settings.income_median, 50_000);
        assert_eq!(settings.income_currency, "USD");
        assert_eq!(settings.cookie_max_age, Duration::from_secs(7_776_000));
        assert!(!settings.cookie_secure);
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_key_written_back() {
        std::env::remove_var(TEST_IMAGE_COUNT_ENV);
        let (_dir, pool) = test_pool().await;
        sqlx::query("DELETE FROM settings WHERE key = 'income_currency'")
            .execute(&pool)
            .await
            .unwrap();

        let settings = RuntimeSettings::load(&pool).await.unwrap();
        assert_eq!(settings.income_currency, "USD");

        let stored: String =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = 'income_currency'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored, "USD");
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_value_is_config_error() {
        std::env::remove_var(TEST_IMAGE_COUNT_ENV);
        let (_dir, pool) = test_pool().await;
        sqlx::query("UPDATE settings SET value = 'many' WHERE key = 'test_image_count'")
            .execute(&pool)
            .await
            .unwrap();

        let err = RuntimeSettings::load(&pool).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    #[serial]
    async fn test_negative_response_time_max_floored() {
        std::env::remove_var(TEST_IMAGE_COUNT_ENV);
        let (_dir, pool) = test_pool().await;
        sqlx::query("UPDATE settings SET value = '-1' WHERE key = 'response_time_max_ms'")
            .execute(&pool)
            .await
            .unwrap();

        let settings = RuntimeSettings::load(&pool).await.unwrap();
        assert_eq!(settings.response_time_max_ms, 0);

        // Trials still parse, with every response time clamped to 0
        let raw = serde_json::json!({
            "imageId": "0b7e2f4a-1c3d-4e5f-8a9b-0c1d2e3f4a5b",
            "userChoice": "ai",
            "responseTimeMs": 1500,
        });
        let trial = crate::api::submit_trials::parse_trial(&raw, &settings).unwrap();
        assert_eq!(trial.response_time_ms, 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_env_overrides_image_count() {
        let (_dir, pool) = test_pool().await;
        std::env::set_var(TEST_IMAGE_COUNT_ENV, "12");

        let settings = RuntimeSettings::load(&pool).await.unwrap();
        std::env::remove_var(TEST_IMAGE_COUNT_ENV);

        assert_eq!(settings.test_image_count, 12);
    }
}
