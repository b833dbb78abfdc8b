//! Database models

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ground-truth origin of an image, and the two answers a participant can give
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Human,
    Ai,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Human => "human",
            SourceType::Ai => "ai",
        }
    }

    /// Display label used on result screens ("Human" / "AI")
    pub fn label(&self) -> &'static str {
        match self {
            SourceType::Human => "Human",
            SourceType::Ai => "AI",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(SourceType::Human),
            "ai" => Ok(SourceType::Ai),
            other => Err(Error::InvalidInput(format!("Unknown source type: {}", other))),
        }
    }
}

/// Participant row (anonymous session plus optional demographics)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
    pub id: String,
    pub self_rated_skill: i64,
    pub country_code: String,
    pub age_range: Option<String>,
    pub education_level: Option<String>,
    pub gender: Option<String>,
    pub occupation_field: Option<String>,
    pub income_bucket: Option<String>,
    pub income_median: Option<i64>,
    pub income_currency: Option<String>,
    pub demographics_updated_at: Option<String>,
}

/// Demographic fields written after the test
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub age_range: Option<String>,
    pub education_level: Option<String>,
    pub gender: Option<String>,
    pub occupation_field: Option<String>,
    pub income_bucket: Option<String>,
}

/// Image catalog row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    pub id: String,
    pub source_type: String,
    pub category: String,
    pub image_url: String,
    pub author: Option<String>,
    pub model: Option<String>,
    pub created_at: Option<String>,
}

impl Image {
    pub fn source(&self) -> crate::Result<SourceType> {
        self.source_type.parse()
    }
}

/// One recorded judgment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrial {
    pub participant_id: String,
    pub image_id: String,
    pub user_choice: SourceType,
    pub is_correct: bool,
    pub confidence: i64,
    pub response_time_ms: i64,
}
