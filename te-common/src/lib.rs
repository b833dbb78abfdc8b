//! # TuringEyes Common Library
//!
//! Shared code for the TuringEyes survey service:
//! - Error type
//! - Bootstrap configuration (root folder, TOML file)
//! - Database initialization and row models

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
