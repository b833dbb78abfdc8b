//! HTTP API handlers for te-server

pub mod demographics;
pub mod health;
pub mod results;
pub mod submit_trials;

pub use demographics::demographics_routes;
pub use health::health_routes;
pub use results::results_routes;
pub use start_test::start_test_routes;
pub use submit_trials::submit_trials_routes;

use axum::body::Bytes;
use serde_json::Value;

/// Parse a request body as JSON, `None` when it is not JSON at all
///
/// Handlers take raw bytes so they can apply their own leniency rules
/// instead of axum's blanket 4xx for malformed bodies.
pub(crate) fn parse_json_body(body: &Bytes) -> Option<Value> {
    serde_json::from_slice(body).ok()
}
