//! The application served behind the bridge.
//!
//! Any axum `Router` can be bridged; this one is what the binary ships with.

use axum::{routing::get, Router};

/// Build the application router.
pub fn router() -> Router {
    Router::new().route("/", get(index))
}

async fn index() -> &'static str {
    "Hello, World!"
}
