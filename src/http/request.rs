//! Request identity.
//!
//! # Responsibilities
//! - Give every request cycle a unique ID (UUID v4 unless the host sent one)
//! - Expose the ID to the application as header and extension
//!
//! # Design Decisions
//! - Request ID added before dispatch so handler logs can carry it
//! - A host-supplied `x-request-id` is preserved for end-to-end correlation

use std::fmt;

use axum::http::{HeaderName, HeaderValue, Request};
use uuid::Uuid;

/// Header carrying the request ID on requests and responses.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Identifier of one request cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ID as a header value.
    pub fn header_value(&self) -> HeaderValue {
        // built from a UUID or from a value that was already a valid header
        HeaderValue::from_str(&self.0).unwrap_or_else(|_| HeaderValue::from_static("invalid"))
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access to the request ID stored on a request.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Make sure `request` carries a request ID and return it.
pub fn ensure_request_id<B>(request: &mut Request<B>) -> RequestId {
    let supplied = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| RequestId(v.to_string()));

    let id = match supplied {
        Some(id) => id,
        None => {
            let id = RequestId::new();
            request.headers_mut().insert(X_REQUEST_ID, id.header_value());
            id
        }
    };
    request.extensions_mut().insert(id.clone());
    id
}
