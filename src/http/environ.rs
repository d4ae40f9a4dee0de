//! Request record decoding.
//!
//! # Responsibilities
//! - Decode one JSON request record (`bridge/1`) from an input line
//! - Validate the environ against its fixed schema
//! - Build the `Request` handed to the application
//!
//! # Design Decisions
//! - Records are data, never code: serde is the only interpreter
//! - Unknown top-level fields are rejected; unknown environ keys are kept
//!   as [`EnvironExtras`] so host-specific keys reach the application
//! - Every rejection maps to a status code so the loop can answer and continue

use std::collections::BTreeMap;

use axum::{
    body::Body,
    http::{
        header::{self, HeaderName, HeaderValue},
        Method, Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::EnvironDefaults;

/// Version of the request record format understood by this bridge.
pub const PROTOCOL_VERSION: u32 = 1;

fn protocol_version() -> u32 {
    PROTOCOL_VERSION
}

fn default_server_protocol() -> String {
    "HTTP/1.1".to_string()
}

/// One line of input: a request environment plus its body.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RequestRecord {
    /// Record format version.
    #[serde(default = "protocol_version")]
    pub version: u32,

    /// The request environment.
    pub environ: Environ,

    /// Request body as text.
    #[serde(default)]
    pub body: String,
}

/// The request environment, keyed the CGI way.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Environ {
    #[serde(rename = "REQUEST_METHOD")]
    pub request_method: String,

    #[serde(rename = "SCRIPT_NAME", default)]
    pub script_name: String,

    #[serde(rename = "PATH_INFO", default)]
    pub path_info: String,

    #[serde(rename = "QUERY_STRING", default)]
    pub query_string: String,

    #[serde(rename = "CONTENT_TYPE", default)]
    pub content_type: String,

    /// Declared body length; empty when the host did not declare one.
    #[serde(rename = "CONTENT_LENGTH", default)]
    pub content_length: String,

    #[serde(rename = "SERVER_NAME", default)]
    pub server_name: Option<String>,

    #[serde(rename = "SERVER_PORT", default)]
    pub server_port: Option<String>,

    #[serde(rename = "SERVER_PROTOCOL", default = "default_server_protocol")]
    pub server_protocol: String,

    #[serde(rename = "wsgi.url_scheme", default)]
    pub url_scheme: Option<String>,

    /// `HTTP_*` headers and any host-specific keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Environ keys that are neither fixed CGI keys nor `HTTP_*` headers.
///
/// Attached to every decoded request as an extension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironExtras(pub BTreeMap<String, Value>);

/// URL scheme the host received the request on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlScheme(pub String);

/// Reasons a request record cannot be turned into a request.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("request record exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("malformed request record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported record version {0}")]
    UnsupportedVersion(u32),

    #[error("unsupported server protocol '{0}'")]
    UnsupportedProtocol(String),

    #[error("invalid request method '{0}'")]
    InvalidMethod(String),

    #[error("invalid request target '{0}'")]
    InvalidTarget(String),

    #[error("invalid header {0}")]
    InvalidHeader(String),

    #[error("invalid CONTENT_LENGTH '{0}'")]
    InvalidContentLength(String),

    #[error("CONTENT_LENGTH {declared} does not match body length {actual}")]
    ContentLengthMismatch { declared: u64, actual: u64 },
}

impl DecodeError {
    /// Status code reported to the host for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            DecodeError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            DecodeError::UnsupportedVersion(_) | DecodeError::UnsupportedProtocol(_) => {
                StatusCode::HTTP_VERSION_NOT_SUPPORTED
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for DecodeError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

impl RequestRecord {
    /// Decode a record from one input line.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Build the request for the application.
    pub fn into_request(self, defaults: &EnvironDefaults) -> Result<Request<Body>, DecodeError> {
        if self.version != PROTOCOL_VERSION {
            return Err(DecodeError::UnsupportedVersion(self.version));
        }
        let env = self.environ;

        let method = Method::from_bytes(env.request_method.as_bytes())
            .map_err(|_| DecodeError::InvalidMethod(env.request_method.clone()))?;
        let version = parse_version(&env.server_protocol)?;
        let uri = build_target(&env)?;

        let body_len = self.body.len() as u64;
        let declared = match env.content_length.trim() {
            "" => None,
            raw => Some(
                raw.parse::<u64>()
                    .map_err(|_| DecodeError::InvalidContentLength(raw.to_string()))?,
            ),
        };
        if let Some(declared) = declared {
            if declared != body_len {
                return Err(DecodeError::ContentLengthMismatch {
                    declared,
                    actual: body_len,
                });
            }
        }

        let scheme = env
            .url_scheme
            .clone()
            .unwrap_or_else(|| defaults.url_scheme.clone());

        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .version(version)
            .body(Body::from(self.body))
            .map_err(|e| DecodeError::InvalidTarget(e.to_string()))?;

        let fallback_host = host_header(&env, defaults, &scheme);
        let mut extras = BTreeMap::new();
        let headers = request.headers_mut();
        for (key, value) in env.extra {
            let Some(name) = key
                .strip_prefix("HTTP_")
                .map(|n| n.replace('_', "-").to_ascii_lowercase())
            else {
                extras.insert(key, value);
                continue;
            };
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DecodeError::InvalidHeader(key.clone()))?;
            // body framing comes from CONTENT_LENGTH only
            if header_name == header::CONTENT_LENGTH {
                continue;
            }
            let header_value = value
                .as_str()
                .and_then(|v| HeaderValue::from_str(v).ok())
                .ok_or_else(|| DecodeError::InvalidHeader(key.clone()))?;
            headers.append(header_name, header_value);
        }

        if !env.content_type.is_empty() {
            let value = HeaderValue::from_str(&env.content_type)
                .map_err(|_| DecodeError::InvalidHeader("CONTENT_TYPE".to_string()))?;
            headers.insert(header::CONTENT_TYPE, value);
        }
        if declared.is_some() || body_len > 0 {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body_len));
        }

        if !headers.contains_key(header::HOST) {
            let value = HeaderValue::from_str(&fallback_host)
                .map_err(|_| DecodeError::InvalidHeader("SERVER_NAME".to_string()))?;
            headers.insert(header::HOST, value);
        }

        request.extensions_mut().insert(UrlScheme(scheme));
        request.extensions_mut().insert(EnvironExtras(extras));
        Ok(request)
    }
}

fn parse_version(protocol: &str) -> Result<Version, DecodeError> {
    match protocol {
        "HTTP/1.0" => Ok(Version::HTTP_10),
        "" | "HTTP/1.1" => Ok(Version::HTTP_11),
        "HTTP/2" | "HTTP/2.0" => Ok(Version::HTTP_2),
        other => Err(DecodeError::UnsupportedProtocol(other.to_string())),
    }
}

fn build_target(env: &Environ) -> Result<Uri, DecodeError> {
    let mut target = format!("{}{}", env.script_name, env.path_info);
    if target.is_empty() {
        target.push('/');
    }
    if !target.starts_with('/') {
        return Err(DecodeError::InvalidTarget(target));
    }
    if !env.query_string.is_empty() {
        target.push('?');
        target.push_str(&env.query_string);
    }
    target
        .parse::<Uri>()
        .map_err(|_| DecodeError::InvalidTarget(target))
}

fn host_header(env: &Environ, defaults: &EnvironDefaults, scheme: &str) -> String {
    let name = env
        .server_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(&defaults.server_name);
    let port = env
        .server_port
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or(&defaults.server_port);

    let default_port = match scheme {
        "https" => "443",
        _ => "80",
    };
    if port == default_port {
        name.to_string()
    } else {
        format!("{name}:{port}")
    }
}
