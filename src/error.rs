//! Crate-wide error type
//!
//! Builder failures, serialization failures and pipeline failures all end up
//! here. The materializer never wraps or reclassifies an error it receives from
//! a builder; it simply propagates it with `?`.

use hyper::http;

/// Errors raised while materializing or writing a response
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid value for header {name}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },

    #[error("invalid status code: {0}")]
    InvalidStatus(#[from] http::status::InvalidStatusCode),

    #[error("invalid media type: {0:?}")]
    InvalidMediaType(String),

    #[error("response already materialized for this request")]
    AlreadyMaterialized,

    #[error("response has not been materialized")]
    NotMaterialized,

    #[error("deferred response build failed earlier for this request")]
    BuildFailed,

    #[error("no acceptable representation")]
    NotAcceptable,

    #[error("no writer for entity of type {type_name} as {media_type}")]
    NoWriter {
        type_name: String,
        media_type: String,
    },

    #[error("failed to serialize entity: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("failed to assemble http response: {0}")]
    Http(#[from] http::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
