//! Fixed status responses
//!
//! Plain-text responses for requests that never reach an endpoint, and the
//! generic translation of pipeline errors.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};

use crate::error::Error;
use crate::logger;

/// Build a plain-text response for `status` with its canonical reason as body
fn build_status_response(status: StatusCode, extra: &[(&str, String)]) -> Response<Full<Bytes>> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = format!("{} {reason}", status.as_u16());
    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", body.len());
    for (name, value) in extra {
        builder = builder.header(*name, value.as_str());
    }
    builder.body(Full::new(Bytes::from(body))).unwrap_or_else(|e| {
        log_build_error(status, &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_status_response(StatusCode::NOT_FOUND, &[])
}

/// Build 405 Method Not Allowed response listing the allowed methods
pub fn build_405_response(allowed: &[Method]) -> Response<Full<Bytes>> {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    build_status_response(StatusCode::METHOD_NOT_ALLOWED, &[("Allow", allow)])
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_status_response(StatusCode::PAYLOAD_TOO_LARGE, &[])
}

/// Translate a pipeline error into a response
///
/// Negotiation failures become 406; everything else is logged and becomes 500.
pub fn build_error_response(error: &Error) -> Response<Full<Bytes>> {
    match error {
        Error::NotAcceptable => build_status_response(StatusCode::NOT_ACCEPTABLE, &[]),
        other => {
            logger::log_error(&format!("Request failed: {other}"));
            build_status_response(StatusCode::INTERNAL_SERVER_ERROR, &[])
        }
    }
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_404() {
        let response = build_404_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_405_allow_header() {
        let response = build_405_response(&[Method::GET, Method::POST]);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get("allow").unwrap(), "GET, POST");
    }

    #[test]
    fn test_error_translation() {
        assert_eq!(
            build_error_response(&Error::NotAcceptable).status(),
            StatusCode::NOT_ACCEPTABLE
        );
        assert_eq!(
            build_error_response(&Error::Handler("boom".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(build_413_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
