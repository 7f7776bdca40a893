//! Request pipeline module
//!
//! Stages run once per request, in order:
//! 1. endpoint lookup (404 / 405 on failure)
//! 2. content negotiation against the endpoint's `produces` list (406)
//! 3. the endpoint itself
//! 4. materialization of its result into the response slot
//! 5. entity writing into a hyper response
//!
//! Any error from stages 2–5 goes through the generic error translation.

pub mod endpoints;
pub mod negotiate;
pub mod status;
pub mod writer;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderMap, ACCEPT, CONTENT_LENGTH, REFERER, USER_AGENT};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

pub use endpoints::{demo_registry, Endpoint, Lookup, Registry, RequestInfo};
pub use negotiate::negotiate;
pub use writer::{EntityWriter, Writers};

use crate::config::Config;
use crate::error::Result;
use crate::handler::{Materializer, RequestContext};
use crate::logger::{self, AccessLogEntry};
use crate::server::AppState;

/// Endpoint table plus the stages that turn a handler result into bytes
pub struct Pipeline {
    registry: Registry,
    materializer: Materializer,
    writers: Writers,
    server_name: String,
}

impl Pipeline {
    pub fn new(
        registry: Registry,
        materializer: Materializer,
        writers: Writers,
        server_name: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            materializer,
            writers,
            server_name: server_name.into(),
        }
    }

    /// Pipeline using the configured status policy and builder runtime
    pub fn from_config(config: &Config, registry: Registry) -> Result<Self> {
        Ok(Self::new(
            registry,
            config.materializer.to_materializer()?,
            Writers::default(),
            config.http.server_name.clone(),
        ))
    }

    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run a request through every stage; never fails
    pub fn dispatch(&self, request: &RequestInfo) -> Response<Full<Bytes>> {
        let endpoint = match self.registry.lookup(&request.method, &request.path) {
            Lookup::Found(endpoint) => endpoint,
            Lookup::MethodNotAllowed(allowed) => return status::build_405_response(&allowed),
            Lookup::NotFound => return status::build_404_response(),
        };

        self.process(endpoint, request)
            .unwrap_or_else(|e| status::build_error_response(&e))
    }

    fn process(&self, endpoint: &Endpoint, request: &RequestInfo) -> Result<Response<Full<Bytes>>> {
        let mut ctx = RequestContext::new(request.method.clone(), request.path.clone());
        ctx.set_response_content_type(negotiate(request.header(ACCEPT), endpoint.produces())?);
        ctx.set_result(endpoint.call(request)?);
        self.materializer.materialize(&mut ctx)?;
        self.writers
            .write_response(&mut ctx, &self.server_name, request.method == Method::HEAD)
    }
}

/// hyper entry point for one request
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();

    if let Some(resp) = check_body_size(req.headers(), state.config.http.max_body_size) {
        return Ok(resp);
    }

    let info = RequestInfo {
        method: req.method().clone(),
        path: req.uri().path().to_string(),
        query: req.uri().query().map(ToString::to_string),
        headers: req.headers().clone(),
    };
    let response = state.pipeline.dispatch(&info);

    if state.config.logging.access_log {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            info.method.to_string(),
            info.path.clone(),
        );
        entry.query = info.query.clone();
        entry.http_version = format!("{:?}", req.version()).trim_start_matches("HTTP/").to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        entry.referer = info.header(REFERER).map(ToString::to_string);
        entry.user_agent = info.header(USER_AGENT).map(ToString::to_string);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// 413 when the declared body length is over `max_body_size`
///
/// Endpoints never read request bodies, so only the declared length is
/// checked; an unreadable `Content-Length` is logged and let through.
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let declared = headers.get(CONTENT_LENGTH)?;
    let Some(size) = declared.to_str().ok().and_then(|v| v.trim().parse::<u64>().ok()) else {
        logger::log_warning(&format!("Ignoring unreadable Content-Length {declared:?}"));
        return None;
    };
    (size > max_body_size).then(|| {
        logger::log_warning(&format!("Rejecting {size}-byte body (limit {max_body_size})"));
        status::build_413_response()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::handler::HandlerResult;
    use crate::http::Entity;
    use http_body_util::BodyExt;
    use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE, LOCATION};
    use hyper::StatusCode;

    fn pipeline() -> Pipeline {
        Pipeline::new(
            demo_registry().unwrap(),
            Materializer::default(),
            Writers::default(),
            "rest-reply-test",
        )
    }

    fn request(method: Method, path: &str, accept: Option<&'static str>) -> RequestInfo {
        let mut info = RequestInfo::new(method, path);
        if let Some(accept) = accept {
            info.headers.insert(ACCEPT, HeaderValue::from_static(accept));
        }
        info
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_hello_negotiates_text() {
        let response = pipeline().dispatch(&request(Method::GET, "/hello", Some("text/plain")));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(body_string(response).await, "hello");
    }

    #[tokio::test]
    async fn test_hello_negotiates_json() {
        let mut req = request(Method::GET, "/hello", Some("application/json"));
        req.query = Some("name=ada".to_string());
        let response = pipeline().dispatch(&req);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(body_string(response).await, "\"hello, ada\"");
    }

    #[tokio::test]
    async fn test_greeting_keeps_its_own_content_type() {
        let response = pipeline().dispatch(&request(Method::GET, "/greeting", None));
        assert_eq!(response.status(), StatusCode::OK);
        let content_types: Vec<_> = response.headers().get_all(CONTENT_TYPE).iter().collect();
        assert_eq!(content_types, vec!["application/json"]);
        assert_eq!(body_string(response).await, r#"{"greeting":"hello"}"#);
    }

    #[tokio::test]
    async fn test_items_declared_type() {
        let response = pipeline().dispatch(&request(Method::GET, "/items", None));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            r#"[{"id":1,"name":"anvil"},{"id":2,"name":"bellows"}]"#
        );
    }

    #[tokio::test]
    async fn test_empty_is_no_content() {
        let response = pipeline().dispatch(&request(Method::GET, "/empty", None));
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        // negotiated type is still recorded as the header
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_created_item() {
        let response = pipeline().dispatch(&request(Method::POST, "/items", None));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/items/3");
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(
            body_string(response).await,
            "{\n  \"id\": 3,\n  \"name\": \"crucible\"\n}"
        );
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let response = pipeline().dispatch(&request(Method::HEAD, "/hello", None));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), "5");
        assert!(body_string(response).await.is_empty());
    }

    #[test]
    fn test_routing_failures() {
        let pipeline = pipeline();
        let response = pipeline.dispatch(&request(Method::GET, "/missing", None));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = pipeline.dispatch(&request(Method::DELETE, "/items", None));
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "GET, POST");

        let response = pipeline.dispatch(&request(Method::GET, "/items", Some("image/png")));
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    }

    #[test]
    fn test_body_size_check() {
        let mut headers = HeaderMap::new();
        assert!(check_body_size(&headers, 4).is_none());

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("4"));
        assert!(check_body_size(&headers, 4).is_none());

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("5"));
        let response = check_body_size(&headers, 4).unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert!(check_body_size(&headers, 4).is_none());
    }

    #[test]
    fn test_handler_error_becomes_500() {
        let mut registry = Registry::new();
        registry
            .route(Method::GET, "/boom", &[], |_| Err(Error::Handler("boom".to_string())))
            .unwrap()
            .route(Method::GET, "/opaque", &[], |_| {
                struct Opaque;
                Ok(HandlerResult::Entity(Entity::new(Opaque)))
            })
            .unwrap();
        let pipeline = Pipeline::new(registry, Materializer::default(), Writers::default(), "t");

        let response = pipeline.dispatch(&request(Method::GET, "/boom", None));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let response = pipeline.dispatch(&request(Method::GET, "/opaque", None));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
