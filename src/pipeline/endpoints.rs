//! Endpoint registry module
//!
//! Maps (method, path) pairs to application handlers and the media types
//! they can produce. Also holds the demo endpoints served by the binary.

use hyper::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use hyper::{Method, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::error::Result;
use crate::handler::HandlerResult;
use crate::http::entity::PRETTY_JSON;
use crate::http::{Annotations, Entity, GenericEntity, MediaType, Response, TypeDescriptor};

/// What a handler gets to see of the request
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
}

impl RequestInfo {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn header(&self, name: impl hyper::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First value of a query parameter (no percent-decoding)
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.as_deref()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key == name).then_some(value)
        })
    }
}

pub type HandlerFn = Arc<dyn Fn(&RequestInfo) -> Result<HandlerResult> + Send + Sync>;

/// A routable handler
pub struct Endpoint {
    method: Method,
    path: String,
    produces: Vec<MediaType>,
    handler: HandlerFn,
}

impl Endpoint {
    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn produces(&self) -> &[MediaType] {
        &self.produces
    }

    pub fn call(&self, request: &RequestInfo) -> Result<HandlerResult> {
        (self.handler)(request)
    }
}

/// Outcome of an endpoint lookup
pub enum Lookup<'a> {
    Found(&'a Endpoint),
    /// Path exists, method does not; carries the allowed methods
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Exact-path endpoint table
#[derive(Default)]
pub struct Registry {
    endpoints: Vec<Endpoint>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; `produces` entries must be valid media types
    pub fn route<F>(
        &mut self,
        method: Method,
        path: &str,
        produces: &[&str],
        handler: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&RequestInfo) -> Result<HandlerResult> + Send + Sync + 'static,
    {
        let produces = produces
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<MediaType>>>()?;
        self.endpoints.push(Endpoint {
            method,
            path: path.to_string(),
            produces,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    /// Find the endpoint for a request; HEAD falls back to GET
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_> {
        let on_path: Vec<&Endpoint> = self.endpoints.iter().filter(|e| e.path == path).collect();
        if on_path.is_empty() {
            return Lookup::NotFound;
        }

        let find = |m: &Method| on_path.iter().copied().find(|e| e.method == *m);
        let found = find(method).or_else(|| {
            if *method == Method::HEAD {
                find(&Method::GET)
            } else {
                None
            }
        });
        match found {
            Some(endpoint) => Lookup::Found(endpoint),
            None => Lookup::MethodNotAllowed(on_path.iter().map(|e| e.method.clone()).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }
}

#[derive(Debug, Clone, Serialize)]
struct Item {
    id: u32,
    name: &'static str,
}

fn items() -> Vec<Item> {
    vec![
        Item { id: 1, name: "anvil" },
        Item { id: 2, name: "bellows" },
    ]
}

/// Endpoints served by the demo binary, one per handler result shape
pub fn demo_registry() -> Result<Registry> {
    let mut registry = Registry::new();
    registry
        // plain entity, negotiated content type
        .route(Method::GET, "/hello", &["text/plain", "application/json"], |req| {
            Ok(match req.query_param("name") {
                Some(name) => Entity::from(format!("hello, {name}")).into(),
                None => Entity::from("hello").into(),
            })
        })?
        // response carrying its own media type
        .route(Method::GET, "/greeting", &[], |_| {
            let body = serde_json::json!({ "greeting": "hello" });
            Ok(Response::ok(Entity::from(body))
                .with_header(CONTENT_TYPE, "application/json")?
                .build_without_header_copy()
                .into())
        })?
        // declared generic type
        .route(Method::GET, "/items", &["application/json"], |_| {
            let declared = TypeDescriptor::named("List<Item>");
            Ok(GenericEntity::new(Entity::serializable(items()), declared).into())
        })?
        // nothing returned
        .route(Method::GET, "/empty", &["text/plain"], |_| Ok(HandlerResult::Absent))?
        // response with status, location and annotations
        .route(Method::POST, "/items", &["application/json"], |_| {
            let item = Item { id: 3, name: "crucible" };
            Ok(Response::builder(StatusCode::CREATED)
                .with_header(LOCATION, &format!("/items/{}", item.id))?
                .with_entity(Entity::serializable(item))
                .with_annotations(Annotations::new().with(PRETTY_JSON, "true"))
                .build_without_header_copy()
                .into())
        })?;
    Ok(registry)
}
