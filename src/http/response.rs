//! Response representation and builders
//!
//! [`Response`] is the finalized, pre-serialization model of an HTTP response.
//! Builders come in two flavours behind the [`ResponseBuilder`] trait:
//! - [`RestResponseBuilder`], the runtime's own builder, which can hand its
//!   header map straight to the response it builds
//! - [`HttpResponseBuilder`], a generic builder that goes through
//!   `hyper::http::response::Builder` and copies every header
//!
//! Both produce the same status, headers and entity for the same input.

use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{http, StatusCode};

use super::entity::{Annotations, ResponseEntity};
use super::media::MediaType;
use crate::error::{Error, Result};

/// Finalized response: status, headers and an optional entity
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    entity: Option<ResponseEntity>,
    entity_annotations: Option<Annotations>,
}

impl Response {
    /// Start a runtime builder with the given status
    pub fn builder(status: StatusCode) -> RestResponseBuilder {
        RestResponseBuilder::new(status)
    }

    /// 200 with an entity
    pub fn ok(entity: impl Into<ResponseEntity>) -> RestResponseBuilder {
        RestResponseBuilder::new(StatusCode::OK).with_entity(entity)
    }

    /// 204 without an entity
    pub fn no_content() -> RestResponseBuilder {
        RestResponseBuilder::new(StatusCode::NO_CONTENT)
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub const fn entity(&self) -> Option<&ResponseEntity> {
        self.entity.as_ref()
    }

    pub const fn has_entity(&self) -> bool {
        self.entity.is_some()
    }

    /// Annotations set through the runtime builder; `None` for responses
    /// converted from a plain `http::Response`
    pub const fn entity_annotations(&self) -> Option<&Annotations> {
        self.entity_annotations.as_ref()
    }

    /// Media type from the `Content-Type` header, if present and parseable
    pub fn media_type(&self) -> Option<MediaType> {
        self.headers
            .get(CONTENT_TYPE)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }
}

/// Externally constructed responses never carry entity annotations
impl From<http::Response<Option<ResponseEntity>>> for Response {
    fn from(response: http::Response<Option<ResponseEntity>>) -> Self {
        let (parts, entity) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            entity,
            entity_annotations: None,
        }
    }
}

/// Step-by-step constructor for a [`Response`]
pub trait ResponseBuilder {
    fn status(&mut self, status: StatusCode);

    /// Append a header value; fails when the value is not a valid header value
    fn header(&mut self, name: HeaderName, value: &str) -> Result<()>;

    fn entity(&mut self, entity: Option<ResponseEntity>);

    /// Standard build path: the builder keeps its state and can build again
    fn build(&self) -> Result<Response>;

    /// Hand back the runtime's own builder, or `Err(self)` for any other
    /// implementation
    fn into_rest(self: Box<Self>) -> Result<RestResponseBuilder, Box<dyn ResponseBuilder>>;
}

/// The runtime's own builder
#[derive(Debug, Clone)]
pub struct RestResponseBuilder {
    status: StatusCode,
    headers: HeaderMap,
    entity: Option<ResponseEntity>,
    entity_annotations: Option<Annotations>,
}

impl RestResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            entity: None,
            entity_annotations: None,
        }
    }

    /// Copy-from-existing initialization; takes the response by value so its
    /// header map is reused rather than cloned
    pub fn from_response(existing: Response) -> Self {
        Self {
            status: existing.status,
            headers: existing.headers,
            entity: existing.entity,
            entity_annotations: existing.entity_annotations,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        ResponseBuilder::header(&mut self, name, value)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<ResponseEntity>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    #[must_use]
    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.entity_annotations = Some(annotations);
        self
    }

    /// Build by moving the header map into the response
    pub fn build_without_header_copy(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            entity: self.entity,
            entity_annotations: self.entity_annotations,
        }
    }
}

impl ResponseBuilder for RestResponseBuilder {
    fn status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn header(&mut self, name: HeaderName, value: &str) -> Result<()> {
        let value = HeaderValue::from_str(value).map_err(|source| Error::InvalidHeaderValue {
            name: name.to_string(),
            source,
        })?;
        self.headers.append(name, value);
        Ok(())
    }

    fn entity(&mut self, entity: Option<ResponseEntity>) {
        self.entity = entity;
    }

    fn build(&self) -> Result<Response> {
        Ok(self.clone().build_without_header_copy())
    }

    fn into_rest(self: Box<Self>) -> Result<Self, Box<dyn ResponseBuilder>> {
        Ok(*self)
    }
}

/// Generic builder backed by `hyper::http::response::Builder`
///
/// Header values are only validated when the response is built.
#[derive(Debug, Default)]
pub struct HttpResponseBuilder {
    status: StatusCode,
    headers: Vec<(HeaderName, Vec<u8>)>,
    entity: Option<ResponseEntity>,
}

impl HttpResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn from_response(existing: &Response) -> Self {
        Self {
            status: existing.status,
            headers: existing
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.as_bytes().to_vec()))
                .collect(),
            entity: existing.entity.clone(),
        }
    }
}

impl ResponseBuilder for HttpResponseBuilder {
    fn status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn header(&mut self, name: HeaderName, value: &str) -> Result<()> {
        self.headers.push((name, value.as_bytes().to_vec()));
        Ok(())
    }

    fn entity(&mut self, entity: Option<ResponseEntity>) {
        self.entity = entity;
    }

    fn build(&self) -> Result<Response> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name, value.as_slice());
        }
        Ok(builder.body(self.entity.clone())?.into())
    }

    fn into_rest(self: Box<Self>) -> Result<RestResponseBuilder, Box<dyn ResponseBuilder>> {
        Err(self)
    }
}

/// Source of builders, the seam between the materializer and a builder
/// implementation
pub trait ResponseFactory: Send + Sync {
    /// Builder initialized from an existing response
    fn from_response(&self, existing: Response) -> Box<dyn ResponseBuilder>;

    /// Empty builder with the given status
    fn with_status(&self, status: StatusCode) -> Box<dyn ResponseBuilder>;
}

/// Factory for the runtime's own builders
#[derive(Debug, Clone, Copy, Default)]
pub struct RestRuntime;

impl ResponseFactory for RestRuntime {
    fn from_response(&self, existing: Response) -> Box<dyn ResponseBuilder> {
        Box::new(RestResponseBuilder::from_response(existing))
    }

    fn with_status(&self, status: StatusCode) -> Box<dyn ResponseBuilder> {
        Box::new(RestResponseBuilder::new(status))
    }
}

/// Factory for generic `http` builders
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpRuntime;

impl ResponseFactory for HttpRuntime {
    fn from_response(&self, existing: Response) -> Box<dyn ResponseBuilder> {
        Box::new(HttpResponseBuilder::from_response(&existing))
    }

    fn with_status(&self, status: StatusCode) -> Box<dyn ResponseBuilder> {
        Box::new(HttpResponseBuilder::new(status))
    }
}

/// Build a finished builder, skipping the header copy when the builder is
/// the runtime's own
pub fn finish(builder: Box<dyn ResponseBuilder>) -> Result<Response> {
    match builder.into_rest() {
        Ok(rest) => Ok(rest.build_without_header_copy()),
        Err(other) => other.build(),
    }
}
