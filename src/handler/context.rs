//! Request context module
//!
//! Per-request state shared by the pipeline stages. Created before the
//! endpoint runs, dropped once the response has been written.

use hyper::Method;

use super::lazy::{BuildContext, LazyResponse};
use super::result::HandlerResult;
use crate::error::{Error, Result};
use crate::http::{Annotations, MediaType, Response, TypeDescriptor};

/// State of one request as it moves through the pipeline
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    path: String,
    pub(crate) result: HandlerResult,
    pub(crate) generic_return_type: Option<TypeDescriptor>,
    pub(crate) additional_annotations: Option<Annotations>,
    pub(crate) response_content_type: Option<MediaType>,
    pub(crate) response: Option<LazyResponse>,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            result: HandlerResult::Absent,
            generic_return_type: None,
            additional_annotations: None,
            response_content_type: None,
            response: None,
        }
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub const fn result(&self) -> &HandlerResult {
        &self.result
    }

    pub fn set_result(&mut self, result: impl Into<HandlerResult>) {
        self.result = result.into();
    }

    pub const fn generic_return_type(&self) -> Option<&TypeDescriptor> {
        self.generic_return_type.as_ref()
    }

    pub const fn additional_annotations(&self) -> Option<&Annotations> {
        self.additional_annotations.as_ref()
    }

    pub const fn response_content_type(&self) -> Option<&MediaType> {
        self.response_content_type.as_ref()
    }

    /// Record the media type chosen by content negotiation
    pub fn set_response_content_type(&mut self, media_type: Option<MediaType>) {
        self.response_content_type = media_type;
    }

    /// Whether the response slot holds a built response
    pub fn is_response_built(&self) -> bool {
        self.response.as_ref().is_some_and(LazyResponse::is_built)
    }

    /// The response if it has been built, without forcing a build
    pub fn built_response(&self) -> Option<&Response> {
        self.response.as_ref().and_then(LazyResponse::peek)
    }

    /// The materialized response, built on first access
    pub fn response(&mut self) -> Result<&Response> {
        let lazy = self.response.as_mut().ok_or(Error::NotMaterialized)?;
        let mut cx = BuildContext {
            generic_return_type: &mut self.generic_return_type,
            response_content_type: self.response_content_type.as_ref(),
        };
        lazy.get(&mut cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Entity;

    #[test]
    fn test_response_before_materialization() {
        let mut ctx = RequestContext::new(Method::GET, "/");
        assert!(matches!(ctx.response(), Err(Error::NotMaterialized)));
        assert!(!ctx.is_response_built());
    }

    #[test]
    fn test_set_result_converts() {
        let mut ctx = RequestContext::new(Method::POST, "/items");
        ctx.set_result(Entity::from("x"));
        assert!(matches!(ctx.result(), HandlerResult::Entity(_)));
        assert_eq!(*ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/items");
    }
}
