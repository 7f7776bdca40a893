//! Response materialization
//!
//! Turns whatever an endpoint returned into the response slot of the request
//! context. A response returned by the endpoint is rebuilt right away; any
//! other result is wrapped in a deferred build that runs when a later stage
//! first reads the response.
//!
//! Content type rules:
//! - a `Content-Type` already on a returned response wins and is recorded as
//!   the context's response content type
//! - otherwise the negotiated content type, if any, becomes the header
//!
//! The header is never written twice.

use hyper::header::CONTENT_TYPE;
use hyper::StatusCode;
use std::sync::Arc;

use super::context::RequestContext;
use super::lazy::LazyResponse;
use super::result::HandlerResult;
use crate::error::{Error, Result};
use crate::http::response::finish;
use crate::http::{
    Entity, GenericEntity, Response, ResponseBuilder, ResponseEntity, ResponseFactory, RestRuntime,
};

/// Statuses used when the endpoint did not return a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    /// Status for a returned value
    pub entity: StatusCode,
    /// Status when nothing was returned
    pub absent: StatusCode,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            entity: StatusCode::OK,
            absent: StatusCode::NO_CONTENT,
        }
    }
}

/// Non-response results waiting for their deferred build
enum Pending {
    Declared(GenericEntity),
    Entity(Entity),
    Absent,
}

/// Converts handler results into the request's response
#[derive(Clone)]
pub struct Materializer {
    factory: Arc<dyn ResponseFactory>,
    policy: StatusPolicy,
}

impl Materializer {
    pub fn new(policy: StatusPolicy) -> Self {
        Self::with_factory(Arc::new(RestRuntime), policy)
    }

    pub fn with_factory(factory: Arc<dyn ResponseFactory>, policy: StatusPolicy) -> Self {
        Self { factory, policy }
    }

    pub const fn policy(&self) -> StatusPolicy {
        self.policy
    }

    /// Fill the context's response slot from its handler result
    ///
    /// Consumes the result slot. Fails with [`Error::AlreadyMaterialized`] if
    /// the response slot is already set; builder errors are returned as is.
    pub fn materialize(&self, ctx: &mut RequestContext) -> Result<()> {
        if ctx.response.is_some() {
            return Err(Error::AlreadyMaterialized);
        }

        let lazy = match std::mem::take(&mut ctx.result) {
            HandlerResult::Response(existing) => {
                LazyResponse::existing(self.rebuild_existing(ctx, existing)?)
            }
            HandlerResult::Declared(generic) => self.deferred(Pending::Declared(generic)),
            HandlerResult::Entity(entity) => self.deferred(Pending::Entity(entity)),
            HandlerResult::Absent => self.deferred(Pending::Absent),
        };
        ctx.response = Some(lazy);
        Ok(())
    }

    fn rebuild_existing(&self, ctx: &mut RequestContext, existing: Response) -> Result<Response> {
        let has_content_type = existing.headers().contains_key(CONTENT_TYPE);
        let existing_media_type = existing.media_type();
        let declared = match existing.entity() {
            Some(ResponseEntity::Declared(generic)) => Some(generic.clone().into_parts()),
            _ => None,
        };

        let mut builder = if let Some((entity, declared_type)) = declared {
            ctx.generic_return_type = Some(declared_type);
            let mut builder = self.factory.from_response(existing);
            builder.entity(Some(ResponseEntity::Plain(entity)));
            builder
        } else {
            // a bare entity gives no declared shape; its runtime type is the best available
            if let Some(entity) = existing.entity() {
                ctx.generic_return_type = Some(entity.value().runtime_type().clone());
            }
            if let Some(annotations) = existing.entity_annotations() {
                ctx.additional_annotations = Some(annotations.clone());
            }
            self.factory.from_response(existing)
        };

        if has_content_type {
            // None when the existing header does not parse
            ctx.response_content_type = existing_media_type;
        } else if let Some(produces) = &ctx.response_content_type {
            builder.header(CONTENT_TYPE, &produces.to_string())?;
        }

        finish(builder)
    }

    fn deferred(&self, pending: Pending) -> LazyResponse {
        let factory = Arc::clone(&self.factory);
        let policy = self.policy;

        LazyResponse::deferred(move |cx| {
            let mut builder = match pending {
                Pending::Declared(generic) => {
                    let (entity, declared_type) = generic.into_parts();
                    *cx.generic_return_type = Some(declared_type);
                    with_entity(factory.with_status(policy.entity), entity)
                }
                Pending::Absent => factory.with_status(policy.absent),
                Pending::Entity(entity) => with_entity(factory.with_status(policy.entity), entity),
            };

            if let Some(produces) = cx.response_content_type {
                builder.header(CONTENT_TYPE, &produces.to_string())?;
            }
            finish(builder)
        })
    }
}

impl Default for Materializer {
    fn default() -> Self {
        Self::new(StatusPolicy::default())
    }
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn with_entity(mut builder: Box<dyn ResponseBuilder>, entity: Entity) -> Box<dyn ResponseBuilder> {
    builder.entity(Some(ResponseEntity::Plain(entity)));
    builder
}
