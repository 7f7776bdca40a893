//! Response writing module
//!
//! Serializes a materialized response into a hyper response. Entity writers
//! are chosen by the request's generic return type (falling back to the
//! entity's runtime type) and the response content type.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_LENGTH, SERVER};
use hyper::http;

use crate::error::{Error, Result};
use crate::handler::RequestContext;
use crate::http::entity::PRETTY_JSON;
use crate::http::{Annotations, Entity, MediaType, TypeDescriptor};

/// Turns an entity into body bytes
pub trait EntityWriter: Send + Sync {
    /// Whether this writer handles `entity`, seen as `ty`, for `media_type`
    fn accepts(
        &self,
        ty: &TypeDescriptor,
        entity: &Entity,
        media_type: Option<&MediaType>,
    ) -> bool;

    fn write(&self, entity: &Entity, annotations: Option<&Annotations>) -> Result<Bytes>;
}

/// `String` and `&'static str` as text
pub struct TextWriter;

impl EntityWriter for TextWriter {
    fn accepts(
        &self,
        ty: &TypeDescriptor,
        entity: &Entity,
        media_type: Option<&MediaType>,
    ) -> bool {
        let textual = (ty.is::<String>() && entity.downcast_ref::<String>().is_some())
            || (ty.is::<&'static str>() && entity.downcast_ref::<&'static str>().is_some());
        textual && media_type.map_or(true, |m| m.kind() == "text")
    }

    fn write(&self, entity: &Entity, _annotations: Option<&Annotations>) -> Result<Bytes> {
        if let Some(s) = entity.downcast_ref::<String>() {
            return Ok(Bytes::from(s.clone()));
        }
        entity
            .downcast_ref::<&'static str>()
            .map(|s| Bytes::from_static(s.as_bytes()))
            .ok_or_else(|| no_writer(entity.runtime_type(), None))
    }
}

/// Raw `Vec<u8>` and `Bytes` bodies, for any media type
pub struct BytesWriter;

impl EntityWriter for BytesWriter {
    fn accepts(
        &self,
        _ty: &TypeDescriptor,
        entity: &Entity,
        _media_type: Option<&MediaType>,
    ) -> bool {
        entity.downcast_ref::<Vec<u8>>().is_some() || entity.downcast_ref::<Bytes>().is_some()
    }

    fn write(&self, entity: &Entity, _annotations: Option<&Annotations>) -> Result<Bytes> {
        if let Some(bytes) = entity.downcast_ref::<Bytes>() {
            return Ok(bytes.clone());
        }
        entity
            .downcast_ref::<Vec<u8>>()
            .map(|v| Bytes::from(v.clone()))
            .ok_or_else(|| no_writer(entity.runtime_type(), None))
    }
}

/// Any serializable entity as JSON; honours the `json.pretty` annotation
pub struct JsonWriter;

impl EntityWriter for JsonWriter {
    fn accepts(
        &self,
        _ty: &TypeDescriptor,
        entity: &Entity,
        media_type: Option<&MediaType>,
    ) -> bool {
        entity.is_serializable() && media_type.map_or(true, MediaType::is_json)
    }

    fn write(&self, entity: &Entity, annotations: Option<&Annotations>) -> Result<Bytes> {
        let value = entity
            .to_json()
            .ok_or_else(|| no_writer(entity.runtime_type(), None))??;
        let pretty = annotations.is_some_and(|a| a.is_enabled(PRETTY_JSON));
        let body = if pretty {
            serde_json::to_vec_pretty(&value)?
        } else {
            serde_json::to_vec(&value)?
        };
        Ok(Bytes::from(body))
    }
}

fn no_writer(ty: &TypeDescriptor, media_type: Option<&MediaType>) -> Error {
    Error::NoWriter {
        type_name: ty.name().to_string(),
        media_type: media_type.map_or_else(|| "*/*".to_string(), ToString::to_string),
    }
}

/// Ordered set of entity writers; the first accepting writer wins
pub struct Writers {
    writers: Vec<Box<dyn EntityWriter>>,
}

impl Writers {
    pub fn empty() -> Self {
        Self { writers: Vec::new() }
    }

    /// Add a writer that takes precedence over the ones already registered
    pub fn register(&mut self, writer: Box<dyn EntityWriter>) {
        self.writers.insert(0, writer);
    }

    fn find(
        &self,
        ty: &TypeDescriptor,
        entity: &Entity,
        media_type: Option<&MediaType>,
    ) -> Option<&dyn EntityWriter> {
        self.writers
            .iter()
            .find(|w| w.accepts(ty, entity, media_type))
            .map(AsRef::as_ref)
    }

    /// Serialize the request's response, building it first if needed
    ///
    /// With `is_head` the body is dropped but `Content-Length` still reflects it.
    pub fn write_response(
        &self,
        ctx: &mut RequestContext,
        server_name: &str,
        is_head: bool,
    ) -> Result<http::Response<Full<Bytes>>> {
        ctx.response()?;
        let response = ctx.built_response().ok_or(Error::BuildFailed)?;

        let body = match response.entity() {
            Some(entity) => {
                let entity = entity.value();
                let ty = ctx
                    .generic_return_type()
                    .unwrap_or_else(|| entity.runtime_type());
                let media_type = response.media_type();
                let media_type = media_type.as_ref().or_else(|| ctx.response_content_type());
                let writer = self
                    .find(ty, entity, media_type)
                    .ok_or_else(|| no_writer(ty, media_type))?;
                let annotations = ctx
                    .additional_annotations()
                    .or_else(|| response.entity_annotations());
                writer.write(entity, annotations)?
            }
            None => Bytes::new(),
        };

        let mut builder = http::Response::builder().status(response.status());
        for (name, value) in response.headers() {
            builder = builder.header(name, value);
        }
        if !response.headers().contains_key(SERVER) {
            builder = builder.header(SERVER, HeaderValue::from_str(server_name).map_err(|source| {
                Error::InvalidHeaderValue {
                    name: SERVER.to_string(),
                    source,
                }
            })?);
        }
        if response.has_entity() {
            builder = builder.header(CONTENT_LENGTH, body.len());
        }

        let body = if is_head { Bytes::new() } else { body };
        Ok(builder.body(Full::new(body))?)
    }
}

impl Default for Writers {
    fn default() -> Self {
        Self {
            writers: vec![Box::new(TextWriter), Box::new(BytesWriter), Box::new(JsonWriter)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerResult, Materializer};
    use crate::http::{GenericEntity, Response};
    use http_body_util::BodyExt;
    use hyper::header::CONTENT_TYPE;
    use hyper::{Method, StatusCode};
    use std::collections::BTreeMap;

    fn materialized(
        result: impl Into<HandlerResult>,
        negotiated: Option<MediaType>,
    ) -> RequestContext {
        let mut ctx = RequestContext::new(Method::GET, "/");
        ctx.set_result(result);
        ctx.set_response_content_type(negotiated);
        Materializer::default().materialize(&mut ctx).unwrap();
        ctx
    }

    async fn body_of(response: http::Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_text_entity() {
        let mut ctx = materialized(Entity::from("hello"), Some(MediaType::text_plain()));
        let response = Writers::default().write_response(&mut ctx, "test", false).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), "5");
        assert_eq!(response.headers().get(SERVER).unwrap(), "test");
        assert_eq!(body_of(response).await, "hello");
    }

    #[tokio::test]
    async fn test_string_as_json() {
        let mut ctx = materialized(Entity::from("hello"), Some(MediaType::application_json()));
        let response = Writers::default().write_response(&mut ctx, "test", false).unwrap();
        assert_eq!(body_of(response).await, "\"hello\"");
    }

    #[tokio::test]
    async fn test_pretty_json_annotation() {
        let map = BTreeMap::from([("k", "v")]);
        let existing = Response::ok(Entity::serializable(map))
            .with_header(CONTENT_TYPE, "application/json")
            .unwrap()
            .with_annotations(Annotations::new().with(PRETTY_JSON, "true"))
            .build_without_header_copy();
        let mut ctx = materialized(existing, None);
        let response = Writers::default().write_response(&mut ctx, "test", false).unwrap();
        assert_eq!(body_of(response).await, "{\n  \"k\": \"v\"\n}");
    }

    #[tokio::test]
    async fn test_declared_type_routes_to_json() {
        let generic = GenericEntity::new("plain", TypeDescriptor::named("Message"));
        let mut ctx = materialized(generic, None);
        let response = Writers::default().write_response(&mut ctx, "test", false).unwrap();
        assert_eq!(body_of(response).await, "\"plain\"");
    }

    #[tokio::test]
    async fn test_no_content_has_empty_body() {
        let mut ctx = materialized(HandlerResult::Absent, None);
        let response = Writers::default().write_response(&mut ctx, "test", false).unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_LENGTH).is_none());
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_head_drops_body() {
        let mut ctx = materialized(Entity::new(vec![1_u8, 2, 3]), None);
        let response = Writers::default().write_response(&mut ctx, "test", true).unwrap();
        assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), "3");
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_content_type_ignores_negotiated_type() {
        let existing = Response::ok(Entity::from("x"))
            .with_header(CONTENT_TYPE, "nonsense")
            .unwrap()
            .build_without_header_copy();
        let mut ctx = materialized(existing, Some(MediaType::application_json()));
        let response = Writers::default().write_response(&mut ctx, "test", false).unwrap();
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "nonsense");
        // written as text, not as the negotiated JSON
        assert_eq!(body_of(response).await, "x");
    }

    #[test]
    fn test_unwritable_entity() {
        struct Opaque;
        let mut ctx = materialized(Entity::new(Opaque), None);
        let err = Writers::default().write_response(&mut ctx, "test", false).unwrap_err();
        assert!(matches!(err, Error::NoWriter { .. }));
    }

    #[tokio::test]
    async fn test_registered_writer_takes_precedence() {
        struct Shouting;
        impl EntityWriter for Shouting {
            fn accepts(&self, ty: &TypeDescriptor, _: &Entity, _: Option<&MediaType>) -> bool {
                ty.is::<&'static str>()
            }
            fn write(&self, entity: &Entity, _: Option<&Annotations>) -> Result<Bytes> {
                let s = entity.downcast_ref::<&'static str>().unwrap();
                Ok(Bytes::from(s.to_uppercase()))
            }
        }

        let mut writers = Writers::default();
        writers.register(Box::new(Shouting));
        let mut ctx = materialized(Entity::from("hi"), None);
        let response = writers.write_response(&mut ctx, "test", false).unwrap();
        assert_eq!(body_of(response).await, "HI");
        let mut ctx = materialized(Entity::from("hi"), None);
        assert!(Writers::empty().write_response(&mut ctx, "t", false).is_err());
    }
}
