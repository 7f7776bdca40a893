//! HTTP model module
//!
//! Media types, entities and the response representation shared by the
//! materializer and the writer stage.

pub mod entity;
pub mod media;
pub mod response;

// Re-export commonly used types
pub use entity::{Annotations, Entity, GenericEntity, ResponseEntity, TypeDescriptor};
pub use media::MediaType;
pub use response::{
    HttpResponseBuilder, HttpRuntime, Response, ResponseBuilder, ResponseFactory,
    RestResponseBuilder, RestRuntime,
};
