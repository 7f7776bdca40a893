//! Response materialization for a REST runtime.
//!
//! A handler returns a [`HandlerResult`]; the [`Materializer`] turns it into a
//! [`Response`] stored on the per-request [`RequestContext`], either eagerly or
//! behind a [`LazyResponse`] that builds on first access. The `pipeline` and
//! `server` modules wrap that core into a small hyper server.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod pipeline;
pub mod server;

pub use error::{Error, Result};
pub use handler::{HandlerResult, LazyResponse, Materializer, RequestContext, StatusPolicy};
pub use http::{Entity, GenericEntity, MediaType, Response, TypeDescriptor};
