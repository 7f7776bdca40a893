//! Handler result processing module
//!
//! Everything between "the endpoint returned something" and "a later stage
//! reads the response": the result shapes, the per-request context, the lazy
//! response slot and the materializer that fills it.

pub mod context;
pub mod lazy;
pub mod materializer;
pub mod result;

pub use context::RequestContext;
pub use lazy::{BuildContext, LazyResponse};
pub use materializer::{Materializer, StatusPolicy};
pub use result::HandlerResult;
