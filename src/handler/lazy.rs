//! Lazy response module
//!
//! A deferred-computation cell over a [`Response`]. The build step runs at
//! most once, on the first [`LazyResponse::get`]; after that the cached
//! response is returned. `get` takes `&mut self`, so one request can only
//! ever have one caller building at a time. Sharing a holder between parallel
//! readers would need a `OnceLock`-style guard instead.

use std::fmt;

use crate::error::{Error, Result};
use crate::http::{MediaType, Response, TypeDescriptor};

/// The request context fields a deferred build step may touch
pub struct BuildContext<'a> {
    /// Written when the build discovers a declared entity type
    pub generic_return_type: &'a mut Option<TypeDescriptor>,
    /// Negotiated content type, read at build time
    pub response_content_type: Option<&'a MediaType>,
}

type BuildStep = Box<dyn FnOnce(&mut BuildContext<'_>) -> Result<Response> + Send>;

enum State {
    Unbuilt(BuildStep),
    Built(Response),
    /// The build step ran and returned an error
    Failed,
}

/// Response slot of a request: built eagerly or on first read
pub struct LazyResponse {
    state: State,
}

impl LazyResponse {
    /// Holder for a response that is already built
    pub const fn existing(response: Response) -> Self {
        Self {
            state: State::Built(response),
        }
    }

    /// Holder that runs `build` on the first `get`
    pub fn deferred<F>(build: F) -> Self
    where
        F: FnOnce(&mut BuildContext<'_>) -> Result<Response> + Send + 'static,
    {
        Self {
            state: State::Unbuilt(Box::new(build)),
        }
    }

    /// Whether the response has been built, without forcing a build
    pub const fn is_built(&self) -> bool {
        matches!(self.state, State::Built(_))
    }

    /// The built response, if any, without forcing a build
    pub const fn peek(&self) -> Option<&Response> {
        match &self.state {
            State::Built(response) => Some(response),
            _ => None,
        }
    }

    /// Build on first call, then return the cached response
    ///
    /// A failing build step surfaces its error here. The holder does not
    /// retry: every later call returns [`Error::BuildFailed`].
    pub fn get(&mut self, cx: &mut BuildContext<'_>) -> Result<&Response> {
        if let State::Unbuilt(_) = self.state {
            // Failed stays in place if the build step returns early with an error
            if let State::Unbuilt(build) = std::mem::replace(&mut self.state, State::Failed) {
                self.state = State::Built(build(cx)?);
            }
        }

        match &self.state {
            State::Built(response) => Ok(response),
            State::Unbuilt(_) | State::Failed => Err(Error::BuildFailed),
        }
    }
}

impl fmt::Debug for LazyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Unbuilt(_) => "unbuilt",
            State::Built(_) => "built",
            State::Failed => "failed",
        };
        f.debug_struct("LazyResponse").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Entity;
    use hyper::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn get(lazy: &mut LazyResponse) -> Result<&Response> {
        let mut generic = None;
        let mut cx = BuildContext {
            generic_return_type: &mut generic,
            response_content_type: None,
        };
        lazy.get(&mut cx)
    }

    #[test]
    fn test_existing_is_built() {
        let mut lazy = LazyResponse::existing(Response::no_content().build_without_header_copy());
        assert!(lazy.is_built());
        assert!(lazy.peek().is_some());
        assert_eq!(get(&mut lazy).unwrap().status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_deferred_builds_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut lazy = LazyResponse::deferred(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Response::ok(Entity::from("hello")).build_without_header_copy())
        });

        assert!(!lazy.is_built());
        assert!(lazy.peek().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let first: *const Response = get(&mut lazy).unwrap();
        let second: *const Response = get(&mut lazy).unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(lazy.is_built());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_step_sees_context() {
        let mut lazy = LazyResponse::deferred(|cx| {
            *cx.generic_return_type = Some(TypeDescriptor::named("List<String>"));
            assert_eq!(cx.response_content_type, Some(&MediaType::text_plain()));
            Ok(Response::no_content().build_without_header_copy())
        });
        let mut generic = None;
        let media = MediaType::text_plain();
        let mut cx = BuildContext {
            generic_return_type: &mut generic,
            response_content_type: Some(&media),
        };
        lazy.get(&mut cx).unwrap();
        assert_eq!(generic, Some(TypeDescriptor::named("List<String>")));
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let mut lazy = LazyResponse::deferred(|_| Err(Error::Handler("boom".to_string())));
        assert!(matches!(get(&mut lazy), Err(Error::Handler(_))));
        assert!(!lazy.is_built());
        assert!(matches!(get(&mut lazy), Err(Error::BuildFailed)));
        assert_eq!(format!("{lazy:?}"), "LazyResponse { state: \"failed\" }");
    }
}
