//! Routes: a method, a path template and a handler.
//!
//! A [`Route`] answers only requests whose method and path both match. Everything
//! else is skipped so the next entry of the enclosing [`Router`](crate::Router) can try.

mod params;
mod path;

pub use params::PathParams;
pub use path::{ParamKey, PathTemplate};

use crate::error::PathError;
use crate::handler::{HandlerResult, RequestHandler};
use crate::request::Request;
use crate::response::Outcome;
use http::Method;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Clone)]
pub struct Route {
    method: Option<Method>,
    template: PathTemplate,
    handler: Arc<dyn RequestHandler>,
}

impl Route {
    /// Creates a route. `None` as method matches every method.
    pub fn new<H: RequestHandler + 'static>(method: Option<Method>, path: &str, handler: H) -> Result<Self, PathError> {
        let template = PathTemplate::compile(path)?;
        let route = Self { method, template, handler: Arc::new(handler) };
        debug!(regex = %route.template.regex(), "creating {route}");
        Ok(route)
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn accepts(&self, method: &Method) -> bool {
        self.method.as_ref().is_none_or(|expected| expected == method)
    }

    /// Runs the handler if method and path match, merging the captured parameters into
    /// the ones already on the request. Returns [`Outcome::Skip`] otherwise.
    pub async fn call(&self, request: Request) -> HandlerResult {
        if !self.accepts(request.method()) {
            trace!("{self} skipped, method {} does not match", request.method());
            return Ok(Outcome::Skip);
        }

        let Some(params) = self.template.captures(request.path()) else {
            trace!("{self} skipped, path {} does not match", request.path());
            return Ok(Outcome::Skip);
        };

        debug!("{self} matches {} {}", request.method(), request.url());
        let request = if params.is_empty() {
            request
        } else {
            let merged = request.params().merge(&params);
            request.derive().params(merged).finish()
        };
        self.handler.invoke(request).await
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "[Route {method} {}]", self.template),
            None => write!(f, "[Route * {}]", self.template),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("method", &self.method).field("template", &self.template.as_str()).finish()
    }
}

macro_rules! method_route {
    ($fn_name:ident, $method:ident) => {
        #[doc = concat!("Creates a route answering `", stringify!($method), "` requests on `path`.")]
        pub fn $fn_name<H: RequestHandler + 'static>(path: &str, handler: H) -> Result<Route, PathError> {
            Route::new(Some(Method::$method), path, handler)
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);
method_route!(head, HEAD);
method_route!(options, OPTIONS);
method_route!(connect, CONNECT);
method_route!(patch, PATCH);
method_route!(trace, TRACE);

/// Creates a route answering requests of any method on `path`.
pub fn any<H: RequestHandler + 'static>(path: &str, handler: H) -> Result<Route, PathError> {
    Route::new(None, path, handler)
}

/// Creates a route for an arbitrary method, e.g. an extension method such as `LINK`.
pub fn on<H: RequestHandler + 'static>(method: Method, path: &str, handler: H) -> Result<Route, PathError> {
    Route::new(Some(method), path, handler)
}
