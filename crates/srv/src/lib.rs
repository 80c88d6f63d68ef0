//! A small HTTP request-handling core: immutable request and response values, routes with
//! path templates, routers with onion-style middlewares, and an error boundary.
//!
//! The crate does not own sockets. A transport hands every `http::Request` to
//! [`Service::handle`] and writes back the `http::Response` it gets.
//!
//! ```
//! use srv::{Request, Response, Router, Service, handler_fn, route};
//!
//! async fn user(request: Request) -> Response {
//!     Response::text(format!("user {}", request.params().get("id").unwrap_or_default()))
//! }
//!
//! let router = Router::builder().route(route::get("/users/:id", handler_fn(user)).unwrap()).build();
//! let service = Service::new(router);
//! # let _ = service;
//! ```

mod body;
mod error;
mod handler;
mod query;
mod request;
mod responder;
mod response;
mod service;

pub mod middleware;
pub mod route;
pub mod router;
pub mod status;

pub use body::{BoxBody, ResponseBody, SharedBody};
pub use error::{ApplyError, ArgumentError, BodyError, BoxError, HttpError, PathError, Rejection, ResponseDefect};
pub use handler::{FnHandler, HandlerResult, RequestHandler, handler_fn};
pub use query::{Query, QueryValue};
pub use request::{ConnectionInfo, DeriveRequest, Request};
pub use responder::Responder;
pub use response::{Body, DeriveResponse, Outcome, Response, ResponseInit};
pub use route::{PathParams, Route};
pub use router::{Entry, Middleware, Next, Router, compose, middleware_fn};
pub use service::{Service, ServiceBuilder, ServiceError};
