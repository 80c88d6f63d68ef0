//! Converts handler return values into a [`HandlerResult`].
//!
//! Handlers built with [`handler_fn`](crate::handler_fn) may return any [`Responder`]:
//! a [`Response`], an [`Outcome`], or a `Result` of either whose error converts into
//! a [`Rejection`].

use crate::error::Rejection;
use crate::handler::HandlerResult;
use crate::response::{Outcome, Response};

pub trait Responder {
    fn into_result(self) -> HandlerResult;
}

impl Responder for Response {
    fn into_result(self) -> HandlerResult {
        Ok(Outcome::Handled(self))
    }
}

impl Responder for Outcome {
    fn into_result(self) -> HandlerResult {
        Ok(self)
    }
}

/// `None` means the handler declined the request.
impl<T: Responder> Responder for Option<T> {
    fn into_result(self) -> HandlerResult {
        self.map_or(Ok(Outcome::Skip), Responder::into_result)
    }
}

impl<T, E> Responder for Result<T, E>
where
    T: Responder,
    E: Into<Rejection>,
{
    fn into_result(self) -> HandlerResult {
        self.map_err(Into::into).and_then(Responder::into_result)
    }
}
