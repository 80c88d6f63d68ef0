//! Ordered handler stacks.
//!
//! A [`Router`] runs its entries one after another until one of them answers. Routes and
//! nested routers that skip hand the *original* request to the next entry. Middlewares
//! receive a [`Next`] and decide themselves what to pass on, which lets them wrap every
//! entry after them like the layers of an onion:
//!
//! ```text
//! timing ─▶ auth ─▶ [Route GET /users/:id] ─▶ [Route POST /users] ─▶ Skip
//!   ◀────────◀─────────────────┘
//! ```
//!
//! Running past the last entry yields [`Outcome::Skip`], so an enclosing router simply
//! continues with its own next entry.

mod middleware;

pub use middleware::{FnMiddleware, Middleware, middleware_fn};

use crate::handler::{HandlerResult, RequestHandler};
use crate::request::Request;
use crate::response::Outcome;
use crate::route::Route;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::iter;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

static NEXT_ROUTER_ID: AtomicU64 = AtomicU64::new(1);

/// One element of a router stack.
#[derive(Clone)]
pub enum Entry {
    Route(Route),
    Middleware(Arc<dyn Middleware>),
    Router(Router),
}

impl Entry {
    pub fn middleware<M: Middleware + 'static>(middleware: M) -> Self {
        Entry::Middleware(Arc::new(middleware))
    }

    async fn dispatch(&self, request: Request, next: Next) -> HandlerResult {
        match self {
            Entry::Middleware(middleware) => middleware.call(request, next).await,
            Entry::Route(route) => {
                if !route.accepts(request.method()) {
                    trace!("{route} skipped, method {} does not match", request.method());
                    return next.run(request).await;
                }
                let outcome = route.call(request.clone()).await?;
                self.fall_through(outcome, request, next).await
            }
            Entry::Router(router) => {
                let outcome = router.call(request.clone()).await?;
                self.fall_through(outcome, request, next).await
            }
        }
    }

    async fn fall_through(&self, outcome: Outcome, request: Request, next: Next) -> HandlerResult {
        match outcome {
            Outcome::Skip => {
                trace!("{self} returned skip, continuing with the original request");
                next.run(request).await
            }
            handled @ Outcome::Handled(_) => Ok(handled),
        }
    }
}

impl From<Route> for Entry {
    fn from(route: Route) -> Self {
        Entry::Route(route)
    }
}

impl From<Router> for Entry {
    fn from(router: Router) -> Self {
        Entry::Router(router)
    }
}

impl From<Arc<dyn Middleware>> for Entry {
    fn from(middleware: Arc<dyn Middleware>) -> Self {
        Entry::Middleware(middleware)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Route(route) => fmt::Display::fmt(route, f),
            Entry::Middleware(_) => f.write_str("[Middleware]"),
            Entry::Router(router) => fmt::Display::fmt(router, f),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The rest of a router stack, as seen from a middleware.
#[derive(Clone)]
pub struct Next {
    stack: Arc<[Entry]>,
    index: usize,
}

impl Next {
    /// Runs the remaining entries with `request`. Past the last entry this yields [`Outcome::Skip`].
    pub fn run(self, request: Request) -> BoxFuture<'static, HandlerResult> {
        Box::pin(async move {
            let Some(entry) = self.stack.get(self.index) else {
                return Ok(Outcome::Skip);
            };
            let next = Next { stack: Arc::clone(&self.stack), index: self.index + 1 };
            entry.dispatch(request, next).await
        })
    }

    /// How many entries are left.
    pub fn remaining(&self) -> usize {
        self.stack.len().saturating_sub(self.index)
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("remaining", &self.remaining()).finish()
    }
}

/// An ordered, immutable stack of routes, middlewares and nested routers.
#[derive(Clone)]
pub struct Router {
    id: u64,
    stack: Arc<[Entry]>,
}

impl Router {
    pub fn new<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        let stack: Arc<[Entry]> = entries.into_iter().map(Into::into).collect();
        let id = NEXT_ROUTER_ID.fetch_add(1, Ordering::Relaxed);
        debug!("creating [Router #{id}] with {} entries", stack.len());
        Self { id, stack }
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn entries(&self) -> &[Entry] {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Runs the stack from the first entry.
    pub async fn call(&self, request: Request) -> HandlerResult {
        trace!("{self} handling {} {}", request.method(), request.url());
        Next { stack: Arc::clone(&self.stack), index: 0 }.run(request).await
    }
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Router #{}]", self.id)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("id", &self.id).field("stack", &self.stack).finish()
    }
}

#[async_trait]
impl RequestHandler for Router {
    async fn invoke(&self, request: Request) -> HandlerResult {
        self.call(request).await
    }
}

#[async_trait]
impl RequestHandler for Route {
    async fn invoke(&self, request: Request) -> HandlerResult {
        self.call(request).await
    }
}

#[derive(Debug, Default)]
pub struct RouterBuilder {
    entries: Vec<Entry>,
}

impl RouterBuilder {
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.entries.push(Entry::Route(route));
        self
    }

    #[must_use]
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.entries.push(Entry::middleware(middleware));
        self
    }

    #[must_use]
    pub fn router(mut self, router: Router) -> Self {
        self.entries.push(Entry::Router(router));
        self
    }

    #[must_use]
    pub fn entry<E: Into<Entry>>(mut self, entry: E) -> Self {
        self.entries.push(entry.into());
        self
    }

    pub fn build(self) -> Router {
        Router::new(self.entries)
    }
}

/// Pre-binds a list of middlewares so they can be put in front of different targets.
///
/// ```
/// use srv::router::{Entry, compose, middleware_fn};
/// use srv::{Next, Request, Response, handler_fn, route};
///
/// async fn audit(request: Request, next: Next) -> srv::HandlerResult {
///     next.run(request).await
/// }
///
/// async fn hello(_request: Request) -> Response {
///     Response::text("hello")
/// }
///
/// let guarded = compose([Entry::middleware(middleware_fn(audit))]);
/// let router = guarded.apply(route::get("/hello", handler_fn(hello)).unwrap());
/// assert_eq!(router.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Composer {
    middlewares: Vec<Entry>,
}

pub fn compose<I, E>(middlewares: I) -> Composer
where
    I: IntoIterator<Item = E>,
    E: Into<Entry>,
{
    Composer { middlewares: middlewares.into_iter().map(Into::into).collect() }
}

impl Composer {
    /// Builds a router running the composed middlewares, then `target`.
    pub fn apply<E: Into<Entry>>(&self, target: E) -> Router {
        Router::new(self.middlewares.iter().cloned().chain(iter::once(target.into())))
    }
}
