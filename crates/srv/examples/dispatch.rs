//! Dispatches a handful of synthetic requests through a service and logs what comes back.
//!
//! Run with `cargo run --example dispatch`.

use bytes::Bytes;
use http::{HeaderName, HeaderValue, Method};
use http_body_util::{BodyExt, Full};
use srv::router::{Entry, compose};
use srv::{HandlerResult, HttpError, Next, Outcome, Rejection, Request, Response, Router, Service, handler_fn, middleware_fn, route};
use std::time::Instant;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

async fn hello(_request: Request) -> Response {
    Response::text("Hello World")
}

async fn greet(request: Request) -> Response {
    let name = request.query().first("name").unwrap_or("stranger");
    Response::text(format!("Hello, {name}!"))
}

async fn user(request: Request) -> Result<Response, Rejection> {
    Ok(Response::json(request.params())?)
}

async fn admin(request: Request) -> Result<Response, HttpError> {
    match request.get("authorization") {
        Some(_) => Ok(Response::text("welcome back")),
        None => Err(HttpError::unauthorized("missing credentials")),
    }
}

async fn broken(_request: Request) -> Result<Response, Rejection> {
    Err(Rejection::other(std::io::Error::other("database unavailable")))
}

async fn response_time(request: Request, next: Next) -> HandlerResult {
    let started = Instant::now();
    let outcome = next.run(request).await?;
    let elapsed = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    Ok(match outcome {
        Outcome::Handled(response) => Outcome::Handled(
            response.derive().header(HeaderName::from_static("x-response-time-us"), HeaderValue::from(elapsed)).finish(),
        ),
        Outcome::Skip => Outcome::Skip,
    })
}

async fn access_log(request: Request, next: Next) -> HandlerResult {
    let method = request.method().clone();
    let url = request.url().to_owned();
    let outcome = next.run(request).await;
    if let Ok(Outcome::Handled(response)) = &outcome {
        info!(%method, url, status = response.status().as_u16(), "handled");
    }
    outcome
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let api = Router::builder()
        .route(route::get("/users/:id", handler_fn(user)).unwrap())
        .route(route::get("/admin", handler_fn(admin)).unwrap())
        .route(route::get("/broken", handler_fn(broken)).unwrap())
        .build();

    let site = Router::builder()
        .route(route::get("/", handler_fn(hello)).unwrap())
        .route(route::get("/greet", handler_fn(greet)).unwrap())
        .router(api)
        .build();

    let composer = compose([Entry::middleware(middleware_fn(access_log)), Entry::middleware(middleware_fn(response_time))]);
    let service = Service::new(composer.apply(site));

    let requests = [
        (Method::GET, "/"),
        (Method::GET, "/greet?name=zava"),
        (Method::GET, "/users/42"),
        (Method::GET, "/admin"),
        (Method::GET, "/broken"),
        (Method::POST, "/"),
    ];

    for (method, uri) in requests {
        let request = http::Request::builder().method(method).uri(uri).body(Full::new(Bytes::new())).unwrap();
        let response = service.handle(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let body = body.collect().await.unwrap().to_bytes();
        info!(uri, status = parts.status.as_u16(), body = ?body, "response");
    }
}
