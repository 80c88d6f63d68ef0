use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use http::Method;
use http_body_util::Empty;
use srv::route::PathTemplate;
use srv::{HandlerResult, Next, Request, Response, Router, Service, handler_fn, middleware_fn, route};
use std::hint::black_box;

async fn hello(_request: Request) -> Response {
    Response::text("Hello World")
}

async fn user(request: Request) -> Response {
    Response::text(format!("user {}", request.params().get("id").unwrap_or_default()))
}

async fn pass(request: Request, next: Next) -> HandlerResult {
    next.run(request).await
}

fn create_service(extra_routes: usize) -> Service {
    let mut builder = Router::builder().middleware(middleware_fn(pass));
    for i in 0..extra_routes {
        builder = builder.route(route::get(&format!("/static/{i}"), handler_fn(hello)).expect("template should compile"));
    }
    let router = builder
        .route(route::get("/", handler_fn(hello)).expect("template should compile"))
        .route(route::get("/users/:id", handler_fn(user)).expect("template should compile"))
        .build();
    Service::new(router)
}

fn benchmark_dispatch(criterion: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().build().expect("runtime should build");
    let mut group = criterion.benchmark_group("dispatch");

    for routes in [0_usize, 16, 64] {
        let service = create_service(routes);
        group.bench_with_input(BenchmarkId::new("param_route", routes), &service, |b, service| {
            b.to_async(&runtime).iter(|| async {
                let request = http::Request::builder()
                    .method(Method::GET)
                    .uri("/users/42?verbose=1")
                    .body(Empty::<Bytes>::new())
                    .expect("request should build");
                black_box(service.handle(request).await.expect("dispatch should succeed"))
            });
        });
    }

    group.finish();
}

fn benchmark_template_match(criterion: &mut Criterion) {
    let template = PathTemplate::compile("/:primary/test/:secondary/(.+)").expect("template should compile");
    criterion.bench_function("template_captures", |b| {
        b.iter(|| black_box(template.captures(black_box("/foo/test/bar/add/2"))));
    });
}

criterion_group!(dispatch, benchmark_dispatch, benchmark_template_match);
criterion_main!(dispatch);
