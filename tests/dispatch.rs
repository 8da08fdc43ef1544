use std::sync::{Arc, Mutex};

use bytes::Bytes;
use gyre::{handler_fn, middleware, BoxFuture, Context, Engine, Method, StatusCode};

type Log = Arc<Mutex<Vec<String>>>;

fn get(path: &str) -> Context {
    Context::from(http::Request::get(path).body(Bytes::new()).unwrap())
}

fn body(c: &Context) -> &str {
    std::str::from_utf8(c.response_body()).unwrap()
}

/// Middleware that records `<name>-pre`, runs the chain, records `<name>-post`.
fn around(log: &Log, name: &'static str) -> impl for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static + use<> {
    let log = log.clone();
    handler_fn(move |c| {
        let log = log.clone();
        Box::pin(async move {
            log.lock().unwrap().push(format!("{name}-pre"));
            c.next().await;
            log.lock().unwrap().push(format!("{name}-post"));
        })
    })
}

/// Terminal handler that records `name` and answers with the captured params.
fn echo(log: &Log, name: &'static str) -> impl for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static + use<> {
    let log = log.clone();
    handler_fn(move |c| {
        let log = log.clone();
        Box::pin(async move {
            log.lock().unwrap().push(name.to_owned());
            let mut params: Vec<_> = c.params().iter().map(|(k, v)| format!("{k}={v}")).collect();
            params.sort();
            c.string(StatusCode::OK, params.join("&"));
        })
    })
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn captures_are_substituted() {
    let log = Log::default();
    let mut engine = Engine::new();
    engine
        .get("/", echo(&log, "index"))
        .get("/hello/:name", echo(&log, "hello"))
        .get("/p/:lang/doc", echo(&log, "doc"))
        .get("/assets/*filepath", echo(&log, "assets"));

    let c = engine.handle(get("/hello/geektutu")).await;
    assert_eq!(c.param("name"), "geektutu");
    assert_eq!(body(&c), "name=geektutu");

    let c = engine.handle(get("/p/rust/doc")).await;
    assert_eq!(body(&c), "lang=rust");

    let c = engine.handle(get("/assets/css/geektutu.css")).await;
    assert_eq!(c.param("filepath"), "css/geektutu.css");

    let c = engine.handle(get("/")).await;
    assert_eq!(c.status_code(), StatusCode::OK);
    assert_eq!(body(&c), "");

    assert_eq!(entries(&log), ["hello", "doc", "assets", "index"]);
}

#[tokio::test]
async fn first_registered_child_takes_precedence() {
    let log = Log::default();
    let mut engine = Engine::new();
    engine.get("/a/b", echo(&log, "literal"));
    engine.get("/a/:name", echo(&log, "capture"));

    engine.handle(get("/a/b")).await;
    let c = engine.handle(get("/a/other")).await;

    assert_eq!(entries(&log), ["literal", "capture"]);
    assert_eq!(c.param("name"), "other");
}

#[tokio::test]
async fn catch_all_after_capture() {
    let log = Log::default();
    let mut engine = Engine::new();
    engine.get("/news/:date/*rest", echo(&log, "news"));

    let c = engine.handle(get("/news/2024/x/y")).await;

    assert_eq!(c.param("date"), "2024");
    assert_eq!(c.param("rest"), "x/y");
    assert_eq!(c.param("absent"), "");
}

#[tokio::test]
async fn onion_ordering() {
    let log = Log::default();
    let mut engine = Engine::new();
    engine
        .use_middleware(around(&log, "m1"))
        .use_middleware(around(&log, "m2"))
        .get("/", echo(&log, "handler"));

    engine.handle(get("/")).await;

    assert_eq!(entries(&log), ["m1-pre", "m2-pre", "handler", "m2-post", "m1-post"]);
}

#[tokio::test]
async fn fail_stops_the_chain() {
    let log = Log::default();
    let mut engine = Engine::new();
    engine
        .use_middleware(around(&log, "outer"))
        .use_middleware(|c: &mut Context| Box::pin(async move {
            c.fail(StatusCode::FORBIDDEN, "nope");
        }))
        .use_middleware(around(&log, "after"))
        .get("/secret", echo(&log, "handler"));

    let c = engine.handle(get("/secret")).await;

    assert_eq!(c.status_code(), StatusCode::FORBIDDEN);
    assert!(body(&c).contains("nope"));
    assert_eq!(entries(&log), ["outer-pre", "outer-post"]);

    let res = c.into_response();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.headers()["content-type"], "application/json");
}

#[tokio::test]
async fn unmatched_path_is_404_with_path_in_body() {
    let mut engine = Engine::new();
    engine.get("/does", |c: &mut Context| Box::pin(async move {
        c.string(StatusCode::OK, "exists");
    }));

    let c = engine.handle(get("/does/not/exist")).await;
    assert_eq!(c.status_code(), StatusCode::NOT_FOUND);
    assert!(body(&c).contains("/does/not/exist"));

    // no tree at all for this method
    let req = http::Request::builder()
        .method(Method::DELETE)
        .uri("/does")
        .body(Bytes::new())
        .unwrap();
    let c = engine.handle(req.into()).await;
    assert_eq!(c.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn child_group_snapshots_parent_middleware() {
    let log = Log::default();
    let mut engine = Engine::new();

    let api = engine.group("/api").id();
    engine.at(api).use_middleware(around(&log, "early"));
    let v1 = engine.at(api).group("/v1").id();
    engine.at(api).use_middleware(around(&log, "late"));
    engine.at(v1).get("/ping", echo(&log, "ping"));

    engine.handle(get("/api/v1/ping")).await;

    // `/api` contributes [early, late]; `/api/v1` copied only [early].
    assert_eq!(
        entries(&log),
        [
            "early-pre", "late-pre", "early-pre", "ping",
            "early-post", "late-post", "early-post",
        ]
    );
}

#[tokio::test]
async fn group_middleware_is_scoped_to_prefix() {
    let log = Log::default();
    let mut engine = Engine::new();
    engine.group("/admin").use_middleware(around(&log, "auth"));
    engine.get("/public", echo(&log, "public"));
    engine.get("/admin/panel", echo(&log, "panel"));

    engine.handle(get("/public")).await;
    engine.handle(get("/admin/panel")).await;

    assert_eq!(entries(&log), ["public", "auth-pre", "panel", "auth-post"]);
}

#[tokio::test]
async fn recovery_wraps_logger_and_route() {
    let mut engine = Engine::new();
    engine
        .use_middleware(middleware::recovery())
        .use_middleware(middleware::logger())
        .get("/panic", |_c: &mut Context| Box::pin(async move {
            panic!("boom");
        }))
        .get("/ok", |c: &mut Context| Box::pin(async move {
            c.string(StatusCode::OK, "fine");
        }));

    let c = engine.handle(get("/panic")).await;
    assert_eq!(c.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body(&c).contains("Internal Server Error"));

    let c = engine.handle(get("/ok")).await;
    assert_eq!(c.status_code(), StatusCode::OK);
    assert_eq!(body(&c), "fine");
}

#[tokio::test]
async fn query_and_form_values_reach_handlers() {
    let mut engine = Engine::new();
    engine.post("/login", |c: &mut Context| Box::pin(async move {
        let reply = serde_json::json!({
            "username": c.post_form("username"),
            "password": c.post_form("password"),
            "next": c.query("next"),
        });
        c.json(StatusCode::OK, &reply);
    }));

    let req = http::Request::builder()
        .method(Method::POST)
        .uri("/login?next=%2Fhome")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Bytes::from_static(b"username=geektutu&password=1234"))
        .unwrap();
    let c = engine.handle(req.into()).await;

    let reply: serde_json::Value = serde_json::from_slice(c.response_body()).unwrap();
    assert_eq!(reply["username"], "geektutu");
    assert_eq!(reply["password"], "1234");
    assert_eq!(reply["next"], "/home");
}

#[tokio::test]
async fn encoded_paths_are_decoded_before_routing() {
    let log = Log::default();
    let mut engine = Engine::new();
    engine.get("/hello/:name", echo(&log, "hello"));

    let c = engine.handle(get("/hello/geek%20tutu")).await;
    assert_eq!(c.param("name"), "geek tutu");
    assert_eq!(c.uri().path(), "/hello/geek%20tutu");

    let c = engine.handle(get("/missing%21")).await;
    assert_eq!(body(&c), "404 NOT FOUND: /missing!\n");
}
