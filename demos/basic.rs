//! Minimal gyre example: groups, middleware, params, templates and static files.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:9999/
//!   curl http://localhost:9999/hello/geek%20tutu
//!   curl http://localhost:9999/assets/css/site.css
//!   curl -X POST http://localhost:9999/v1/login -d 'username=geektutu&password=1234'
//!   curl http://localhost:9999/v2/admin/panel
//!   curl http://localhost:9999/panic

use std::collections::HashMap;

use gyre::{middleware, Context, Engine, StatusCode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut engine = Engine::new();

    // Groups copy their parent's middleware when created, so the groups are
    // set up before the root middleware to keep it from running twice.
    let v1 = engine.group("/v1").id();
    let v2 = engine.group("/v2").id();

    engine.register_filter("format_as_date", format_as_date);
    if let Err(e) = engine.load_html_glob("demos/templates/*") {
        eprintln!("template error: {e}");
        std::process::exit(1);
    }

    engine
        .use_middleware(middleware::recovery())
        .use_middleware(middleware::logger())
        .static_files("/assets", "./static")
        .get("/", index)
        .get("/hello/:name", hello)
        .get("/panic", |_c: &mut Context| Box::pin(async move {
            let names = vec!["geektutu"];
            let _name = names[100];
        }));

    engine.at(v1).post("/login", login);

    engine
        .at(v2)
        .use_middleware(|c: &mut Context| Box::pin(async move {
            if c.header("authorization").is_none() {
                c.fail(StatusCode::UNAUTHORIZED, "missing credentials");
            }
        }))
        .get("/admin/:page", |c: &mut Context| Box::pin(async move {
            let body = format!("admin page {}", c.param("page"));
            c.string(StatusCode::OK, body);
        }));

    if let Err(e) = engine.run("0.0.0.0:9999").await {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}

// {{ now | format_as_date }} with now = { year, month, day }
fn format_as_date(value: &tera::Value, _: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
    let part = |key: &str| value.get(key).and_then(tera::Value::as_u64).unwrap_or(0);
    Ok(format!("{}-{:02}-{:02}", part("year"), part("month"), part("day")).into())
}

// GET /
fn index(c: &mut Context) -> gyre::BoxFuture<'_> {
    Box::pin(async move {
        let data = serde_json::json!({
            "title": "gyre",
            "now": { "year": 2019, "month": 8, "day": 17 },
        });
        c.render(StatusCode::OK, "css.tmpl", &data);
    })
}

// GET /hello/:name?greeting=hi
fn hello(c: &mut Context) -> gyre::BoxFuture<'_> {
    Box::pin(async move {
        let greeting = match c.query("greeting") {
            g if g.is_empty() => "hello".to_owned(),
            g => g,
        };
        let body = format!("{greeting} {}, you're at {}\n", c.param("name"), c.path());
        c.string(StatusCode::OK, body);
    })
}

// POST /v1/login  (urlencoded form)
fn login(c: &mut Context) -> gyre::BoxFuture<'_> {
    Box::pin(async move {
        let reply = serde_json::json!({
            "username": c.post_form("username"),
            "password": c.post_form("password"),
        });
        c.json(StatusCode::OK, &reply);
    })
}
