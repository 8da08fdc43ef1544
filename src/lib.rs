//! # gyre
//!
//! A minimal HTTP toolkit: a segment-trie router, prefix-scoped route groups
//! and an onion middleware chain, with static files and `tera` templates on
//! the side.
//!
//! ## Routing
//!
//! One trie per HTTP method. Patterns are `/`-separated segments:
//!
//! - `/users/list`: literal segments
//! - `/users/:id`: `:id` captures exactly one segment
//! - `/assets/*filepath`: `*filepath` captures everything that follows
//!
//! Where a literal and a capture could both match a segment, the child that
//! was registered first is tried first. Request paths are percent-decoded
//! before they are matched.
//!
//! ## Middleware
//!
//! Handlers and middleware share one shape: `Fn(&mut Context) -> BoxFuture`.
//! A middleware awaits [`Context::next`] to run the rest of the chain and
//! gets control back once the route handler is done.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use gyre::{middleware, Context, Engine, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut engine = Engine::new();
//!     engine.use_middleware(middleware::logger());
//!
//!     engine.get("/hello/:name", |c: &mut Context| Box::pin(async move {
//!         let body = format!("hello {}, you're at {}\n", c.param("name"), c.path());
//!         c.string(StatusCode::OK, body);
//!     }));
//!
//!     let mut v1 = engine.group("/v1");
//!     v1.post("/login", |c: &mut Context| Box::pin(async move {
//!         let user = c.post_form("username");
//!         c.json(StatusCode::OK, &serde_json::json!({ "username": user }));
//!     }));
//!
//!     engine.run("0.0.0.0:9999").await.unwrap();
//! }
//! ```

mod context;
mod engine;
mod error;
mod fs;
mod group;
mod handler;
mod router;
mod server;
mod trie;

pub mod middleware;

pub use context::Context;
pub use engine::Engine;
pub use error::Error;
pub use fs::{static_handler, ContentType};
pub use group::{GroupId, RouterGroup};
pub use handler::{handler_fn, BoxFuture, HandlerFunc};
pub use router::{RouteKey, Router};
pub use server::Server;

pub use http::{Method, StatusCode};
