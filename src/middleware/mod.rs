//! Built-in middleware.
//!
//! Middleware is any handler that awaits [`Context::next`](crate::Context::next)
//! to run the rest of the chain, so it can act both before and after the
//! route handler. Register it on the engine or on a group:
//!
//! ```rust,no_run
//! use gyre::{middleware, Engine};
//!
//! let mut engine = Engine::new();
//! engine
//!     .use_middleware(middleware::recovery())
//!     .use_middleware(middleware::logger());
//! ```
//!
//! - [`logger`]: one `info` event per request with status, method, uri and latency
//! - [`recovery`]: turns a panic anywhere downstream into a `500` response;
//!   register it first so it wraps the whole chain

mod logger;
mod recovery;

pub use logger::logger;
pub use recovery::recovery;
