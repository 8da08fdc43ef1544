//! Handler type and type erasure.
//!
//! # One shape for everything
//!
//! Route handlers and middleware are the same thing: a function that borrows
//! the request [`Context`] mutably and returns a future. Middleware is simply
//! a handler that awaits [`Context::next`] somewhere in its body.
//!
//! ```text
//! |c: &mut Context| Box::pin(async move { … })     ← user writes this
//!        ↓ engine.get("/", handler)
//! Arc::new(handler)                                 ← stored as HandlerFunc
//!        ↓ cloned into Context::handlers once per request
//! handler(&mut ctx)  at request time                ← one vtable dispatch
//!        ↓
//! BoxFuture<'_, ()>                                 ← borrows the context
//! ```
//!
//! The future borrows the context for as long as it runs, so a handler can
//! call `c.next().await` and then keep using `c` afterwards. That is what
//! makes the "before / delegate / after" middleware shape possible.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;

/// A heap-allocated, type-erased future borrowing data for `'a`.
///
/// `Pin<Box<…>>` is required because the runtime polls the future in place.
/// `Send` lets tokio move the request task across worker threads.
pub type BoxFuture<'a, T = ()> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased handler shared by every request that matches it.
///
/// Cloning is one atomic reference-count increment.
pub type HandlerFunc = Arc<dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static>;

/// Pins the higher-ranked handler signature onto a closure.
///
/// Closures passed straight to [`Engine::get`](crate::Engine::get) and friends
/// infer it on their own. Closures bound to a variable or returned from a
/// factory first need to be told that their argument is borrowed for an
/// arbitrary lifetime; this identity function does exactly that.
///
/// ```rust
/// use gyre::{handler_fn, Context, StatusCode};
///
/// let hello = handler_fn(|c: &mut Context| Box::pin(async move {
///     c.string(StatusCode::OK, "hello");
/// }));
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
{
    f
}

pub(crate) fn into_handler_func<F>(f: F) -> HandlerFunc
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
{
    Arc::new(f)
}
