use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use tracing::error;

use crate::context::Context;
use crate::handler::{handler_fn, BoxFuture};

/// Catches panics raised further down the chain and answers `500`.
///
/// Only handlers running inside this middleware's `next()` are covered, so it
/// belongs at the very start of the chain.
pub fn recovery() -> impl for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static {
    handler_fn(|c| {
        Box::pin(async move {
            let outcome = AssertUnwindSafe(c.next()).catch_unwind().await;
            if let Err(panic) = outcome {
                error!(
                    method = %c.method(),
                    path = c.path(),
                    "handler panicked: {}",
                    panic_message(panic.as_ref())
                );
                c.fail(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
            }
        })
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::engine::Engine;

    #[test]
    fn panic_message_payloads() {
        let literal: Box<dyn Any + Send> = Box::new("boom");
        let owned: Box<dyn Any + Send> = Box::new(String::from("index out of range"));
        let other: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(panic_message(literal.as_ref()), "boom");
        assert_eq!(panic_message(owned.as_ref()), "index out of range");
        assert_eq!(panic_message(other.as_ref()), "unknown panic payload");
    }

    #[tokio::test]
    async fn panic_becomes_500() {
        let mut engine = Engine::new();
        engine.use_middleware(recovery());
        engine.get("/panic", |_c: &mut Context| Box::pin(async move {
            let names = vec!["geektutu"];
            let _name = names[100];
        }));

        let req = http::Request::get("/panic").body(Bytes::new()).unwrap();
        let c = engine.handle(req.into()).await;

        assert_eq!(c.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(c.response_body(), br#"{"message":"Internal Server Error"}"#);
    }
}
