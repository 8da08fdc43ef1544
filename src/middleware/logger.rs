use std::time::Instant;

use tracing::info;

use crate::context::Context;
use crate::handler::{handler_fn, BoxFuture};

/// Logs every request once the rest of the chain has finished.
pub fn logger() -> impl for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static {
    handler_fn(|c| {
        Box::pin(async move {
            let start = Instant::now();
            c.next().await;
            info!(
                status = c.status_code().as_u16(),
                method = %c.method(),
                uri = %c.uri(),
                elapsed = ?start.elapsed(),
                "request completed"
            );
        })
    })
}
