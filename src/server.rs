//! HTTP listener and graceful shutdown.
//!
//! The server owns nothing but the socket. Every accepted connection runs on
//! its own task; every request on it gets a fresh [`Context`] that is driven
//! through the shared, read-only [`Engine`].
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server:
//! 1. Stops calling `listener.accept()`, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::Context;
use crate::engine::Engine;
use crate::error::Error;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use gyre::Server;
    ///
    /// assert!(Server::bind("0.0.0.0:3000").is_ok());
    /// assert!(Server::bind("not an address").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self { addr: addr.parse()? })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts accepting connections and dispatching them through `engine`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, engine: Engine) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let engine = Arc::new(engine);
        let builder = ConnBuilder::new(TokioExecutor::new());
        let mut connections = JoinSet::new();

        info!(addr = %self.addr, "gyre listening");

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                biased;
                () = &mut shutdown => break,
                Some(_) = connections.join_next(), if !connections.is_empty() => continue,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(serve_connection(builder.clone(), Arc::clone(&engine), stream, peer));
                }
                Err(e) => warn!("accept failed: {e}"),
            }
        }

        info!(in_flight = connections.len(), "shutting down, draining connections");
        while connections.join_next().await.is_some() {}

        info!("gyre stopped");
        Ok(())
    }
}

/// Serves every request of one connection, HTTP/1.1 or HTTP/2.
async fn serve_connection(
    builder: ConnBuilder<TokioExecutor>,
    engine: Arc<Engine>,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let service = service_fn(move |req| dispatch(Arc::clone(&engine), req, peer));
    if let Err(e) = builder.serve_connection(TokioIo::new(stream), service).await {
        error!(%peer, "connection error: {e}");
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Reads the body, builds the context, runs the chain, writes the response.
///
/// Every failure is answered with a status code, so hyper never sees an error.
async fn dispatch(
    engine: Arc<Engine>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            let mut res = http::Response::new(Full::new(Bytes::new()));
            *res.status_mut() = StatusCode::BAD_REQUEST;
            return Ok(res);
        }
    };

    let c = engine.handle(Context::new(parts, body)).await;
    debug!(peer = %remote_addr, status = c.status_code().as_u16(), "response ready");

    Ok(c.into_response())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C.
///
/// If a handler cannot be installed the corresponding arm never fires; the
/// other one still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
