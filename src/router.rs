//! Per-method trie router.
//!
//! One segment trie per HTTP method plus a flat handler registry. Patterns use
//! `:name` for a single-segment capture and `*name` for a catch-all that
//! swallows the rest of the path. When several children could match a
//! segment, the one registered first is tried first.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::info;

use crate::context::Context;
use crate::handler::{BoxFuture, HandlerFunc};
use crate::trie::{parse_pattern, Node};

/// Registry key: one handler per method and exact pattern string.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RouteKey {
    pub method: Method,
    pub pattern: String,
}

impl RouteKey {
    pub fn new(method: Method, pattern: impl Into<String>) -> Self {
        Self { method, pattern: pattern.into() }
    }
}

/// The application router.
///
/// Build it during setup through [`Engine`](crate::Engine); it is read-only
/// once the server starts.
#[derive(Default)]
pub struct Router {
    roots: HashMap<Method, Node>,
    handlers: HashMap<RouteKey, HandlerFunc>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` + `pattern`.
    ///
    /// Registering the same pair again silently replaces the handler.
    pub fn add_route(&mut self, method: Method, pattern: &str, handler: HandlerFunc) {
        let parts = parse_pattern(pattern);

        self.roots
            .entry(method.clone())
            .or_default()
            .insert(pattern, &parts, 0);
        self.handlers.insert(RouteKey::new(method.clone(), pattern), handler);

        info!(%method, pattern, "route registered");
    }

    /// Resolves `path` to the matching pattern and its captured parameters.
    ///
    /// Returns the stored pattern (not the request path) so callers can look
    /// the handler up by [`RouteKey`].
    pub fn get_route(&self, method: &Method, path: &str) -> Option<(&str, HashMap<String, String>)> {
        let search_parts = parse_pattern(path);
        let root = self.roots.get(method)?;
        let node = root.search(&search_parts, 0)?;

        let mut params = HashMap::new();
        for (index, part) in parse_pattern(node.pattern()).into_iter().enumerate() {
            if let Some(name) = part.strip_prefix(':') {
                params.insert(name.to_owned(), search_parts[index].to_owned());
            }
            if let Some(name) = part.strip_prefix('*') {
                params.insert(name.to_owned(), search_parts[index..].join("/"));
                break;
            }
        }

        Some((node.pattern(), params))
    }

    /// The handler registered for `method` + `pattern`, if any.
    pub fn handler(&self, method: &Method, pattern: &str) -> Option<&HandlerFunc> {
        self.handlers.get(&RouteKey::new(method.clone(), pattern))
    }

    /// Appends the terminal handler for the context's request to its chain
    /// (or the not-found handler) and runs the chain.
    pub(crate) async fn handle(&self, c: &mut Context) {
        let terminal = self
            .get_route(c.method(), c.path())
            .and_then(|(pattern, params)| {
                let handler = self.handler(c.method(), pattern)?;
                Some((handler.clone(), params))
            });

        match terminal {
            Some((handler, params)) => {
                c.params = params;
                c.handlers.push(handler);
            }
            None => c.handlers.push(Arc::new(not_found)),
        }

        c.next().await;
    }
}

fn not_found(c: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        let body = format!("404 NOT FOUND: {}\n", c.path());
        c.string(StatusCode::NOT_FOUND, body);
    })
}
