//! Per-request state and the middleware chain.
//!
//! A [`Context`] is created when a request arrives, handed by `&mut` to every
//! handler in its chain, and turned into an HTTP response once the chain has
//! finished. It is never shared between requests.
//!
//! # The chain
//!
//! The engine assembles `handlers` once per request: every matching group's
//! middleware, then the route handler. A signed cursor starts at `-1`.
//! [`Context::next`] advances it and runs the remaining handlers in a loop.
//! When a handler itself awaits `next()`, the nested loop runs the rest of the
//! chain before the outer handler resumes, so middleware reads like this:
//!
//! ```rust
//! use std::time::Instant;
//! use gyre::{handler_fn, Context};
//!
//! let timing = handler_fn(|c: &mut Context| Box::pin(async move {
//!     let start = Instant::now();     // before the rest of the chain
//!     c.next().await;                 // everything downstream runs here
//!     let _elapsed = start.elapsed(); // after the route handler returned
//! }));
//! # let _ = timing;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri};
use http_body_util::Full;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tera::Tera;
use tracing::{error, warn};

use crate::handler::{BoxFuture, HandlerFunc};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

pub struct Context {
    // request
    method: Method,
    uri: Uri,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    pub(crate) params: HashMap<String, String>,

    // response
    status: StatusCode,
    committed: bool,
    response_headers: HeaderMap,
    response_body: Vec<u8>,

    // chain
    pub(crate) handlers: Vec<HandlerFunc>,
    index: isize,

    pub(crate) templates: Option<Arc<Tera>>,
}

impl Context {
    /// Builds a context from a request head and its fully collected body.
    ///
    /// The path used for routing is percent-decoded once here; [`uri`](Self::uri)
    /// keeps the raw form.
    pub fn new(parts: http::request::Parts, body: Bytes) -> Self {
        let path = decode_path(parts.uri.path());
        Self {
            method: parts.method,
            uri: parts.uri,
            path,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            status: StatusCode::OK,
            committed: false,
            response_headers: HeaderMap::new(),
            response_body: Vec::new(),
            handlers: Vec::new(),
            index: -1,
            templates: None,
        }
    }

    // ── Request ──────────────────────────────────────────────────────────────

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    /// The decoded request path.
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive request header lookup. Non-UTF-8 values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a captured path parameter, or `""` when the route has none by
    /// that name.
    ///
    /// For a route `/users/:id`, `c.param("id")` on `/users/42` returns `"42"`.
    /// For `/assets/*filepath` on `/assets/css/a.css`, `c.param("filepath")`
    /// returns `"css/a.css"`.
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    /// First query-string value for `key`, or `""`.
    pub fn query(&self, key: &str) -> String {
        first_value(self.uri.query().unwrap_or("").as_bytes(), key).unwrap_or_default()
    }

    /// Form value for `key`: an urlencoded request body takes precedence over
    /// the query string. Returns `""` when neither carries the key.
    ///
    /// Only `application/x-www-form-urlencoded` bodies are read. A
    /// `multipart/form-data` body is not parsed, so its fields are invisible
    /// here and the lookup falls through to the query string.
    pub fn post_form(&self, key: &str) -> String {
        let is_form = self
            .header(CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.starts_with(FORM_URLENCODED));
        let has_body = matches!(self.method, Method::POST | Method::PUT | Method::PATCH);

        if is_form && has_body {
            if let Some(value) = first_value(&self.body, key) {
                return value;
            }
        }
        self.query(key)
    }

    // ── Response ─────────────────────────────────────────────────────────────

    /// The response status: whatever was committed, or 200.
    pub fn status_code(&self) -> StatusCode { self.status }

    /// Sets the response status.
    ///
    /// The status line is committed by the first call to this method or by the
    /// first body write. Later calls are ignored.
    pub fn status(&mut self, code: StatusCode) {
        if self.committed {
            warn!(current = %self.status, ignored = %code, path = %self.path, "superfluous status write");
            return;
        }
        self.status = code;
        self.committed = true;
    }

    /// Sets a response header, replacing any previous value. Ignored once the
    /// status line is committed.
    pub fn set_header(&mut self, key: &str, value: &str) {
        if self.committed {
            warn!(header = key, path = %self.path, "header set after response was committed");
            return;
        }
        match (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.response_headers.insert(name, value);
            }
            _ => warn!(header = key, "invalid response header dropped"),
        }
    }

    /// Appends raw bytes to the response body, committing a 200 status if
    /// none was set.
    pub fn write(&mut self, data: &[u8]) {
        self.committed = true;
        self.response_body.extend_from_slice(data);
    }

    /// `text/plain` response.
    pub fn string(&mut self, code: StatusCode, body: impl AsRef<str>) {
        self.set_header(CONTENT_TYPE.as_str(), "text/plain");
        self.status(code);
        self.write(body.as_ref().as_bytes());
    }

    /// `application/json` response. A value that fails to serialise becomes a
    /// plain-text 500.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: StatusCode, obj: &T) {
        match serde_json::to_vec(obj) {
            Ok(bytes) => {
                self.set_header(CONTENT_TYPE.as_str(), "application/json");
                self.status(code);
                self.write(&bytes);
            }
            Err(e) => {
                error!(path = %self.path, "json encoding failed: {e}");
                self.string(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            }
        }
    }

    /// `text/html` response from an already-rendered body.
    pub fn html(&mut self, code: StatusCode, body: impl AsRef<str>) {
        self.set_header(CONTENT_TYPE.as_str(), "text/html");
        self.status(code);
        self.write(body.as_ref().as_bytes());
    }

    /// Renders the template `name` with `data` as a `text/html` response.
    ///
    /// Templates come from [`Engine::load_html_glob`](crate::Engine::load_html_glob)
    /// and [`Engine::add_html_template`](crate::Engine::add_html_template).
    /// `data` must serialise to a map, or to `null` for no variables. When
    /// rendering fails the chain is stopped with [`fail`](Self::fail) and a 500.
    pub fn render<T: Serialize + ?Sized>(&mut self, code: StatusCode, name: &str, data: &T) {
        let Some(templates) = self.templates.clone() else {
            error!(template = name, "no templates loaded");
            self.fail(StatusCode::INTERNAL_SERVER_ERROR, format!("template {name} not found"));
            return;
        };

        let rendered = template_context(data).and_then(|ctx| templates.render(name, &ctx));
        match rendered {
            Ok(body) => self.html(code, body),
            Err(e) => {
                error!(template = name, path = %self.path, "render failed: {e:?}");
                self.fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            }
        }
    }

    /// Raw bytes with a status and whatever headers were set beforehand.
    pub fn data(&mut self, code: StatusCode, data: &[u8]) {
        self.status(code);
        self.write(data);
    }

    pub fn response_headers(&self) -> &HeaderMap { &self.response_headers }
    pub fn response_body(&self) -> &[u8] { &self.response_body }

    /// Consumes the context into the response handed back to hyper.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.response_body)));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.response_headers;
        res
    }

    // ── Chain ────────────────────────────────────────────────────────────────

    /// Runs the rest of the chain.
    ///
    /// Handlers after the current one execute before this future resolves.
    /// A handler that never calls `next()` still lets the outer loop carry on
    /// with the following handler once it returns.
    pub fn next(&mut self) -> BoxFuture<'_> {
        Box::pin(async move {
            self.index += 1;
            while let Some(handler) = self.current() {
                handler(&mut *self).await;
                self.index += 1;
            }
        })
    }

    /// Stops the chain and answers `code` with `{"message": message}`.
    ///
    /// Handlers after the caller do not run. Middleware already waiting in
    /// `next()` still runs its remaining code when control returns to it.
    pub fn fail(&mut self, code: StatusCode, message: impl AsRef<str>) {
        self.index = self.handlers.len() as isize;
        self.json(code, &serde_json::json!({ "message": message.as_ref() }));
    }

    /// True once [`fail`](Self::fail) ran or the chain was exhausted.
    pub fn is_aborted(&self) -> bool {
        self.index >= self.handlers.len() as isize
    }

    fn current(&self) -> Option<HandlerFunc> {
        usize::try_from(self.index)
            .ok()
            .and_then(|i| self.handlers.get(i))
            .cloned()
    }
}

impl From<http::Request<Bytes>> for Context {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body)
    }
}

fn decode_path(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            warn!(path = raw, "path is not utf-8 once decoded, routing on raw form: {e}");
            raw.to_owned()
        }
    }
}

fn template_context<T: Serialize + ?Sized>(data: &T) -> tera::Result<tera::Context> {
    match serde_json::to_value(data) {
        Ok(serde_json::Value::Null) => Ok(tera::Context::new()),
        _ => tera::Context::from_serialize(data),
    }
}

fn first_value(encoded: &[u8], key: &str) -> Option<String> {
    url::form_urlencoded::parse(encoded)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
