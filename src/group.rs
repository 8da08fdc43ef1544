//! Route groups.
//!
//! A group is a path prefix plus a middleware list. Groups nest: a child's
//! prefix is its parent's prefix followed by its own, and it starts with a
//! copy of the parent's middleware.
//!
//! The engine owns every group in one flat list; a [`RouterGroup`] is a short
//! borrow of the engine pointing at one entry by [`GroupId`].
//!
//! ```rust
//! use gyre::{Engine, Context, StatusCode};
//!
//! let mut engine = Engine::new();
//! let mut v1 = engine.group("/v1");
//! v1.get("/hello/:name", |c: &mut Context| Box::pin(async move {
//!     let body = format!("hello {}", c.param("name"));
//!     c.string(StatusCode::OK, body);
//! }));
//! ```

use http::Method;

use crate::context::Context;
use crate::engine::Engine;
use crate::fs::static_handler;
use crate::handler::{into_handler_func, BoxFuture, HandlerFunc};

/// Index of a group inside its [`Engine`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct GroupId(pub(crate) usize);

impl GroupId {
    /// The engine's implicit root group (empty prefix).
    pub const ROOT: GroupId = GroupId(0);
}

pub(crate) struct GroupData {
    pub(crate) prefix: String,
    pub(crate) middlewares: Vec<HandlerFunc>,
    pub(crate) parent: Option<GroupId>,
}

/// A mutable view of one group, borrowed from the [`Engine`].
pub struct RouterGroup<'e> {
    engine: &'e mut Engine,
    id: GroupId,
}

impl<'e> RouterGroup<'e> {
    pub(crate) fn new(engine: &'e mut Engine, id: GroupId) -> Self {
        Self { engine, id }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Full prefix: every ancestor's prefix followed by this group's own.
    pub fn prefix(&self) -> &str {
        &self.data().prefix
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.data().parent
    }

    /// Creates a nested group.
    ///
    /// The child receives a snapshot of this group's middleware. Middleware
    /// added to this group afterwards does not reach the child.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let data = self.data();
        let child = GroupData {
            prefix: format!("{}{prefix}", data.prefix),
            middlewares: data.middlewares.clone(),
            parent: Some(self.id),
        };
        let id = self.engine.push_group(child);
        RouterGroup::new(&mut *self.engine, id)
    }

    /// Appends middleware to this group only.
    pub fn use_middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
    {
        let middleware = into_handler_func(middleware);
        self.engine.group_data_mut(self.id).middlewares.push(middleware);
        self
    }

    /// Registers `handler` under `prefix + pattern`.
    pub fn add_route<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
    {
        let pattern = format!("{}{pattern}", self.prefix());
        self.engine.router.add_route(method, &pattern, into_handler_func(handler));
        self
    }

    pub fn get<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
    {
        self.add_route(Method::GET, pattern, handler)
    }

    pub fn post<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
    {
        self.add_route(Method::POST, pattern, handler)
    }

    /// Serves files under `root` at `prefix + relative_path/*filepath`.
    pub fn static_files(&mut self, relative_path: &str, root: impl Into<std::path::PathBuf>) -> &mut Self {
        let pattern = format!("{}/*filepath", relative_path.trim_end_matches('/'));
        self.get(&pattern, static_handler(root.into()))
    }

    fn data(&self) -> &GroupData {
        self.engine.group_data(self.id)
    }
}
