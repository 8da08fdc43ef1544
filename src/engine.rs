//! The dispatch engine.
//!
//! Per request the engine moves a [`Context`] through four states:
//!
//! ```text
//! Created ──▶ ChainAssembled ──▶ Executing ──▶ Terminal
//!   path/method   group middleware   next() drives   response
//!   captured      + route handler    the chain       recorded
//! ```
//!
//! There is no way back: a context is used for exactly one request.

use std::sync::Arc;

use http::Method;
use tera::Tera;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::Error;
use crate::group::{GroupData, GroupId, RouterGroup};
use crate::handler::{BoxFuture, HandlerFunc};
use crate::router::Router;
use crate::server::Server;

/// The application: router plus every route group, in creation order.
///
/// Configure it during setup, then hand it to [`Engine::run`] (or
/// [`Server::serve`]). After that it is shared read-only between requests.
pub struct Engine {
    pub(crate) router: Router,
    groups: Vec<GroupData>,
    templates: Arc<Tera>,
}

impl Engine {
    pub fn new() -> Self {
        let root = GroupData {
            prefix: String::new(),
            middlewares: Vec::new(),
            parent: None,
        };
        Self {
            router: Router::new(),
            groups: vec![root],
            templates: Arc::new(Tera::default()),
        }
    }

    /// Creates a top-level group under the root.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let mut root = RouterGroup::new(self, GroupId::ROOT);
        let id = root.group(prefix).id();
        RouterGroup::new(self, id)
    }

    /// Reopens a group created earlier.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this engine.
    pub fn at(&mut self, id: GroupId) -> RouterGroup<'_> {
        assert!(id.0 < self.groups.len(), "unknown group {id:?}");
        RouterGroup::new(self, id)
    }

    /// Appends middleware to the root group, which applies to every request.
    pub fn use_middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
    {
        self.at(GroupId::ROOT).use_middleware(middleware);
        self
    }

    pub fn add_route<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
    {
        self.at(GroupId::ROOT).add_route(method, pattern, handler);
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

    /// Serves files under `root` at `relative_path/*filepath`.
    pub fn static_files(&mut self, relative_path: &str, root: impl Into<std::path::PathBuf>) -> &mut Self {
        self.at(GroupId::ROOT).static_files(relative_path, root);
        self
    }

    /// Loads every template matching `glob` (for example `"templates/*"`),
    /// named by its path relative to the glob's base directory.
    ///
    /// Templates already registered under the same name are kept. Filters and
    /// functions registered before or after the call are visible to all of them.
    pub fn load_html_glob(&mut self, glob: &str) -> Result<&mut Self, Error> {
        let loaded = Tera::new(glob)?;
        let count = loaded.get_template_names().count();
        self.templates_mut().extend(&loaded)?;
        info!(glob, count, "templates loaded");
        Ok(self)
    }

    /// Registers one template from source.
    pub fn add_html_template(&mut self, name: &str, source: &str) -> Result<&mut Self, Error> {
        self.templates_mut().add_raw_template(name, source)?;
        Ok(self)
    }

    /// Makes `filter` available to templates as `{{ value | name }}`.
    pub fn register_filter<F: tera::Filter + 'static>(&mut self, name: &str, filter: F) -> &mut Self {
        self.templates_mut().register_filter(name, filter);
        self
    }

    /// Makes `function` available to templates as `{{ name(arg=value) }}`.
    pub fn register_function<F: tera::Function + 'static>(&mut self, name: &str, function: F) -> &mut Self {
        self.templates_mut().register_function(name, function);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Middleware of every group whose prefix starts `path`, concatenated in
    /// group creation order.
    pub fn middlewares_for(&self, path: &str) -> Vec<HandlerFunc> {
        self.groups
            .iter()
            .filter(|group| path.starts_with(&group.prefix))
            .flat_map(|group| group.middlewares.iter().cloned())
            .collect()
    }

    /// Runs one request through its chain and returns the finished context.
    pub async fn handle(&self, mut c: Context) -> Context {
        c.handlers = self.middlewares_for(c.path());
        c.templates = Some(Arc::clone(&self.templates));
        debug!(method = %c.method(), path = c.path(), middlewares = c.handlers.len(), "dispatch");

        self.router.handle(&mut c).await;
        c
    }

    /// Binds `addr` and serves until SIGTERM or Ctrl-C.
    pub async fn run(self, addr: &str) -> Result<(), Error> {
        Server::bind(addr)?.serve(self).await
    }

    pub(crate) fn push_group(&mut self, group: GroupData) -> GroupId {
        self.groups.push(group);
        GroupId(self.groups.len() - 1)
    }

    pub(crate) fn group_data(&self, id: GroupId) -> &GroupData {
        &self.groups[id.0]
    }

    pub(crate) fn group_data_mut(&mut self, id: GroupId) -> &mut GroupData {
        &mut self.groups[id.0]
    }

    // Only reached during setup, before the engine is shared.
    fn templates_mut(&mut self) -> &mut Tera {
        Arc::make_mut(&mut self.templates)
    }
}

impl Default for Engine {
    fn default() -> Self { Self::new() }
}
