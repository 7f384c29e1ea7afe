//! Route registry.
//!
//! Routes are registered on a [`RouterBuilder`], which analyzes each handler's declared
//! parameters once into a [`BindingPlan`](crate::signature::BindingPlan). [`RouterBuilder::build`]
//! decorates every handler with the global decorator and compiles the path patterns into a
//! `matchit` tree.
//!
//! Path patterns use the `matchit` syntax: `/blog/{id}` for a segment parameter and
//! `/static/{*filepath}` for a catch-all tail.

mod route;
mod static_files;

pub use route::{Route, handler_fn};
pub use static_files::{FILEPATH_PARAM, StaticFiles};

use crate::decorator::{Decorator, DecoratorComposer, IdentityDecorator};
use crate::error::{BindError, RegistrationError};
use crate::handler::{DispatchHandler, RequestHandler};
use crate::request::PathParams;
use crate::signature::BindingPlan;
use http::Method;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_STATIC_PREFIX: &str = "/static/";

type InnerRouter = matchit::Router<HashMap<Method, Arc<RouteEntry>>>;

/// A registered route: the decorated handler and, for application handlers, its binding plan
pub struct RouteEntry {
    method: Method,
    path: String,
    name: String,
    plan: Option<Arc<BindingPlan>>,
    handler: Arc<dyn RequestHandler>,
}

impl RouteEntry {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The registered path pattern
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The binding plan, `None` for static mounts
    pub fn plan(&self) -> Option<&Arc<BindingPlan>> {
        self.plan.as_ref()
    }

    pub fn handler(&self) -> &Arc<dyn RequestHandler> {
        &self.handler
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

/// Result of matching a request path
#[derive(Debug)]
pub struct RouteMatch {
    entry: Arc<RouteEntry>,
    params: PathParams,
}

impl RouteMatch {
    pub fn entry(&self) -> &Arc<RouteEntry> {
        &self.entry
    }

    /// Gets the path parameters extracted from the request path
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn into_parts(self) -> (Arc<RouteEntry>, PathParams) {
        (self.entry, self.params)
    }
}

/// Main router structure that resolves requests to route entries
pub struct Router {
    entries: HashMap<(Method, String), Arc<RouteEntry>>,
    inner_router: InnerRouter,
}

impl Router {
    /// Creates a new router builder without global decorator
    pub fn builder() -> RouterBuilder<IdentityDecorator> {
        RouterBuilder::new()
    }

    /// Looks up the entry registered for `method` and the path pattern `path`
    pub fn resolve(&self, method: &Method, path: &str) -> Option<&Arc<RouteEntry>> {
        self.entries.get(&(method.clone(), path.to_owned()))
    }

    /// Matches a request path, `Ok(None)` when no entry matches both the path and the method.
    ///
    /// Path parameters are percent-decoded, a matched path whose parameters don't decode fails.
    pub fn at(&self, method: &Method, path: &str) -> Result<Option<RouteMatch>, BindError> {
        let Ok(matched) = self.inner_router.at(path) else {
            return Ok(None);
        };
        let Some(entry) = matched.value.get(method) else {
            return Ok(None);
        };
        let params = PathParams::try_from(matched.params)?;
        Ok(Some(RouteMatch { entry: Arc::clone(entry), params }))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.entries.values()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("entries", &self.entries.values().collect::<Vec<_>>()).finish()
    }
}

struct PendingRoute {
    method: Method,
    path: String,
    name: String,
    plan: Option<Arc<BindingPlan>>,
    handler: Box<dyn RequestHandler>,
}

pub struct RouterBuilder<D> {
    routes: Vec<PendingRoute>,
    keys: HashSet<(Method, String)>,
    decorator: D,
}

impl<D> fmt::Debug for RouterBuilder<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder").field("routes", &self.routes.len()).finish_non_exhaustive()
    }
}

impl RouterBuilder<IdentityDecorator> {
    fn new() -> Self {
        Self { routes: vec![], keys: HashSet::new(), decorator: IdentityDecorator }
    }
}

impl<D> RouterBuilder<D> {
    /// Registers `route` under its method and path markers.
    ///
    /// The declared parameters are analyzed here, once for the lifetime of the route.
    pub fn register(self, route: Route) -> Result<Self, RegistrationError> {
        let (Some(method), Some(path)) = (route.route_method(), route.path()) else {
            return Err(RegistrationError::MissingRouteMarker { handler: route.name().to_owned() });
        };

        let plan = Arc::new(BindingPlan::analyze(route.name(), route.declared_params())?);
        let handler = DispatchHandler::new(route.name(), Arc::clone(&plan), Arc::clone(route.handler()));

        self.push(method.clone(), path.to_owned(), route.name().to_owned(), Some(plan), Box::new(handler))
    }

    /// Registers every route, failing on the first one which can't be registered
    pub fn add_routes(self, routes: impl IntoIterator<Item = Route>) -> Result<Self, RegistrationError> {
        routes.into_iter().try_fold(self, RouterBuilder::register)
    }

    /// Registers a request handler which bypasses argument binding
    pub fn route(
        self,
        method: Method,
        path: impl Into<String>,
        handler: impl RequestHandler + 'static,
    ) -> Result<Self, RegistrationError> {
        let path = path.into();
        let name = format!("{method} {path}");
        self.push(method, path, name, None, Box::new(handler))
    }

    /// Serves the files below `dir` for `GET` and `HEAD` requests under `prefix`
    pub fn mount_static(self, prefix: &str, dir: impl Into<PathBuf>) -> Result<Self, RegistrationError> {
        if !prefix.starts_with('/') || !prefix.ends_with('/') {
            return Err(RegistrationError::invalid_path(prefix, "static prefix must start and end with '/'"));
        }

        let files = Arc::new(StaticFiles::new(dir));
        info!(prefix, path = %files.dir().display(), "add static");

        let path = format!("{prefix}{{*{FILEPATH_PARAM}}}");
        self.route(Method::GET, path.clone(), Arc::clone(&files))?.route(Method::HEAD, path, files)
    }

    /// Serves the files below `dir` under [`DEFAULT_STATIC_PREFIX`]
    pub fn add_static(self, dir: impl Into<PathBuf>) -> Result<Self, RegistrationError> {
        self.mount_static(DEFAULT_STATIC_PREFIX, dir)
    }

    fn push(
        mut self,
        method: Method,
        path: String,
        name: String,
        plan: Option<Arc<BindingPlan>>,
        handler: Box<dyn RequestHandler>,
    ) -> Result<Self, RegistrationError> {
        if !path.starts_with('/') {
            return Err(RegistrationError::invalid_path(path, "path must start with '/'"));
        }
        if !self.keys.insert((method.clone(), path.clone())) {
            return Err(RegistrationError::DuplicateRoute { method, path });
        }

        info!(%method, path = %path, name = %name, "add route");
        self.routes.push(PendingRoute { method, path, name, plan, handler });
        Ok(self)
    }

    /// Wraps every handler with `decorator`, after the decorators already set
    pub fn with_global_decorator<D2>(self, decorator: D2) -> RouterBuilder<DecoratorComposer<D, D2>>
    where
        D: Decorator<Box<dyn RequestHandler>>,
        D2: Decorator<D::Out>,
    {
        RouterBuilder { routes: self.routes, keys: self.keys, decorator: DecoratorComposer::new(self.decorator, decorator) }
    }

    /// Builds the router from the accumulated routes and decorators
    pub fn build(self) -> Result<Router, RegistrationError>
    where
        D: Decorator<Box<dyn RequestHandler>>,
        <D as Decorator<Box<dyn RequestHandler>>>::Out: RequestHandler + 'static,
    {
        let mut entries = HashMap::with_capacity(self.routes.len());
        let mut by_path: HashMap<String, HashMap<Method, Arc<RouteEntry>>> = HashMap::new();

        for route in self.routes {
            let handler: Arc<dyn RequestHandler> = Arc::new(self.decorator.decorate(route.handler));
            let entry = Arc::new(RouteEntry {
                method: route.method.clone(),
                path: route.path.clone(),
                name: route.name,
                plan: route.plan,
                handler,
            });

            by_path.entry(route.path.clone()).or_default().insert(route.method.clone(), Arc::clone(&entry));
            entries.insert((route.method, route.path), entry);
        }

        let mut inner_router = InnerRouter::new();
        for (path, methods) in by_path {
            inner_router.insert(path.clone(), methods).map_err(|e| RegistrationError::invalid_path(path, e))?;
        }

        Ok(Router { entries, inner_router })
    }
}
