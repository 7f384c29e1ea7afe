use crate::bind::Kwargs;
use crate::error::ApiError;
use crate::handler::{FnHandler, Handler};
use crate::reply::Reply;
use crate::signature::{Param, render_signature};
use http::Method;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A handler waiting for registration, with its route markers and declared parameters
pub struct Route {
    name: String,
    method: Option<Method>,
    path: Option<String>,
    params: Vec<Param>,
    handler: Arc<dyn Handler>,
}

/// Creates a [`Route`] named `name` from an async fn taking the bound [`Kwargs`]
///
/// # Example
/// ```
/// use micro_coroweb::signature::Param;
/// use micro_coroweb::{ApiError, Kwargs, handler_fn};
///
/// async fn get_blog(kwargs: Kwargs) -> Result<String, ApiError> {
///     Ok(format!("blog {}", kwargs.get_str("id").unwrap_or_default()))
/// }
///
/// let route = handler_fn("get_blog", get_blog).get("/blog/{id}").param(Param::positional("id"));
/// assert_eq!(route.path(), Some("/blog/{id}"));
/// ```
pub fn handler_fn<F, Fut, R>(name: impl Into<String>, f: F) -> Route
where
    F: Fn(Kwargs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
    R: Into<Reply> + 'static,
{
    Route::new(name, FnHandler::new(f))
}

impl Route {
    pub fn new(name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self { name: name.into(), method: None, path: None, params: vec![], handler: Arc::new(handler) }
    }

    /// Marks the route as answering `GET path`
    #[must_use]
    pub fn get(self, path: impl Into<String>) -> Self {
        self.method(Method::GET, path)
    }

    /// Marks the route as answering `POST path`
    #[must_use]
    pub fn post(self, path: impl Into<String>) -> Self {
        self.method(Method::POST, path)
    }

    #[must_use]
    pub fn method(mut self, method: Method, path: impl Into<String>) -> Self {
        self.method = Some(method);
        self.path = Some(path.into());
        self
    }

    /// Declares the next handler parameter
    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn route_method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn declared_params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("signature", &render_signature(&self.params))
            .finish_non_exhaustive()
    }
}
