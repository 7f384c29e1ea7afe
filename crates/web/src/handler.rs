//! Request handlers.
//!
//! Two handler layers take part in a dispatch:
//!
//! - [`RequestHandler`]: the unit the router stores and the middleware stages decorate, it gets
//!   the whole request and answers a [`Reply`]
//! - [`Handler`]: application code, it gets the bound [`Kwargs`] and may fail with an [`ApiError`]
//!
//! [`DispatchHandler`] bridges both: it binds the arguments following the handler's
//! [`BindingPlan`], calls the handler and turns a domain error into its payload.

use crate::bind::{self, Kwargs};
use crate::error::ApiError;
use crate::reply::Reply;
use crate::request::RequestContext;
use crate::signature::BindingPlan;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: &Arc<RequestContext>) -> Reply;
}

#[async_trait]
impl<T> RequestHandler for Box<T>
where
    T: RequestHandler + ?Sized,
{
    async fn invoke(&self, req: &Arc<RequestContext>) -> Reply {
        (**self).invoke(req).await
    }
}

#[async_trait]
impl<T> RequestHandler for Arc<T>
where
    T: RequestHandler + ?Sized,
{
    async fn invoke(&self, req: &Arc<RequestContext>) -> Reply {
        (**self).invoke(req).await
    }
}

/// Application code called with its bound arguments
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, kwargs: Kwargs) -> Result<Reply, ApiError>;
}

/// an async Fn holder which represents a [`Handler`]
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut, R> Handler for FnHandler<F>
where
    F: Fn(Kwargs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
    R: Into<Reply> + 'static,
{
    async fn call(&self, kwargs: Kwargs) -> Result<Reply, ApiError> {
        (self.f)(kwargs).await.map(Into::into)
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Binds the arguments of a request and calls the handler with them
pub struct DispatchHandler {
    name: String,
    plan: Arc<BindingPlan>,
    handler: Arc<dyn Handler>,
}

impl DispatchHandler {
    pub fn new(name: impl Into<String>, plan: Arc<BindingPlan>, handler: Arc<dyn Handler>) -> Self {
        Self { name: name.into(), plan, handler }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plan(&self) -> &Arc<BindingPlan> {
        &self.plan
    }
}

impl fmt::Debug for DispatchHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchHandler").field("name", &self.name).field("plan", &self.plan).finish_non_exhaustive()
    }
}

#[async_trait]
impl RequestHandler for DispatchHandler {
    async fn invoke(&self, req: &Arc<RequestContext>) -> Reply {
        let kwargs = match bind::bind(&self.plan, req).await {
            Ok(kwargs) => kwargs,
            Err(e) => {
                warn!(handler = %self.name, cause = %e, "bind arguments error");
                return Reply::from(e);
            }
        };

        info!(handler = %self.name, args = ?kwargs.names().collect::<Vec<_>>(), "call with args");

        match self.handler.call(kwargs).await {
            Ok(reply) => reply,
            Err(api_error) => Reply::Map(api_error.into_payload()),
        }
    }
}
