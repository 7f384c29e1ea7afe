use crate::bind::payload;
use crate::decorator::Decorator;
use crate::handler::RequestHandler;
use crate::reply::Reply;
use crate::request::RequestContext;
use async_trait::async_trait;
use http::Method;
use std::sync::Arc;
use tracing::{debug, warn};

/// Parses the body of `POST` requests ahead of dispatch.
///
/// The outcome lands in the request-scoped cache, a failure is left there for the argument
/// binder to report.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreparseDecorator;

#[derive(Debug)]
pub struct PreparseHandler<H> {
    handler: H,
}

impl<H: RequestHandler> Decorator<H> for PreparseDecorator {
    type Out = PreparseHandler<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        PreparseHandler { handler: raw }
    }
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for PreparseHandler<H> {
    async fn invoke(&self, req: &Arc<RequestContext>) -> Reply {
        if *req.method() == Method::POST && req.content_type().is_some_and(payload::is_parsable) {
            match req.body_data().await {
                Ok(data) => debug!(?data, "request data"),
                Err(e) => warn!(cause = %e, "parse request data error"),
            }
        }

        self.handler.invoke(req).await
    }
}
