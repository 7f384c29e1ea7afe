use crate::decorator::Decorator;
use crate::handler::RequestHandler;
use crate::reply::Reply;
use crate::request::RequestContext;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Logs every request before dispatching it
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDecorator;

#[derive(Debug)]
pub struct LoggingHandler<H> {
    handler: H,
}

impl<H: RequestHandler> Decorator<H> for LoggingDecorator {
    type Out = LoggingHandler<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        LoggingHandler { handler: raw }
    }
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for LoggingHandler<H> {
    async fn invoke(&self, req: &Arc<RequestContext>) -> Reply {
        info!(method = %req.method(), path = req.path(), "request");
        self.handler.invoke(req).await
    }
}
