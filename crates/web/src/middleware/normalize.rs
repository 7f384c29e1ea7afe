use crate::decorator::Decorator;
use crate::handler::RequestHandler;
use crate::reply::Reply;
use crate::request::RequestContext;
use crate::responder::Normalizer;
use async_trait::async_trait;
use std::sync::Arc;

/// Normalizes the reply of the inner handler, so outer stages observe the final response
#[derive(Debug, Default, Clone)]
pub struct NormalizeDecorator {
    normalizer: Normalizer,
}

impl NormalizeDecorator {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }
}

#[derive(Debug)]
pub struct NormalizeHandler<H> {
    handler: H,
    normalizer: Normalizer,
}

impl<H: RequestHandler> Decorator<H> for NormalizeDecorator {
    type Out = NormalizeHandler<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        NormalizeHandler { handler: raw, normalizer: self.normalizer.clone() }
    }
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for NormalizeHandler<H> {
    async fn invoke(&self, req: &Arc<RequestContext>) -> Reply {
        let reply = self.handler.invoke(req).await;
        Reply::Response(self.normalizer.normalize(reply))
    }
}
