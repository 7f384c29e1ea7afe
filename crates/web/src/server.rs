//! The HTTP/1.1 server.
//!
//! The server owns the [`Router`] and hands every request to the matched route's handler, or to
//! the default handler when nothing matches. Whatever comes back is normalized once more, so a
//! router built without the standard middleware stages still answers proper responses.
//!
//! Connections are served by hyper, one tokio task per connection.

use crate::body::{ReqBody, ResponseBody};
use crate::config::AppConfig;
use crate::error::BoxError;
use crate::handler::RequestHandler;
use crate::reply::Reply;
use crate::request::{PathParams, RequestContext};
use crate::responder::Normalizer;
use crate::router::Router;
use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

pub struct ServerBuilder {
    router: Option<Router>,
    default_handler: Option<Box<dyn RequestHandler>>,
    address: Option<Vec<SocketAddr>>,
    address_error: Option<String>,
    normalizer: Normalizer,
    log_level: Level,
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            router: None,
            default_handler: None,
            address: None,
            address_error: None,
            normalizer: Normalizer::new(),
            log_level: Level::INFO,
        }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        match address.to_socket_addrs() {
            Ok(addrs) => {
                self.address = Some(addrs.collect::<Vec<_>>());
                self.address_error = None;
            }
            Err(e) => self.address_error = Some(e.to_string()),
        }
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// The handler answering requests no route matches, a bare `404` when unset
    pub fn default_handler(mut self, request_handler: impl RequestHandler + 'static) -> Self {
        self.default_handler = Some(Box::new(request_handler));
        self
    }

    pub fn normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Applies the listening address and the log level of `config`
    pub fn config(mut self, config: &AppConfig) -> Self {
        self.log_level = if config.debug { Level::DEBUG } else { Level::INFO };
        match config.socket_addr() {
            Ok(addr) => self.address(addr),
            Err(reason) => {
                self.address_error = Some(reason);
                self
            }
        }
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        if let Some(reason) = self.address_error {
            return Err(ServerBuildError::InvalidAddress(reason));
        }
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        let address = self.address.filter(|address| !address.is_empty()).ok_or(ServerBuildError::MissingAddress)?;

        Ok(Server {
            router,
            default_handler: self.default_handler,
            address,
            normalizer: self.normalizer,
            log_level: self.log_level,
        })
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder").field("address", &self.address).finish_non_exhaustive()
    }
}

pub struct Server {
    router: Router,
    default_handler: Option<Box<dyn RequestHandler>>,
    address: Vec<SocketAddr>,
    normalizer: Normalizer,
    log_level: Level,
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("address must be set")]
    MissingAddress,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn address(&self) -> &[SocketAddr] {
        &self.address
    }

    /// Serves connections until the process ends, fails when the address can't be bound
    pub async fn start(self) -> io::Result<()> {
        let subscriber = FmtSubscriber::builder().with_max_level(self.log_level).finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            debug!("a global subscriber is already installed");
        }

        info!("start listening at {:?}", self.address);
        let tcp_listener = TcpListener::bind(self.address.as_slice()).await.inspect_err(|e| {
            error!(cause = %e, "bind server error");
        })?;

        let server = Arc::new(self);
        loop {
            let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let server = Arc::clone(&server);

            tokio::spawn(async move {
                let io = TokioIo::new(tcp_stream);
                let service = service_fn(move |req: Request<Incoming>| {
                    let server = Arc::clone(&server);
                    async move {
                        let req = req.map(|body| body.map_err(BoxError::from).boxed_unsync());
                        Ok::<_, Infallible>(server.dispatch(req).await)
                    }
                });

                match http1::Builder::new().serve_connection(io, service).await {
                    Ok(()) => {
                        info!("finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!("service has error, cause {}, connection shutdown", e);
                    }
                }
            });
        }
    }

    /// Routes `req` and answers the normalized response, usable without a socket
    pub async fn dispatch(&self, req: Request<ReqBody>) -> Response<ResponseBody> {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let reply = match self.router.at(&method, &path) {
            Ok(Some(route_match)) => {
                let (entry, params) = route_match.into_parts();
                let req = Arc::new(RequestContext::new(req, params));
                entry.handler().invoke(&req).await
            }
            Err(e) => {
                warn!(%method, path = %path, cause = %e, "decode path parameters error");
                Reply::from(e)
            }
            Ok(None) => {
                let req = Arc::new(RequestContext::new(req, PathParams::empty()));
                match &self.default_handler {
                    Some(default_handler) => default_handler.invoke(&req).await,
                    None => {
                        debug!(%method, path = %path, "no route matched");
                        Reply::from(StatusCode::NOT_FOUND)
                    }
                }
            }
        };

        self.normalizer.normalize(reply)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("router", &self.router)
            .field("address", &self.address)
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}
