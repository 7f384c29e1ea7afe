//! Plain async functions as HTTP request handlers.
//!
//! A handler is an async fn taking the bound [`Kwargs`] and returning anything convertible into
//! a [`Reply`]. The crate takes care of the rest:
//!
//! - at registration, the handler's declared [`Param`](signature::Param)s are analyzed once into
//!   a [`BindingPlan`](signature::BindingPlan)
//! - per request, the [argument binder](bind) builds the [`Kwargs`] from path parameters, the
//!   query string, or a JSON/form body, following the plan
//! - the [middleware stages](middleware) wrap the dispatch, and the [`Normalizer`] turns every
//!   reply into a uniform HTTP response
//!
//! # Example
//! ```no_run
//! use micro_coroweb::middleware::standard_stages;
//! use micro_coroweb::signature::Param;
//! use micro_coroweb::{ApiError, Kwargs, Normalizer, Router, Server, handler_fn};
//!
//! async fn get_user(kwargs: Kwargs) -> Result<String, ApiError> {
//!     Ok(format!("hello {}", kwargs.get_str("name").unwrap_or_default()))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::builder()
//!         .add_routes([handler_fn("get_user", get_user).get("/user/{name}").param(Param::positional("name"))])?
//!         .with_global_decorator(standard_stages(Normalizer::new()))
//!         .build()?;
//!
//!     Server::builder().router(router).address("127.0.0.1:9000").build()?.start().await?;
//!     Ok(())
//! }
//! ```

mod body;
mod request;

pub mod bind;
pub mod config;
pub mod decorator;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod reply;
pub mod responder;
pub mod router;
pub mod server;
pub mod signature;
pub mod template;

pub use bind::{Arg, Kwargs};
pub use body::{OptionReqBody, ReqBody, ResponseBody, empty_body, full_body};
pub use config::AppConfig;
pub use error::{ApiError, BindError, RegistrationError, TemplateError};
pub use handler::{FnHandler, Handler, RequestHandler};
pub use reply::Reply;
pub use request::{PathParams, RequestContext};
pub use responder::Normalizer;
pub use router::{Route, Router, RouterBuilder, handler_fn};
pub use server::{Server, ServerBuildError, ServerBuilder};
pub use template::{TemplateEngine, Templates};
