//! Argument binding.
//!
//! The binder turns a request into the [`Kwargs`] of a handler, following the handler's
//! [`BindingPlan`]:
//!
//! - a handler without keyword parameters only receives path parameters, nothing is parsed
//! - a `POST` contributes its body (JSON object, urlencoded or multipart form)
//! - a `GET` contributes its query string, the first value of a repeated key wins
//! - unless the handler takes `**kw`, only declared keyword names are kept
//! - path parameters are laid over the result and win on conflicts
//! - the request object is bound under [`REQUEST_ARG`](crate::signature::REQUEST_ARG) on demand
//! - a missing required keyword fails the binding

mod kwargs;
pub mod payload;

pub use kwargs::{Arg, Kwargs};
pub use payload::BodyData;

use crate::error::BindError;
use crate::request::RequestContext;
use crate::signature::{BindingPlan, REQUEST_ARG};
use http::Method;
use std::sync::Arc;
use tracing::warn;

/// Builds the arguments of a handler call, see the [module documentation](self)
pub async fn bind(plan: &BindingPlan, req: &Arc<RequestContext>) -> Result<Kwargs, BindError> {
    let mut kwargs = Kwargs::new();

    if plan.needs_arguments() {
        if let Some(args) = request_arguments(req).await? {
            for (name, arg) in args {
                if plan.accepts_var_keywords() || plan.named_keywords().iter().any(|named| *named == name) {
                    kwargs.insert(name, arg);
                }
            }
        }
    }

    for (name, value) in req.path_params().iter() {
        if kwargs.insert(name, Arg::Text(value.to_owned())).is_some() {
            warn!(name, "duplicate arg name in named arg and kw args, path parameter wins");
        }
    }

    if plan.accepts_request() {
        kwargs.insert(REQUEST_ARG, Arg::Request(Arc::clone(req)));
    }

    if let Some(missing) = plan.required_keywords().iter().find(|name| !kwargs.contains(name)) {
        return Err(BindError::MissingArgument(missing.clone()));
    }

    Ok(kwargs)
}

/// Collects the arguments carried by the body of a `POST` or the query string of a `GET`
async fn request_arguments(req: &RequestContext) -> Result<Option<Vec<(String, Arg)>>, BindError> {
    match *req.method() {
        Method::POST => {
            let args = match req.body_data().await? {
                BodyData::Json(map) => map.iter().map(|(name, value)| (name.clone(), Arg::Json(value.clone()))).collect(),
                BodyData::Form(fields) => text_args(payload::first_values(fields)),
            };
            Ok(Some(args))
        }
        Method::GET => match req.query() {
            Some(query) if !query.is_empty() => {
                let pairs = payload::parse_query(query)?;
                Ok(Some(text_args(payload::first_values(&pairs))))
            }
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

fn text_args(pairs: Vec<(&str, &str)>) -> Vec<(String, Arg)> {
    pairs.into_iter().map(|(name, value)| (name.to_owned(), Arg::Text(value.to_owned()))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::full_body;
    use crate::request::PathParams;
    use crate::signature::Param;
    use http::Request;
    use serde_json::json;

    fn plan(params: &[Param]) -> BindingPlan {
        BindingPlan::analyze("handler", params).unwrap()
    }

    fn get(uri: &str, path_params: &[(&str, &str)]) -> Arc<RequestContext> {
        let req = Request::builder().method(Method::GET).uri(uri).body(full_body("")).unwrap();
        Arc::new(RequestContext::new(req, path_params.iter().copied().collect()))
    }

    fn post(content_type: Option<&str>, body: &'static str, path_params: &[(&str, &str)]) -> Arc<RequestContext> {
        let mut builder = Request::builder().method(Method::POST).uri("/api/blogs");
        if let Some(content_type) = content_type {
            builder = builder.header(http::header::CONTENT_TYPE, content_type);
        }
        Arc::new(RequestContext::new(builder.body(full_body(body)).unwrap(), path_params.iter().copied().collect()))
    }

    #[tokio::test]
    async fn test_no_keyword_params_skips_parsing() {
        let plan = plan(&[Param::positional("id")]);
        let req = post(Some("application/json"), "[1, 2, 3]", &[("id", "7")]);

        let kwargs = bind(&plan, &req).await.unwrap();

        assert_eq!(kwargs.len(), 1);
        assert_eq!(kwargs.get_str("id"), Some("7"));
        assert!(req.parsed_body().is_none());
        assert!(req.body_bytes().await.is_ok(), "the body must not be consumed");
    }

    #[tokio::test]
    async fn test_no_keyword_params_ignores_missing_content_type() {
        let plan = plan(&[]);
        let req = post(None, "anything", &[]);

        assert!(bind(&plan, &req).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_json_filters_unknown_names() {
        let plan = plan(&[Param::keyword("name"), Param::keyword("email")]);
        let req = post(Some("application/json"), r#"{"name": "hello", "email": "a@b.c", "admin": true}"#, &[]);

        let kwargs = bind(&plan, &req).await.unwrap();

        assert_eq!(kwargs.names().collect::<Vec<_>>(), ["email", "name"]);
        assert!(matches!(kwargs.get("name"), Some(Arg::Json(value)) if *value == json!("hello")));
    }

    #[tokio::test]
    async fn test_post_json_var_keywords_keeps_everything() {
        let plan = plan(&[Param::var_keywords("kw")]);
        let req = post(Some("application/json"), r#"{"name": "hello", "admin": true}"#, &[]);

        let kwargs = bind(&plan, &req).await.unwrap();

        assert_eq!(kwargs.len(), 2);
        assert!(matches!(kwargs.get("admin"), Some(Arg::Json(value)) if *value == json!(true)));
    }

    #[tokio::test]
    async fn test_post_json_not_object() {
        let plan = plan(&[Param::keyword("name")]);
        let req = post(Some("application/json"), "[1, 2, 3]", &[]);

        let error = bind(&plan, &req).await.unwrap_err();
        assert_eq!(error, BindError::malformed_body("JSON body must be object."));
    }

    #[tokio::test]
    async fn test_post_without_content_type() {
        let plan = plan(&[Param::keyword("name")]);
        let req = post(None, "name=hello", &[]);

        assert_eq!(bind(&plan, &req).await.unwrap_err(), BindError::UnsupportedMediaType(None));
    }

    #[tokio::test]
    async fn test_post_unsupported_content_type() {
        let plan = plan(&[Param::keyword("name")]);
        let req = post(Some("text/plain"), "name=hello", &[]);

        assert_eq!(bind(&plan, &req).await.unwrap_err(), BindError::UnsupportedMediaType(Some("text/plain".into())));
    }

    #[tokio::test]
    async fn test_post_form() {
        let plan = plan(&[Param::keyword("name"), Param::keyword("zip").with_default()]);
        let req = post(Some("application/x-www-form-urlencoded"), "name=hello&name=again&c=abc", &[]);

        let kwargs = bind(&plan, &req).await.unwrap();

        assert_eq!(kwargs.len(), 1);
        assert!(matches!(kwargs.get("name"), Some(Arg::Text(text)) if text == "hello"));
    }

    #[tokio::test]
    async fn test_get_query_first_value_wins() {
        let plan = plan(&[Param::keyword("page").with_default(), Param::keyword("tag").with_default()]);
        let req = get("/api/blogs?page=2&page=3&tag=&other=1", &[]);

        let kwargs = bind(&plan, &req).await.unwrap();

        assert_eq!(kwargs.len(), 2);
        assert_eq!(kwargs.get_str("page"), Some("2"));
        assert_eq!(kwargs.get_str("tag"), Some(""));
    }

    #[tokio::test]
    async fn test_get_without_query() {
        let plan = plan(&[Param::keyword("page").with_default()]);
        let req = get("/api/blogs", &[("id", "1")]);

        let kwargs = bind(&plan, &req).await.unwrap();

        assert_eq!(kwargs.names().collect::<Vec<_>>(), ["id"]);
    }

    #[tokio::test]
    async fn test_path_params_override_body() {
        let plan = plan(&[Param::positional("id"), Param::keyword("id2").with_default(), Param::var_keywords("kw")]);
        let req = post(Some("application/json"), r#"{"id": "from-body", "title": "t"}"#, &[("id", "from-path")]);

        let kwargs = bind(&plan, &req).await.unwrap();

        assert!(matches!(kwargs.get("id"), Some(Arg::Text(text)) if text == "from-path"));
        assert_eq!(kwargs.get_str("title"), Some("t"));
    }

    #[tokio::test]
    async fn test_path_params_override_query() {
        let plan = plan(&[Param::keyword("id").with_default()]);
        let req = get("/blog/1?id=2", &[("id", "1")]);

        assert_eq!(bind(&plan, &req).await.unwrap().get_str("id"), Some("1"));
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let plan = plan(&[Param::keyword("name"), Param::keyword("page").with_default()]);
        let req = post(Some("application/json"), r#"{"page": 1}"#, &[("id", "1")]);

        assert_eq!(bind(&plan, &req).await.unwrap_err(), BindError::MissingArgument("name".into()));
    }

    #[tokio::test]
    async fn test_required_argument_from_path() {
        let plan = plan(&[Param::keyword("name")]);
        let req = get("/user/hello", &[("name", "hello")]);

        assert_eq!(bind(&plan, &req).await.unwrap().get_str("name"), Some("hello"));
    }

    #[tokio::test]
    async fn test_request_injected() {
        let plan = plan(&[Param::request(), Param::keyword("page").with_default()]);
        let req = get("/manage/blogs?page=1", &[]);

        let kwargs = bind(&plan, &req).await.unwrap();
        let injected = kwargs.request().unwrap();

        assert!(Arc::ptr_eq(injected, &req));
        assert_eq!(kwargs.get_str("page"), Some("1"));
    }

    #[tokio::test]
    async fn test_other_methods_bind_path_only() {
        let plan = plan(&[Param::keyword("name").with_default()]);
        let req = Request::builder().method(Method::PUT).uri("/user/1?name=x").body(full_body("{}")).unwrap();
        let req = Arc::new(RequestContext::new(req, PathParams::empty()));

        assert!(bind(&plan, &req).await.unwrap().is_empty());
    }
}
