//! Response normalization.
//!
//! The [`Normalizer`] is the single place where a handler's [`Reply`] becomes an HTTP response.
//! It is total: every reply produces a response, failures to render a template or to build a
//! redirect are answered with a `500` instead of an error.
//!
//! Precedence, first match wins:
//!
//! 1. a finished response is kept as-is
//! 2. bytes are answered as `application/octet-stream`
//! 3. text starting with `redirect:` is a `302`, other text is html
//! 4. a mapping holding `__template__` is rendered with that template, other mappings are JSON
//! 5. a status code in `[100, 599]` is answered with an empty body
//! 6. a `(status, message)` pair in `[100, 599]` is answered with the message as plain text
//! 7. anything else is answered with its text form

use crate::body::ResponseBody;
use crate::error::TemplateError;
use crate::reply::{REDIRECT_PREFIX, Reply, TEMPLATE_KEY};
use crate::template::TemplateEngine;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderValue, Response, StatusCode};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::error;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_HTML_UTF_8: &str = "text/html;charset=utf-8";
pub const APPLICATION_JSON_UTF_8: &str = "application/json;charset=utf-8";
pub const TEXT_PLAIN_UTF_8: &str = "text/plain;charset=utf-8";

/// Converts handler replies into responses
#[derive(Clone, Default)]
pub struct Normalizer {
    templates: Option<Arc<dyn TemplateEngine>>,
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer").field("templates", &self.templates.is_some()).finish()
    }
}

impl Normalizer {
    /// A normalizer without template engine, template replies are answered with a `500`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: impl TemplateEngine + 'static) -> Self {
        Self::with_template_engine(Arc::new(templates))
    }

    pub fn with_template_engine(templates: Arc<dyn TemplateEngine>) -> Self {
        Self { templates: Some(templates) }
    }

    pub fn normalize(&self, reply: Reply) -> Response<ResponseBody> {
        match reply {
            Reply::Response(response) => response,
            Reply::Bytes(bytes) => build(StatusCode::OK, Some(OCTET_STREAM), ResponseBody::from(bytes)),
            Reply::Text(text) => match text.strip_prefix(REDIRECT_PREFIX) {
                Some(target) => redirect(target),
                None => build(StatusCode::OK, Some(TEXT_HTML_UTF_8), ResponseBody::from(text)),
            },
            Reply::Map(map) => self.normalize_map(map),
            Reply::Int(code) => match status_of(code) {
                Some(status) => build(status, None, ResponseBody::empty()),
                None => plain_text(StatusCode::OK, code.to_string()),
            },
            Reply::Pair(code, message) => match status_of(code) {
                Some(status) => plain_text(status, message),
                None => plain_text(StatusCode::OK, format!("({code}, {message})")),
            },
            Reply::Other(text) => plain_text(StatusCode::OK, text),
        }
    }

    fn normalize_map(&self, mut map: Map<String, Value>) -> Response<ResponseBody> {
        if let Some(Value::String(name)) = map.get(TEMPLATE_KEY) {
            let name = name.clone();
            map.remove(TEMPLATE_KEY);
            return self.render(&name, &map);
        }

        match serde_json::to_string(&map) {
            Ok(json) => build(StatusCode::OK, Some(APPLICATION_JSON_UTF_8), ResponseBody::from(json)),
            Err(e) => {
                error!(cause = %e, "serialize json reply error");
                internal_error()
            }
        }
    }

    fn render(&self, name: &str, context: &Map<String, Value>) -> Response<ResponseBody> {
        let rendered = match &self.templates {
            Some(templates) => templates.render(name, context),
            None => Err(TemplateError::NotConfigured(name.to_owned())),
        };

        match rendered {
            Ok(html) => build(StatusCode::OK, Some(TEXT_HTML_UTF_8), ResponseBody::from(html)),
            Err(e) => {
                error!(template = name, cause = %e, "render template error");
                internal_error()
            }
        }
    }
}

fn status_of(code: i64) -> Option<StatusCode> {
    if !(100..=599).contains(&code) {
        return None;
    }
    u16::try_from(code).ok().and_then(|code| StatusCode::from_u16(code).ok())
}

fn build(status: StatusCode, content_type: Option<&'static str>, body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

fn plain_text(status: StatusCode, text: String) -> Response<ResponseBody> {
    build(status, Some(TEXT_PLAIN_UTF_8), ResponseBody::from(text))
}

fn redirect(target: &str) -> Response<ResponseBody> {
    match HeaderValue::try_from(target) {
        Ok(location) => {
            let mut response = build(StatusCode::FOUND, None, ResponseBody::empty());
            response.headers_mut().insert(LOCATION, location);
            response
        }
        Err(e) => {
            error!(location = target, cause = %e, "invalid redirect target");
            internal_error()
        }
    }
}

fn internal_error() -> Response<ResponseBody> {
    build(StatusCode::INTERNAL_SERVER_ERROR, Some(TEXT_PLAIN_UTF_8), ResponseBody::from("Internal Server Error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::MockTemplateEngine;
    use bytes::Bytes;
    use http_body::Body as HttpBody;
    use mockall::predicate::eq;
    use serde_json::json;

    fn content_type(response: &Response<ResponseBody>) -> Option<&str> {
        response.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok())
    }

    fn body_text(response: &Response<ResponseBody>) -> String {
        response.body().as_bytes().map(|bytes| String::from_utf8_lossy(bytes).into_owned()).unwrap_or_default()
    }

    #[test]
    fn test_response_unchanged() {
        let response = Response::builder().status(StatusCode::ACCEPTED).body(ResponseBody::from("done")).unwrap();
        let normalized = Normalizer::new().normalize(Reply::Response(response));

        assert_eq!(normalized.status(), StatusCode::ACCEPTED);
        assert_eq!(content_type(&normalized), None);
        assert_eq!(body_text(&normalized), "done");
    }

    #[test]
    fn test_bytes_never_stringified() {
        let response = Normalizer::new().normalize(Reply::Bytes(Bytes::from_static(&[0xff, 0x00, 0x7b])));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), Some("application/octet-stream"));
        assert_eq!(response.body().as_bytes().unwrap().as_ref(), [0xff, 0x00, 0x7b]);
    }

    #[test]
    fn test_redirect() {
        let response = Normalizer::new().normalize(Reply::from("redirect:/login"));

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
        assert!(response.body().is_end_stream());
    }

    #[test]
    fn test_invalid_redirect_target() {
        let response = Normalizer::new().normalize(Reply::from("redirect:/a\nb"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_text_is_html() {
        let response = Normalizer::new().normalize(Reply::from("<h1>你好</h1>"));

        assert_eq!(content_type(&response), Some("text/html;charset=utf-8"));
        assert_eq!(body_text(&response), "<h1>你好</h1>");
    }

    #[test]
    fn test_map_is_json_without_ascii_escape() {
        let Reply::Map(map) = Reply::from(json!({"name": "张三"})) else { panic!("expect map") };
        let response = Normalizer::new().normalize(Reply::Map(map));

        assert_eq!(content_type(&response), Some("application/json;charset=utf-8"));
        assert_eq!(body_text(&response), r#"{"name":"张三"}"#);
    }

    #[test]
    fn test_template_rendered_without_marker() {
        let mut engine = MockTemplateEngine::new();
        let mut expected = Map::new();
        expected.insert("title".into(), json!("Hi"));
        engine
            .expect_render()
            .with(eq("index.html"), eq(expected))
            .times(1)
            .returning(|_, context| Ok(format!("<h1>{}</h1>", context["title"].as_str().unwrap_or_default())));

        let Reply::Map(map) = Reply::from(json!({"__template__": "index.html", "title": "Hi"})) else {
            panic!("expect map")
        };
        let response = Normalizer::with_templates(engine).normalize(Reply::Map(map));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), Some("text/html;charset=utf-8"));
        assert_eq!(body_text(&response), "<h1>Hi</h1>");
    }

    #[test]
    fn test_template_failure_is_internal_error() {
        let mut engine = MockTemplateEngine::new();
        engine.expect_render().returning(|name, _| Err(TemplateError::NotConfigured(name.to_owned())));

        let response = Normalizer::with_templates(engine).normalize(Reply::template("missing.html", Map::new()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type(&response), Some("text/plain;charset=utf-8"));

        let response = Normalizer::new().normalize(Reply::template("index.html", Map::new()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_code() {
        let response = Normalizer::new().normalize(Reply::Int(404));

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.body().is_end_stream());
    }

    #[test]
    fn test_status_pair() {
        let response = Normalizer::new().normalize(Reply::from((404, "not found")));

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(content_type(&response), Some("text/plain;charset=utf-8"));
        assert_eq!(body_text(&response), "not found");
    }

    #[test]
    fn test_out_of_range_falls_back_to_text() {
        let normalizer = Normalizer::new();

        let response = normalizer.normalize(Reply::Int(1000));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(&response), "1000");

        let response = normalizer.normalize(Reply::Pair(42, "answer".into()));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(&response), "(42, answer)");

        let response = normalizer.normalize(Reply::from(1.5));
        assert_eq!(content_type(&response), Some("text/plain;charset=utf-8"));
        assert_eq!(body_text(&response), "1.5");
    }
}
