//! Error types of the dispatch engine.
//!
//! Errors are split by the moment they can happen:
//!
//! - [`RegistrationError`]: raised while routes are registered, fatal at startup
//! - [`BindError`]: raised while binding a request to a handler, answered with a `400`
//! - [`ApiError`]: raised by handler code, converted into a JSON payload at the dispatch boundary
//! - [`TemplateError`]: raised by a [`TemplateEngine`](crate::template::TemplateEngine)

use http::{Method, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;

/// A boxed error which can cross task boundaries
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("request parameter must be the last named parameter in function: {handler}{signature}")]
    InvalidHandlerSignature { handler: String, signature: String },

    #[error("@get or @post not defined in {handler}")]
    MissingRouteMarker { handler: String },

    #[error("route {method} {path} has already been registered")]
    DuplicateRoute { method: Method, path: String },

    #[error("invalid route path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl RegistrationError {
    pub fn invalid_signature<H: ToString, S: ToString>(handler: H, signature: S) -> Self {
        Self::InvalidHandlerSignature { handler: handler.to_string(), signature: signature.to_string() }
    }

    pub fn invalid_path<P: ToString, R: ToString>(path: P, reason: R) -> Self {
        Self::InvalidPath { path: path.to_string(), reason: reason.to_string() }
    }
}

/// A client error detected while building the arguments of a handler.
///
/// The error is cached together with the parsed body, so it must stay cheap to clone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("{}", unsupported_media_type(.0))]
    UnsupportedMediaType(Option<String>),

    #[error("{reason}")]
    MalformedBody { reason: String },

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Invalid path parameter: {name}")]
    InvalidPathParam { name: String },
}

fn unsupported_media_type(content_type: &Option<String>) -> String {
    match content_type {
        Some(content_type) => format!("Unsupported Content-Type: {content_type}"),
        None => "Missing Content-Type.".to_owned(),
    }
}

impl BindError {
    pub fn malformed_body<S: ToString>(str: S) -> Self {
        Self::MalformedBody { reason: str.to_string() }
    }

    /// The status code used to answer the client
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// A business error returned by handler code.
///
/// It never reaches the transport as a failure: the dispatch boundary turns it into
/// `{"error": .., "data": .., "message": ..}` and the payload is answered as JSON.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error}: {message}")]
pub struct ApiError {
    error: String,
    data: String,
    message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, data: impl Into<String>, message: impl Into<String>) -> Self {
        Self { error: error.into(), data: data.into(), message: message.into() }
    }

    /// The input value is invalid, `field` names the offending input
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("value:invalid", field, message)
    }

    /// The requested resource does not exist
    pub fn not_found(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("value:notfound", field, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new("permission:forbidden", "permission", message)
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Converts the error into the structured mapping answered to clients
    pub fn into_payload(self) -> Map<String, Value> {
        let mut map = Map::with_capacity(3);
        map.insert("error".to_owned(), Value::String(self.error));
        map.insert("data".to_owned(), Value::String(self.data));
        map.insert("message".to_owned(), Value::String(self.message));
        map
    }
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("no template engine configured, can't render '{0}'")]
    NotConfigured(String),

    #[error("render template error: {source}")]
    Render {
        #[from]
        source: minijinja::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_messages() {
        assert_eq!(BindError::UnsupportedMediaType(None).to_string(), "Missing Content-Type.");
        assert_eq!(
            BindError::UnsupportedMediaType(Some("text/xml".into())).to_string(),
            "Unsupported Content-Type: text/xml"
        );
        assert_eq!(BindError::MissingArgument("name".into()).to_string(), "Missing argument: name");
        assert_eq!(BindError::malformed_body("JSON body must be object.").to_string(), "JSON body must be object.");
    }

    #[test]
    fn api_error_payload() {
        let payload = ApiError::invalid_value("email", "bad email").into_payload();

        assert_eq!(payload.len(), 3);
        assert_eq!(payload["error"], "value:invalid");
        assert_eq!(payload["data"], "email");
        assert_eq!(payload["message"], "bad email");
    }

    #[test]
    fn registration_error_names_handler() {
        let error = RegistrationError::invalid_signature("index", "(request, id)");
        assert!(error.to_string().contains("index(request, id)"));
    }
}
