//! Raw handler return values.
//!
//! Handlers may return many shapes of value: a finished response, raw bytes, text, a JSON
//! mapping, a status code or a `(status, message)` pair. [`Reply`] captures them without
//! deciding anything about the wire format; the [`Normalizer`](crate::responder::Normalizer)
//! later turns every `Reply` into a response.

use crate::body::ResponseBody;
use crate::error::BindError;
use bytes::Bytes;
use http::{Response, StatusCode};
use serde_json::{Map, Value};

/// The key of a mapping naming the template to render it with
pub const TEMPLATE_KEY: &str = "__template__";

/// The prefix of a text reply asking for a redirect
pub const REDIRECT_PREFIX: &str = "redirect:";

#[derive(Debug)]
pub enum Reply {
    /// a finished response, written as-is
    Response(Response<ResponseBody>),
    /// binary content
    Bytes(Bytes),
    /// html text, or a redirect when prefixed by [`REDIRECT_PREFIX`]
    Text(String),
    /// JSON content, or a template context when it holds [`TEMPLATE_KEY`]
    Map(Map<String, Value>),
    /// a bare status code
    Int(i64),
    /// a status code with a message
    Pair(i64, String),
    /// anything else, answered as its text form
    Other(String),
}

impl Reply {
    /// A mapping rendered with the template `name`, `context` is the template context
    pub fn template(name: impl Into<String>, mut context: Map<String, Value>) -> Self {
        context.insert(TEMPLATE_KEY.to_owned(), Value::String(name.into()));
        Reply::Map(context)
    }

    /// A redirect to `target`
    pub fn redirect(target: impl AsRef<str>) -> Self {
        Reply::Text(format!("{REDIRECT_PREFIX}{}", target.as_ref()))
    }
}

impl<B: Into<ResponseBody>> From<Response<B>> for Reply {
    fn from(response: Response<B>) -> Self {
        Reply::Response(response.map(Into::into))
    }
}

impl From<Bytes> for Reply {
    fn from(bytes: Bytes) -> Self {
        Reply::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(bytes: Vec<u8>) -> Self {
        Reply::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_owned())
    }
}

impl From<Map<String, Value>> for Reply {
    fn from(map: Map<String, Value>) -> Self {
        Reply::Map(map)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Reply::Map(map),
            Value::String(text) => Reply::Text(text),
            Value::Number(n) if n.is_i64() => n.as_i64().map_or_else(|| Reply::Other(n.to_string()), Reply::Int),
            other => Reply::Other(other.to_string()),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Reply {
                fn from(code: $t) -> Self {
                    Reply::Int(i64::from(code))
                }
            }
        )*
    };
}

impl_from_int!(i64, i32, u16);

impl From<StatusCode> for Reply {
    fn from(status: StatusCode) -> Self {
        Reply::Int(i64::from(status.as_u16()))
    }
}

macro_rules! impl_from_pair {
    ($($t:ty),*) => {
        $(
            impl<S: Into<String>> From<($t, S)> for Reply {
                fn from((code, message): ($t, S)) -> Self {
                    Reply::Pair(i64::from(code), message.into())
                }
            }
        )*
    };
}

impl_from_pair!(i64, i32, u16);

impl<S: Into<String>> From<(StatusCode, S)> for Reply {
    fn from((status, message): (StatusCode, S)) -> Self {
        Reply::Pair(i64::from(status.as_u16()), message.into())
    }
}

impl From<f64> for Reply {
    fn from(value: f64) -> Self {
        Reply::Other(value.to_string())
    }
}

impl From<bool> for Reply {
    fn from(value: bool) -> Self {
        Reply::Other(value.to_string())
    }
}

/// A handler with nothing to say answers an empty `200`
impl From<()> for Reply {
    fn from((): ()) -> Self {
        Reply::Response(Response::new(ResponseBody::empty()))
    }
}

impl From<BindError> for Reply {
    fn from(error: BindError) -> Self {
        Reply::Pair(i64::from(error.status().as_u16()), error.to_string())
    }
}
