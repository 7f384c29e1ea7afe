//! Request handling module that provides access to HTTP request information and path parameters.
//!
//! This module contains the core types for working with HTTP requests in the web framework:
//! - `RequestContext`: Provides access to request headers, path parameters and the request body
//! - `PathParams`: Handles URL path parameters extracted from request paths
//!
//! The body is read at most once. Its parsed form is cached on the context, so the
//! data-preparsing middleware and the argument binder share a single parse.

use crate::bind::payload::{self, BodyData};
use crate::body::{OptionReqBody, ReqBody};
use crate::error::BindError;
use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};
use matchit::Params;
use percent_encoding::percent_decode_str;
use std::fmt;
use tokio::sync::OnceCell;

/// Represents the context of an HTTP request, providing access to the request headers,
/// the path parameters extracted from the URL and the request body.
///
/// A context lives for one request; it is shared behind an `Arc` between the middleware
/// stages, the argument binder and the handler.
pub struct RequestContext {
    parts: Parts,
    path_params: PathParams,
    body: OptionReqBody,
    raw_body: OnceCell<Result<Bytes, BindError>>,
    body_data: OnceCell<Result<BodyData, BindError>>,
}

impl RequestContext {
    /// Creates a new RequestContext with the given request and path parameters
    pub fn new(request: Request<ReqBody>, path_params: PathParams) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            path_params,
            body: OptionReqBody::from(body),
            raw_body: OnceCell::new(),
            body_data: OnceCell::new(),
        }
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the path of the request URI
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Returns the query string of the request URI, if any
    pub fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns the `Content-Type` header, if it is present and readable
    pub fn content_type(&self) -> Option<&str> {
        self.parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
    }

    /// Returns a reference to the path parameters extracted from the request URL
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Reads the whole request body.
    ///
    /// The body is read from the transport once, later calls get the same bytes.
    pub async fn body_bytes(&self) -> Result<Bytes, BindError> {
        self.raw_body.get_or_init(|| self.body.collect_bytes()).await.clone()
    }

    /// Parses the request body according to its content type.
    ///
    /// The outcome, failure included, is cached for the rest of the request.
    pub async fn body_data(&self) -> Result<&BodyData, BindError> {
        let parsed = self
            .body_data
            .get_or_init(|| async {
                let content_type = self.content_type().map(str::to_owned);
                let bytes = self.body_bytes().await?;
                payload::parse(content_type.as_deref(), bytes).await
            })
            .await;

        parsed.as_ref().map_err(Clone::clone)
    }

    /// Returns the parsed body if it has already been parsed successfully
    pub fn parsed_body(&self) -> Option<&BodyData> {
        self.body_data.get().and_then(|parsed| parsed.as_ref().ok())
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", self.method())
            .field("uri", self.uri())
            .field("path_params", &self.path_params)
            .finish_non_exhaustive()
    }
}

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// Path parameters are named segments in the URL path that can be extracted and accessed
/// by name. For example, in the path "/users/{id}", "id" is a path parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { params: Vec::new() }
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.params.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

/// Percent-decodes the values matched against the raw request path.
///
/// A value which doesn't decode to UTF-8 fails with [`BindError::InvalidPathParam`].
impl TryFrom<Params<'_, '_>> for PathParams {
    type Error = BindError;

    fn try_from(params: Params<'_, '_>) -> Result<Self, Self::Error> {
        params
            .iter()
            .map(|(name, value)| match percent_decode_str(value).decode_utf8() {
                Ok(decoded) => Ok((name.to_owned(), decoded.into_owned())),
                Err(_) => Err(BindError::InvalidPathParam { name: name.to_owned() }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|params| Self { params })
    }
}
