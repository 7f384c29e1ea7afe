use crate::body::ResponseBody;
use crate::handler::RequestHandler;
use crate::reply::Reply;
use crate::request::RequestContext;
use async_trait::async_trait;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Method, Response, StatusCode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Name of the path parameter holding the file path below the mount prefix
pub const FILEPATH_PARAM: &str = "filepath";

/// Serves the files below a directory, for `GET` and `HEAD` requests
#[derive(Debug, Clone)]
pub struct StaticFiles {
    dir: PathBuf,
}

impl StaticFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolves `filepath` below the directory, fails with the status to answer
    async fn resolve(&self, filepath: &str) -> Result<PathBuf, StatusCode> {
        let root = tokio::fs::canonicalize(&self.dir).await.map_err(|_| StatusCode::NOT_FOUND)?;
        let target = tokio::fs::canonicalize(root.join(filepath.trim_start_matches('/')))
            .await
            .map_err(|_| StatusCode::NOT_FOUND)?;

        if !target.starts_with(&root) {
            warn!(filepath, "static file path escapes the static directory");
            return Err(StatusCode::FORBIDDEN);
        }

        let metadata = tokio::fs::metadata(&target).await.map_err(|_| StatusCode::NOT_FOUND)?;
        if metadata.is_file() { Ok(target) } else { Err(StatusCode::NOT_FOUND) }
    }
}

#[async_trait]
impl RequestHandler for StaticFiles {
    async fn invoke(&self, req: &Arc<RequestContext>) -> Reply {
        let filepath = req.path_params().get(FILEPATH_PARAM).unwrap_or_default();

        let target = match self.resolve(filepath).await {
            Ok(target) => target,
            Err(status) => return Reply::from(status),
        };

        let bytes = match tokio::fs::read(&target).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %target.display(), cause = %e, "read static file error");
                return Reply::from(StatusCode::NOT_FOUND);
            }
        };

        let length = HeaderValue::from(bytes.len());
        let body = if *req.method() == Method::HEAD { ResponseBody::empty() } else { ResponseBody::from(bytes) };

        let mut response = Response::new(body);
        response.headers_mut().insert(CONTENT_TYPE, content_type(&target));
        response.headers_mut().insert(CONTENT_LENGTH, length);
        Reply::Response(response)
    }
}

fn content_type(path: &Path) -> HeaderValue {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).unwrap_or_default();

    let mime = match extension.as_str() {
        "html" | "htm" => mime::TEXT_HTML_UTF_8,
        "css" => mime::TEXT_CSS_UTF_8,
        "js" | "mjs" => mime::APPLICATION_JAVASCRIPT_UTF_8,
        "json" => mime::APPLICATION_JSON,
        "txt" => mime::TEXT_PLAIN_UTF_8,
        "xml" => mime::TEXT_XML,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "bmp" => mime::IMAGE_BMP,
        "svg" => mime::IMAGE_SVG,
        "ico" => return HeaderValue::from_static("image/x-icon"),
        "pdf" => mime::APPLICATION_PDF,
        "woff" => mime::FONT_WOFF,
        "woff2" => mime::FONT_WOFF2,
        _ => mime::APPLICATION_OCTET_STREAM,
    };

    HeaderValue::from_str(mime.as_ref()).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}
