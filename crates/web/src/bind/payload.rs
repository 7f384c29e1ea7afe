//! Request payload parsing: JSON objects, urlencoded forms, multipart forms and query strings.

use crate::error::BindError;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::convert::Infallible;

/// A parsed request body
#[derive(Debug, Clone, PartialEq)]
pub enum BodyData {
    /// an `application/json` body, always a JSON object
    Json(Map<String, Value>),
    /// an `application/x-www-form-urlencoded` or `multipart/form-data` body, in wire order
    Form(Vec<(String, String)>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum MediaKind {
    Json,
    UrlEncoded,
    Multipart,
}

impl MediaKind {
    fn of(content_type: &str) -> Option<Self> {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.starts_with(mime::APPLICATION_JSON.essence_str()) {
            Some(Self::Json)
        } else if content_type.starts_with(mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()) {
            Some(Self::UrlEncoded)
        } else if content_type.starts_with(mime::MULTIPART_FORM_DATA.essence_str()) {
            Some(Self::Multipart)
        } else {
            None
        }
    }
}

/// Whether a body with this content type can be parsed into [`BodyData`]
pub fn is_parsable(content_type: &str) -> bool {
    MediaKind::of(content_type).is_some()
}

/// Parses `bytes` according to `content_type`
pub(crate) async fn parse(content_type: Option<&str>, bytes: Bytes) -> Result<BodyData, BindError> {
    let content_type = content_type.ok_or(BindError::UnsupportedMediaType(None))?;
    let kind =
        MediaKind::of(content_type).ok_or_else(|| BindError::UnsupportedMediaType(Some(essence(content_type))))?;

    match kind {
        MediaKind::Json => parse_json(&bytes).map(BodyData::Json),
        MediaKind::UrlEncoded => parse_urlencoded(&bytes).map(BodyData::Form),
        MediaKind::Multipart => parse_multipart(content_type, bytes).await.map(BodyData::Form),
    }
}

/// The media type without its parameters, lowercased: `text/plain; charset=utf-8` gives `text/plain`
fn essence(content_type: &str) -> String {
    match content_type.parse::<mime::Mime>() {
        Ok(mime) => mime.essence_str().to_ascii_lowercase(),
        Err(_) => content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase(),
    }
}

fn parse_json(bytes: &[u8]) -> Result<Map<String, Value>, BindError> {
    let value = serde_json::from_slice::<Value>(bytes)
        .map_err(|e| BindError::malformed_body(format!("invalid json body: {e}")))?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(BindError::malformed_body("JSON body must be object.")),
    }
}

fn parse_urlencoded(bytes: &[u8]) -> Result<Vec<(String, String)>, BindError> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes)
        .map_err(|e| BindError::malformed_body(format!("invalid form body: {e}")))
}

async fn parse_multipart(content_type: &str, bytes: Bytes) -> Result<Vec<(String, String)>, BindError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| BindError::malformed_body(format!("invalid multipart body: {e}")))?;

    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(bytes) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut fields = vec![];
    while let Some(field) =
        multipart.next_field().await.map_err(|e| BindError::malformed_body(format!("invalid multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let text = field.text().await.map_err(|e| BindError::malformed_body(format!("invalid multipart field: {e}")))?;
        fields.push((name, text));
    }

    Ok(fields)
}

/// Parses a query string, blank values are kept
pub fn parse_query(query: &str) -> Result<Vec<(String, String)>, BindError> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .map_err(|e| BindError::malformed_body(format!("invalid query string: {e}")))
}

/// Drops every repeated key but its first occurrence
pub(crate) fn first_values<'a>(pairs: impl IntoIterator<Item = &'a (String, String)>) -> Vec<(&'a str, &'a str)> {
    let mut values: Vec<(&str, &str)> = vec![];
    for (name, value) in pairs {
        if !values.iter().any(|(seen, _)| *seen == name.as_str()) {
            values.push((name.as_str(), value.as_str()));
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_parse_json_object() {
        let data = parse(Some("application/json; charset=utf-8"), Bytes::from(r#"{"name": "张三", "age": 3}"#))
            .await
            .unwrap();

        let BodyData::Json(map) = data else { panic!("expect json") };
        assert_eq!(map["name"], json!("张三"));
        assert_eq!(map["age"], json!(3));
    }

    #[tokio::test]
    async fn test_parse_json_not_object() {
        for body in ["[1, 2]", "\"text\"", "42", "null"] {
            let error = parse(Some("application/json"), Bytes::from(body)).await.unwrap_err();
            assert_eq!(error, BindError::malformed_body("JSON body must be object."));
        }
    }

    #[tokio::test]
    async fn test_parse_invalid_json() {
        let error = parse(Some("application/json"), Bytes::from("{name")).await.unwrap_err();
        assert!(matches!(error, BindError::MalformedBody { .. }));
    }

    #[tokio::test]
    async fn test_content_type_is_case_insensitive() {
        let data = parse(Some("Application/X-WWW-Form-Urlencoded"), Bytes::from("name=hello&zip=world")).await.unwrap();
        assert_eq!(data, BodyData::Form(vec![("name".into(), "hello".into()), ("zip".into(), "world".into())]));
    }

    #[tokio::test]
    async fn test_unsupported_content_type() {
        let error = parse(Some("text/xml"), Bytes::from("<a/>")).await.unwrap_err();
        assert_eq!(error, BindError::UnsupportedMediaType(Some("text/xml".into())));

        let error = parse(None, Bytes::from("<a/>")).await.unwrap_err();
        assert_eq!(error, BindError::UnsupportedMediaType(None));
    }

    #[tokio::test]
    async fn test_unsupported_content_type_reports_essence() {
        let error = parse(Some("Text/Plain; charset=utf-8"), Bytes::from("hello")).await.unwrap_err();
        assert_eq!(error, BindError::UnsupportedMediaType(Some("text/plain".into())));
        assert_eq!(error.to_string(), "Unsupported Content-Type: text/plain");
    }

    #[tokio::test]
    async fn test_parse_multipart() {
        let body = "--X-BOUNDARY\r\n\
            Content-Disposition: form-data; name=\"name\"\r\n\r\n\
            hello\r\n\
            --X-BOUNDARY\r\n\
            Content-Disposition: form-data; name=\"zip\"\r\n\r\n\
            world\r\n\
            --X-BOUNDARY--\r\n";

        let data = parse(Some("multipart/form-data; boundary=X-BOUNDARY"), Bytes::from(body)).await.unwrap();
        assert_eq!(data, BodyData::Form(vec![("name".into(), "hello".into()), ("zip".into(), "world".into())]));
    }

    #[tokio::test]
    async fn test_multipart_without_boundary() {
        let error = parse(Some("multipart/form-data"), Bytes::from("")).await.unwrap_err();
        assert!(matches!(error, BindError::MalformedBody { .. }));
    }

    #[test]
    fn test_first_values() {
        let pairs = parse_query("name=a&page=1&name=b&flag").unwrap();
        assert_eq!(first_values(&pairs), [("name", "a"), ("page", "1"), ("flag", "")]);
    }

    #[test]
    fn test_is_parsable() {
        assert!(is_parsable("application/json"));
        assert!(is_parsable("multipart/form-data; boundary=abc"));
        assert!(!is_parsable("text/plain"));
    }
}
