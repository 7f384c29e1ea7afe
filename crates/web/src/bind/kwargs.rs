use crate::error::ApiError;
use crate::request::RequestContext;
use crate::signature::REQUEST_ARG;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

/// A bound argument value
#[derive(Debug, Clone)]
pub enum Arg {
    /// a path parameter, a query parameter or a form field
    Text(String),
    /// a member of a JSON body
    Json(Value),
    /// the request object, bound under [`REQUEST_ARG`]
    Request(Arc<RequestContext>),
}

impl Arg {
    /// Returns the text of a `Text` argument or of a JSON string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Text(text) => Some(text.as_str()),
            Arg::Json(Value::String(text)) => Some(text.as_str()),
            Arg::Json(_) | Arg::Request(_) => None,
        }
    }

    /// Converts the argument into a JSON value, the request object has no JSON form
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Arg::Text(text) => Some(Value::String(text.clone())),
            Arg::Json(value) => Some(value.clone()),
            Arg::Request(_) => None,
        }
    }
}

/// The arguments bound for one handler call
#[derive(Debug, Clone, Default)]
pub struct Kwargs {
    args: BTreeMap<String, Arg>,
}

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, arg: Arg) -> Option<Arg> {
        self.args.insert(name.into(), arg)
    }

    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.args.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.args.iter().map(|(name, arg)| (name.as_str(), arg))
    }

    /// Returns the textual value of `name`, see [`Arg::as_str`]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Arg::as_str)
    }

    /// Returns the request object when the handler declared it
    pub fn request(&self) -> Option<&Arc<RequestContext>> {
        match self.args.get(REQUEST_ARG) {
            Some(Arg::Request(req)) => Some(req),
            _ => None,
        }
    }

    /// Parses the textual value of `name`, JSON numbers and booleans are parsed from their text.
    ///
    /// Returns `Ok(None)` when the argument is absent.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, ApiError> {
        let text = match self.get(name) {
            None => return Ok(None),
            Some(Arg::Json(Value::Number(n))) => n.to_string(),
            Some(Arg::Json(Value::Bool(b))) => b.to_string(),
            Some(arg) => arg
                .as_str()
                .ok_or_else(|| ApiError::invalid_value(name, format!("{name} is not a text value")))?
                .to_owned(),
        };

        text.trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::invalid_value(name, format!("invalid value of {name}: {text}")))
    }

    /// Deserializes the value of `name`, text values are seen as JSON strings.
    ///
    /// Returns `Ok(None)` when the argument is absent.
    pub fn deserialize<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ApiError> {
        let Some(arg) = self.get(name) else {
            return Ok(None);
        };
        let value = arg.to_value().ok_or_else(|| ApiError::invalid_value(name, format!("{name} is not a value")))?;

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ApiError::invalid_value(name, format!("invalid value of {name}: {e}")))
    }

    /// Converts the arguments into a JSON object, the request object is left out
    pub fn to_map(&self) -> Map<String, Value> {
        self.args.iter().filter_map(|(name, arg)| arg.to_value().map(|value| (name.clone(), value))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn kwargs() -> Kwargs {
        let mut kwargs = Kwargs::new();
        kwargs.insert("page", Arg::Text(" 2 ".into()));
        kwargs.insert("size", Arg::Json(json!(10)));
        kwargs.insert("name", Arg::Json(json!("hello")));
        kwargs.insert("user", Arg::Json(json!({"name": "hello", "zip": "world"})));
        kwargs
    }

    #[test]
    fn test_get_str() {
        let kwargs = kwargs();

        assert_eq!(kwargs.get_str("page"), Some(" 2 "));
        assert_eq!(kwargs.get_str("name"), Some("hello"));
        assert_eq!(kwargs.get_str("size"), None);
        assert_eq!(kwargs.get_str("absent"), None);
        assert!(kwargs.request().is_none());
    }

    #[test]
    fn test_parse() {
        let kwargs = kwargs();

        assert_eq!(kwargs.parse::<u32>("page").unwrap(), Some(2));
        assert_eq!(kwargs.parse::<u32>("size").unwrap(), Some(10));
        assert_eq!(kwargs.parse::<u32>("absent").unwrap(), None);

        let error = kwargs.parse::<u32>("name").unwrap_err();
        assert_eq!(error.error(), "value:invalid");
        assert_eq!(error.data(), "name");
    }

    #[test]
    fn test_deserialize() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct User {
            name: String,
            zip: String,
        }

        let kwargs = kwargs();
        let user = kwargs.deserialize::<User>("user").unwrap();

        assert_eq!(user, Some(User { name: "hello".into(), zip: "world".into() }));
        assert!(kwargs.deserialize::<User>("name").is_err());
    }

    #[test]
    fn test_to_map() {
        let map = kwargs().to_map();

        assert_eq!(map.len(), 4);
        assert_eq!(map["page"], json!(" 2 "));
        assert_eq!(map["size"], json!(10));
    }
}
