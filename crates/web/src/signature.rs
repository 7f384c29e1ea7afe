//! Handler contract analysis.
//!
//! Every handler declares its parameters explicitly with [`Param`] values. At registration the
//! declarations are analyzed once into a [`BindingPlan`], which the argument binder reuses for
//! every request routed to the handler.
//!
//! # Example
//! ```
//! use micro_coroweb::signature::{BindingPlan, Param};
//!
//! let params = [Param::positional("id"), Param::request(), Param::keyword("page").with_default()];
//! let plan = BindingPlan::analyze("get_blog", &params).unwrap();
//!
//! assert!(plan.accepts_request());
//! assert!(plan.named_keywords().contains(&"page".to_owned()));
//! assert!(plan.required_keywords().is_empty());
//! ```

use crate::error::RegistrationError;
use std::collections::BTreeSet;
use std::fmt;

/// Name under which the request object is injected into the bound arguments
pub const REQUEST_ARG: &str = "request";

/// How a parameter receives its value
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// a plain parameter, filled from path parameters
    Positional,
    /// a named parameter, filled from the query string or the body
    KeywordOnly,
    /// an open-ended list of positional values (`*args`)
    VarPositional,
    /// an open-ended set of named values (`**kw`)
    VarKeyword,
}

/// A declared handler parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    name: String,
    kind: ParamKind,
    has_default: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self { name: name.into(), kind, has_default: false }
    }

    pub fn positional(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Positional)
    }

    /// A keyword-only parameter, required unless [`Param::with_default`] is applied
    pub fn keyword(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::KeywordOnly)
    }

    pub fn var_args(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::VarPositional)
    }

    pub fn var_keywords(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::VarKeyword)
    }

    /// The raw request object, see [`REQUEST_ARG`]
    pub fn request() -> Self {
        Self::positional(REQUEST_ARG)
    }

    /// Marks the parameter as having a default value
    #[must_use]
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParamKind::VarPositional => write!(f, "*{}", self.name)?,
            ParamKind::VarKeyword => write!(f, "**{}", self.name)?,
            ParamKind::Positional | ParamKind::KeywordOnly => f.write_str(&self.name)?,
        }
        if self.has_default {
            f.write_str("=...")?;
        }
        Ok(())
    }
}

/// Renders a parameter list the way it was declared, keyword-only parameters after a `*`
pub(crate) fn render_signature(params: &[Param]) -> String {
    let mut parts = Vec::with_capacity(params.len() + 1);
    let mut star_written = false;
    for param in params {
        match param.kind {
            ParamKind::VarPositional => star_written = true,
            ParamKind::KeywordOnly if !star_written => {
                parts.push("*".to_owned());
                star_written = true;
            }
            _ => {}
        }
        parts.push(param.to_string());
    }
    format!("({})", parts.join(", "))
}

/// What a handler needs from a request, computed once at registration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingPlan {
    accepts_request: bool,
    accepts_var_keywords: bool,
    named_keywords: Vec<String>,
    required_keywords: BTreeSet<String>,
}

impl BindingPlan {
    /// Analyzes the declared parameters of the handler called `handler`.
    ///
    /// Fails when a positional parameter follows `request`, or a name is declared twice.
    pub fn analyze(handler: &str, params: &[Param]) -> Result<Self, RegistrationError> {
        let mut plan = BindingPlan::default();
        let mut seen = BTreeSet::new();

        for param in params {
            if !seen.insert(param.name.as_str()) {
                return Err(RegistrationError::invalid_signature(handler, render_signature(params)));
            }

            if param.name == REQUEST_ARG {
                plan.accepts_request = true;
            } else if plan.accepts_request && param.kind == ParamKind::Positional {
                return Err(RegistrationError::invalid_signature(handler, render_signature(params)));
            }

            match param.kind {
                ParamKind::KeywordOnly => {
                    plan.named_keywords.push(param.name.clone());
                    if !param.has_default {
                        plan.required_keywords.insert(param.name.clone());
                    }
                }
                ParamKind::VarKeyword => plan.accepts_var_keywords = true,
                ParamKind::Positional | ParamKind::VarPositional => {}
            }
        }

        Ok(plan)
    }

    /// The handler wants the request object under [`REQUEST_ARG`]
    #[inline]
    pub fn accepts_request(&self) -> bool {
        self.accepts_request
    }

    /// The handler takes any keyword argument (`**kw`)
    #[inline]
    pub fn accepts_var_keywords(&self) -> bool {
        self.accepts_var_keywords
    }

    /// Keyword-only parameter names, in declaration order
    #[inline]
    pub fn named_keywords(&self) -> &[String] {
        &self.named_keywords
    }

    /// Keyword-only parameters without a default
    #[inline]
    pub fn required_keywords(&self) -> &BTreeSet<String> {
        &self.required_keywords
    }

    /// Whether the query string or the body may contribute arguments
    #[inline]
    pub fn needs_arguments(&self) -> bool {
        self.accepts_var_keywords || !self.named_keywords.is_empty() || !self.required_keywords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_signature() {
        let plan = BindingPlan::analyze("index", &[]).unwrap();

        assert!(!plan.accepts_request());
        assert!(!plan.accepts_var_keywords());
        assert!(!plan.needs_arguments());
    }

    #[test]
    fn test_keyword_params() {
        let params = [Param::keyword("name"), Param::keyword("page").with_default(), Param::keyword("email")];
        let plan = BindingPlan::analyze("api_register", &params).unwrap();

        assert_eq!(plan.named_keywords(), ["name", "page", "email"]);
        assert_eq!(plan.required_keywords().iter().collect::<Vec<_>>(), ["email", "name"]);
        assert!(plan.needs_arguments());
    }

    #[test]
    fn test_var_keywords() {
        let plan = BindingPlan::analyze("api", &[Param::var_keywords("kw")]).unwrap();

        assert!(plan.accepts_var_keywords());
        assert!(plan.named_keywords().is_empty());
        assert!(plan.needs_arguments());
    }

    #[test]
    fn test_request_may_be_followed_by_keywords() {
        let params = [
            Param::positional("id"),
            Param::request(),
            Param::var_args("args"),
            Param::keyword("page").with_default(),
            Param::var_keywords("kw"),
        ];
        let plan = BindingPlan::analyze("get_blog", &params).unwrap();

        assert!(plan.accepts_request());
        assert!(plan.accepts_var_keywords());
        assert!(plan.required_keywords().is_empty());
    }

    #[test]
    fn test_positional_after_request() {
        let params = [Param::request(), Param::positional("id")];
        let error = BindingPlan::analyze("get_blog", &params).unwrap_err();

        match error {
            RegistrationError::InvalidHandlerSignature { handler, signature } => {
                assert_eq!(handler, "get_blog");
                assert_eq!(signature, "(request, id)");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_param() {
        let params = [Param::keyword("name"), Param::keyword("name")];
        assert!(matches!(
            BindingPlan::analyze("dup", &params),
            Err(RegistrationError::InvalidHandlerSignature { .. })
        ));
    }

    #[test]
    fn test_render_signature() {
        let params = [
            Param::positional("id"),
            Param::request(),
            Param::keyword("page").with_default(),
            Param::var_keywords("kw"),
        ];
        assert_eq!(render_signature(&params), "(id, request, *, page=..., **kw)");

        let params = [Param::var_args("args"), Param::keyword("name")];
        assert_eq!(render_signature(&params), "(*args, name)");
    }
}
