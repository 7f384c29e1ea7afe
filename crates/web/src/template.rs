//! Template rendering.
//!
//! [`TemplateEngine`] is the seam the response normalizer renders through, [`Templates`]
//! implements it with minijinja, loading templates from a directory.

use crate::config::TemplatesConfig;
use crate::error::TemplateError;
use chrono::{DateTime, Local, TimeZone};
use minijinja::{AutoEscape, Environment};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::info;

#[cfg_attr(test, mockall::automock)]
pub trait TemplateEngine: Send + Sync {
    /// Renders the template `name` with `context`
    fn render(&self, name: &str, context: &Map<String, Value>) -> Result<String, TemplateError>;
}

/// A minijinja environment loading templates from a directory, with the `datetime` filter
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Loads templates from `dir`, autoescaping html and xml templates
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_autoescape(dir, true)
    }

    pub fn with_autoescape(dir: impl AsRef<Path>, autoescape: bool) -> Self {
        let dir = dir.as_ref();
        info!(path = %dir.display(), autoescape, "set jinja2 template path");

        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir));
        if !autoescape {
            env.set_auto_escape_callback(|_| AutoEscape::None);
        }
        env.add_filter("datetime", datetime_filter);

        Self { env }
    }

    pub fn from_config(config: &TemplatesConfig) -> Self {
        Self::with_autoescape(&config.dir, config.autoescape)
    }

    /// Gives access to the environment, to register more filters or globals
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl TemplateEngine for Templates {
    fn render(&self, name: &str, context: &Map<String, Value>) -> Result<String, TemplateError> {
        let template = self.env.get_template(name)?;
        Ok(template.render(context)?)
    }
}

fn datetime_filter(timestamp: f64) -> String {
    humanize_elapsed(timestamp, &Local::now())
}

/// Describes how long ago `timestamp` (UNIX seconds) was, seen from `now`.
///
/// Anything older than a week is rendered as a date in the time zone of `now`.
pub fn humanize_elapsed<Tz>(timestamp: f64, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    #[allow(clippy::cast_precision_loss, reason = "UNIX seconds fit in f64")]
    let delta = now.timestamp() as f64 - timestamp;

    if delta < 60.0 {
        return "1分钟前".to_owned();
    }
    if delta < 3600.0 {
        return format!("{}分钟前", (delta / 60.0).floor());
    }
    if delta < 86400.0 {
        return format!("{}小时前", (delta / 3600.0).floor());
    }
    if delta < 604_800.0 {
        return format!("{}天前", (delta / 86400.0).floor());
    }

    #[allow(clippy::cast_possible_truncation, reason = "the timestamp is floored before the cast")]
    let seconds = timestamp.floor() as i64;
    match now.timezone().timestamp_opt(seconds, 0).single() {
        Some(date) => date.format("%Y年%-m月%-d日").to_string(),
        None => timestamp.to_string(),
    }
}
