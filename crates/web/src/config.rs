//! Application configuration.
//!
//! Settings are layered: built-in defaults, then an optional configuration file, then
//! environment variables prefixed with `COROWEB`, sections separated by `__`
//! (e.g. `COROWEB__SERVER__PORT=8080`).

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

pub const ENV_PREFIX: &str = "COROWEB";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub debug: bool,
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticFilesConfig {
    /// url prefix of the static mount, starting and ending with `/`
    pub prefix: String,
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesConfig {
    pub dir: String,
    /// autoescape html and xml templates
    pub autoescape: bool,
}

impl AppConfig {
    /// Loads the defaults overridden by the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::builder()?.add_source(Self::environment()).build()?.try_deserialize()
    }

    /// Loads the defaults overridden by the file at `path` when it exists, then by the environment.
    ///
    /// The file format is guessed from the extension, `path` may also omit it.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let path = path.as_ref().to_string_lossy();
        Self::builder()?
            .add_source(config::File::with_name(&path).required(false))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("debug", true)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 9000)?
            .set_default("static_files.prefix", "/static/")?
            .set_default("static_files.dir", "static")?
            .set_default("templates.dir", "templates")?
            .set_default("templates.autoescape", true)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX).prefix_separator(ENV_SEPARATOR).separator(ENV_SEPARATOR)
    }

    /// The address the server listens on
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port).parse().map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = AppConfig::load_from("does-not-exist/app").unwrap();

        assert!(config.debug);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.static_files.prefix, "/static/");
        assert_eq!(config.static_files.dir, "static");
        assert_eq!(config.templates.dir, "templates");
        assert!(config.templates.autoescape);
        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("micro-coroweb-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("app.toml");
        fs::write(&file, "debug = false\n\n[server]\nport = 8080\n\n[templates]\nautoescape = false\n").unwrap();

        let config = AppConfig::load_from(&file).unwrap();

        assert!(!config.debug);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(!config.templates.autoescape);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_address() {
        let mut config = AppConfig::load_from("does-not-exist/app").unwrap();
        config.server.host = "not a host".into();

        assert!(config.socket_addr().unwrap_err().starts_with("Invalid address"));
    }
}
