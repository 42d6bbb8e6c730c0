//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Environment variable overriding the bearer token
pub const TOKEN_ENV: &str = "PARITY_PROBE_TOKEN";
/// Environment variable overriding the dev base URL
pub const DEV_URL_ENV: &str = "PARITY_PROBE_DEV_URL";
/// Environment variable overriding the release base URL
pub const RELEASE_URL_ENV: &str = "PARITY_PROBE_RELEASE_URL";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Bearer credential sent on every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Header carrying the scenario's task tag
    #[serde(default = "default_task_header")]
    pub task_header: String,

    /// Deployments under comparison, in request order
    #[serde(default = "default_environments")]
    pub environments: Vec<Environment>,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            task_header: default_task_header(),
            environments: default_environments(),
            timeouts: Timeouts::default(),
        }
    }
}

/// One deployment of the API under test
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Environment {
    /// Short name used in reports ("dev", "release")
    pub name: String,
    /// Base URL every request path is appended to
    pub base_url: String,
}

impl Environment {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }
}

fn default_task_header() -> String {
    "X-Task-Id".to_string()
}

fn default_environments() -> Vec<Environment> {
    vec![
        Environment::new("dev", "https://dev-gs.qa-playground.com/api/v1"),
        Environment::new("release", "https://release-gs.qa-playground.com/api/v1"),
    ]
}

/// Timeout settings in seconds
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Timeouts {
    /// Per-request timeout; unset leaves the HTTP client default in place
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_secs: Option<u64>,
}

impl Timeouts {
    pub fn request(&self) -> Option<Duration> {
        self.request_secs.map(Duration::from_secs)
    }
}

/// Settings given on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub dev_url: Option<String>,
    pub release_url: Option<String>,
}

impl Config {
    /// Load configuration from an explicit path or the default config file
    ///
    /// An explicit path must exist. The default location falls back to
    /// built-in defaults when no file is present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse TOML configuration text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Apply `PARITY_PROBE_*` variables from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply `PARITY_PROBE_*` variables from an arbitrary lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(TOKEN_ENV) {
            self.token = Some(token);
        }
        if let Some(url) = non_empty(DEV_URL_ENV) {
            self.set_base_url("dev", url);
        }
        if let Some(url) = non_empty(RELEASE_URL_ENV) {
            self.set_base_url("release", url);
        }
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(token) = overrides.token {
            self.token = Some(token);
        }
        if let Some(url) = overrides.dev_url {
            self.set_base_url("dev", url);
        }
        if let Some(url) = overrides.release_url {
            self.set_base_url("release", url);
        }
    }

    /// Replace the base URL of a named environment, adding it if absent
    pub fn set_base_url(&mut self, name: &str, base_url: String) {
        match self.environments.iter_mut().find(|e| e.name == name) {
            Some(env) => env.base_url = base_url,
            None => self.environments.push(Environment::new(name, base_url)),
        }
    }

    /// Check the configuration is usable for a comparison run
    pub fn validate(&self) -> Result<()> {
        if self.environments.len() < 2 {
            return Err(Error::Config(format!(
                "At least two environments are required for a comparison, found {}",
                self.environments.len()
            )));
        }

        for (i, env) in self.environments.iter().enumerate() {
            if env.name.trim().is_empty() {
                return Err(Error::Config(format!("Environment #{} has an empty name", i + 1)));
            }
            if self.environments[..i].iter().any(|e| e.name == env.name) {
                return Err(Error::Config(format!(
                    "Environment name '{}' is used more than once",
                    env.name
                )));
            }
            if !(env.base_url.starts_with("http://") || env.base_url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "Environment '{}' base_url must start with http:// or https://, got '{}'",
                    env.name, env.base_url
                )));
            }
        }

        if self.task_header.trim().is_empty() {
            return Err(Error::Config("task_header must not be empty".to_string()));
        }

        Ok(())
    }

    /// Get the bearer token, failing when none is configured
    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::MissingToken)
    }

    /// Copy of the configuration safe to print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.token.is_some() {
            copy.token = Some("<redacted>".to_string());
        }
        copy
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Where the configuration was loaded from, for display
pub fn describe_source(path: Option<&Path>) -> String {
    let resolved: Option<PathBuf> = path.map(Path::to_path_buf).or_else(config_path);
    match resolved {
        Some(p) if p.exists() => p.display().to_string(),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "built-in defaults".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_compare_dev_and_release() {
        let config = Config::default();
        let names: Vec<&str> = config.environments.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["dev", "release"]);
        assert_eq!(config.task_header, "X-Task-Id");
        assert!(config.timeouts.request().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::parse(
            r#"
token = "secret"
task_header = "X-Probe"

[[environments]]
name = "a"
base_url = "http://localhost:1/api"

[[environments]]
name = "b"
base_url = "http://localhost:2/api"

[timeouts]
request_secs = 5
"#,
        )
        .unwrap();

        assert_eq!(config.token().unwrap(), "secret");
        assert_eq!(config.task_header, "X-Probe");
        assert_eq!(config.environments[1], Environment::new("b", "http://localhost:2/api"));
        assert_eq!(config.timeouts.request(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = Config::parse("environments = 3").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "token = \"from-file\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.token().unwrap(), "from-file");
        assert_eq!(config.environments.len(), 2);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_env_then_cli_precedence() {
        let vars: HashMap<&str, &str> = [
            (TOKEN_ENV, "env-token"),
            (DEV_URL_ENV, "http://env-dev"),
            (RELEASE_URL_ENV, "   "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.token().unwrap(), "env-token");
        assert_eq!(config.environments[0].base_url, "http://env-dev");
        assert_eq!(
            config.environments[1].base_url,
            "https://release-gs.qa-playground.com/api/v1"
        );

        config.apply_overrides(Overrides {
            token: Some("cli-token".into()),
            dev_url: None,
            release_url: Some("http://cli-release".into()),
        });
        assert_eq!(config.token().unwrap(), "cli-token");
        assert_eq!(config.environments[0].base_url, "http://env-dev");
        assert_eq!(config.environments[1].base_url, "http://cli-release");
    }

    #[test]
    fn test_validate_rejects_single_environment() {
        let mut config = Config::default();
        config.environments.truncate(1);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_names_and_bad_urls() {
        let mut config = Config::default();
        config.environments[1].name = "dev".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.environments[0].base_url = "dev-gs.qa-playground.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_or_blank_token() {
        let mut config = Config::default();
        assert!(matches!(config.token(), Err(Error::MissingToken)));
        config.token = Some("  ".into());
        assert!(matches!(config.token(), Err(Error::MissingToken)));
    }

    #[test]
    fn test_redacted_hides_token() {
        let mut config = Config::default();
        config.token = Some("secret".into());
        let rendered = config.redacted().to_toml().unwrap();
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
