use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "flomo.toml";
pub const DEFAULT_VIEW_URL: &str = "https://v.flomoapp.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = concat!("flomo-notes/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Incoming-webhook URL of the flomo account.
    pub api_url: String,
    /// Base of the memo viewing URL.
    pub view_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            view_url: DEFAULT_VIEW_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Build the configuration from an optional file plus the process environment.
    ///
    /// An explicit `path` must exist. Without one, `flomo.toml` in the working
    /// directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields with `FLOMO_*` variables looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FLOMO_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(url) = lookup("FLOMO_VIEW_URL").filter(|v| !v.trim().is_empty()) {
            self.view_url = url.trim().to_string();
        }
        if let Some(secs) = lookup("FLOMO_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("FLOMO_TIMEOUT_SECS is not a number: {}", secs))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            bail!("FLOMO_API_URL is not set. Set it in your .env file, the environment, or flomo.toml");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_parsing() {
        let toml_str = r#"
            api_url = "https://flomoapp.com/iwh/abc/def/"
            timeout_secs = 5
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_url, "https://flomoapp.com/iwh/abc/def/");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.view_url, DEFAULT_VIEW_URL);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config: Config = toml::from_str(r#"api_url = "http://file""#).unwrap();
        let vars = env(&[
            ("FLOMO_API_URL", " http://env "),
            ("FLOMO_TIMEOUT_SECS", "3"),
        ]);
        config.apply_overrides(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.api_url, "http://env");
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_env_does_not_override() {
        let mut config: Config = toml::from_str(r#"api_url = "http://file""#).unwrap();
        let vars = env(&[("FLOMO_API_URL", "  ")]);
        config.apply_overrides(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.api_url, "http://file");
    }

    #[test]
    fn test_missing_api_url_is_fatal() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("FLOMO_API_URL"));
    }

    #[test]
    fn test_bad_timeout() {
        let mut config = Config::default();
        let vars = env(&[("FLOMO_TIMEOUT_SECS", "soon")]);
        assert!(config.apply_overrides(|k| vars.get(k).cloned()).is_err());

        config.api_url = "http://x".to_string();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
