pub mod serde_helpers;
mod validation;

use crate::domain::{Level, level_threshold};
use crate::hook::{DispatchMode, HookConfig};
use crate::sender::{ClientConfig, Credentials};
use serde::{Deserialize, Serialize};
use serde_helpers::{load_env_millis, load_env_string, load_env_string_opt, load_env_var};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

/// Everything needed to stand up a dispatch hook, loadable from TOML or the
/// environment.
///
/// ```toml
/// group_name = "payments"
/// level = "warn"
/// async_dispatch = true
/// region = "eu-west-1"
/// timeout_ms = 5000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookSettings {
    pub group_name: String,
    /// Defaults to the host name.
    pub stream_name: String,
    /// Lowest level shipped when `accepted_levels` is not given.
    pub level: Level,
    pub accepted_levels: Option<Vec<Level>>,
    pub async_dispatch: bool,
    pub region: String,
    pub endpoint: Option<String>,
    #[serde(rename = "timeout_ms", with = "serde_helpers")]
    pub timeout: Duration,
    #[serde(rename = "connection_timeout_ms", with = "serde_helpers")]
    pub connection_timeout: Duration,
    pub user_agent: String,
    /// Only ever read from the environment.
    #[serde(skip)]
    pub credentials: Option<Credentials>,
}

impl Default for HookSettings {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            group_name: String::new(),
            stream_name: default_stream_name(),
            level: Level::Info,
            accepted_levels: None,
            async_dispatch: false,
            region: client.region,
            endpoint: None,
            timeout: client.timeout,
            connection_timeout: client.connection_timeout,
            user_agent: client.user_agent,
            credentials: None,
        }
    }
}

fn default_stream_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

impl HookSettings {
    pub fn new(group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: HookSettings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = HookSettings::default();

        load_env_string("CLOUDWATCH_LOG_GROUP", &mut settings.group_name);
        load_env_string("CLOUDWATCH_LOG_STREAM", &mut settings.stream_name);
        load_env_var("CLOUDWATCH_LOG_LEVEL", &mut settings.level)?;
        load_env_var("CLOUDWATCH_ASYNC", &mut settings.async_dispatch)?;
        load_env_string_opt("CLOUDWATCH_ENDPOINT", &mut settings.endpoint);
        load_env_millis("CLOUDWATCH_TIMEOUT_MS", &mut settings.timeout)?;
        load_env_string("AWS_REGION", &mut settings.region);
        settings.credentials = credentials_from_env()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn hook_config(&self) -> HookConfig {
        let accepted_levels = self
            .accepted_levels
            .clone()
            .unwrap_or_else(|| level_threshold(self.level).to_vec());

        HookConfig {
            group_name: self.group_name.clone(),
            stream_name: self.stream_name.clone(),
            accepted_levels: Some(accepted_levels),
            mode: DispatchMode::from_async(self.async_dispatch),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            credentials: self.credentials.clone(),
            timeout: self.timeout,
            connection_timeout: self.connection_timeout,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Reads the standard AWS key variables. Both keys must be set together.
pub fn credentials_from_env() -> Result<Option<Credentials>, ConfigError> {
    let access_key = std::env::var("AWS_ACCESS_KEY_ID").ok();
    let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok();

    match (access_key, secret_key) {
        (Some(access_key), Some(secret_key)) => {
            let mut credentials = Credentials::new(access_key, secret_key);
            if let Ok(token) = std::env::var("AWS_SESSION_TOKEN") {
                credentials = credentials.with_session_token(token);
            }
            Ok(Some(credentials))
        }
        (None, None) => Ok(None),
        _ => Err(ConfigError::EnvError(
            "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = HookSettings::default();
        assert!(settings.group_name.is_empty());
        assert!(!settings.stream_name.is_empty());
        assert_eq!(settings.level, Level::Info);
        assert_eq!(settings.region, "us-east-1");
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(!settings.async_dispatch);
    }

    #[test]
    fn test_default_requires_group_name() {
        let err = HookSettings::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(_)));
        assert!(HookSettings::new("app").validate().is_ok());
    }

    #[test]
    fn test_from_toml_str() {
        let settings = HookSettings::from_toml_str(
            r#"
            group_name = "payments"
            stream_name = "api-1"
            level = "warn"
            async_dispatch = true
            region = "eu-west-1"
            endpoint = "http://localhost:4566"
            timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(settings.group_name, "payments");
        assert_eq!(settings.stream_name, "api-1");
        assert_eq!(settings.level, Level::Warn);
        assert!(settings.async_dispatch);
        assert_eq!(settings.timeout, Duration::from_millis(2500));
        assert_eq!(settings.connection_timeout, Duration::from_secs(10));
        assert_eq!(settings.endpoint.as_deref(), Some("http://localhost:4566"));
    }

    #[test]
    fn test_unknown_level_is_parse_error() {
        let err = HookSettings::from_toml_str("group_name = \"a\"\nlevel = \"loud\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_hook_config_uses_threshold() {
        let mut settings = HookSettings::new("app");
        settings.level = Level::Error;
        settings.async_dispatch = true;

        let config = settings.hook_config();
        assert_eq!(
            config.accepted_levels,
            Some(vec![Level::Error, Level::Fatal, Level::Panic])
        );
        assert_eq!(config.mode, DispatchMode::Detached);
    }

    #[test]
    fn test_explicit_levels_override_threshold() {
        let mut settings = HookSettings::new("app");
        settings.level = Level::Error;
        settings.accepted_levels = Some(vec![Level::Debug, Level::Panic]);

        let config = settings.hook_config();
        assert_eq!(config.accepted_levels, Some(vec![Level::Debug, Level::Panic]));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = HookSettings::new("app");
        settings.stream_name = "web:1".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidConfig(_))));

        let mut settings = HookSettings::new("app");
        settings.endpoint = Some("not a url".to_string());
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidUrl(_))));

        let mut settings = HookSettings::new("app");
        settings.endpoint = Some("ftp://localhost".to_string());
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidUrl(_))));

        let mut settings = HookSettings::new("app");
        settings.accepted_levels = Some(Vec::new());
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidConfig(_))));

        let mut settings = HookSettings::new("app");
        settings.timeout = Duration::ZERO;
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_client_config_carries_credentials() {
        let settings =
            HookSettings::new("app").with_credentials(Credentials::new("AKID", "secret"));
        let client = settings.client_config();
        assert_eq!(client.region, "us-east-1");
        assert_eq!(
            client.credentials.map(|c| c.access_key_id),
            Some("AKID".to_string())
        );
    }
}
