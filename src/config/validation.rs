use super::{ConfigError, HookSettings};
use url::Url;

/// CloudWatch Logs limit for both group and stream names.
const MAX_NAME_LEN: usize = 512;

impl HookSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name("Log group name", &self.group_name)?;
        validate_name("Log stream name", &self.stream_name)?;

        if self.stream_name.contains([':', '*']) {
            return Err(ConfigError::InvalidConfig(format!(
                "Log stream name '{}' must not contain ':' or '*'",
                self.stream_name
            )));
        }

        if let Some(levels) = &self.accepted_levels
            && levels.is_empty()
        {
            return Err(ConfigError::InvalidConfig(
                "Accepted levels must not be empty; omit the list to accept every level".to_string(),
            ));
        }

        if self.region.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Region must not be empty".to_string(),
            ));
        }

        if let Some(endpoint) = &self.endpoint {
            let url = Url::parse(endpoint).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid endpoint URL '{endpoint}': {e}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl(format!(
                    "Endpoint URL '{endpoint}' must use http or https"
                )));
            }
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.connection_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Connection timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_name(what: &str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(format!("{what} must not be empty")));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ConfigError::InvalidConfig(format!(
            "{what} exceeds {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}
