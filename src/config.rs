use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";
pub const DEFAULT_AIRTABLE_TABLE: &str = "Evaluations";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirtableSettings {
    pub api_url: String,
    pub base_id: String,
    pub table_name: String,
    pub timeout: Duration,
}

/// Process configuration read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub airtable_api_url: String,
    pub airtable_base_id: Option<String>,
    pub airtable_table_name: String,
    pub airtable_timeout: Duration,
    pub require_auth: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup so tests do not have to
    /// mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            database_url: non_empty("DATABASE_URL"),
            max_connections: non_empty("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            airtable_api_url: non_empty("AIRTABLE_API_URL")
                .unwrap_or_else(|| DEFAULT_AIRTABLE_API_URL.to_string()),
            airtable_base_id: non_empty("AIRTABLE_BASE_ID"),
            airtable_table_name: non_empty("AIRTABLE_TABLE_NAME")
                .unwrap_or_else(|| DEFAULT_AIRTABLE_TABLE.to_string()),
            airtable_timeout: Duration::from_secs(
                non_empty("AIRTABLE_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            require_auth: non_empty("DASHBOARD_REQUIRE_AUTH")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
                .unwrap_or(false),
        }
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    pub fn airtable(&self) -> Result<AirtableSettings, ConfigError> {
        let base_id = self
            .airtable_base_id
            .clone()
            .ok_or(ConfigError::Missing("AIRTABLE_BASE_ID"))?;
        Ok(AirtableSettings {
            api_url: self.airtable_api_url.clone(),
            base_id,
            table_name: self.airtable_table_name.clone(),
            timeout: self.airtable_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[]);
        assert_eq!(s.database_url, None);
        assert_eq!(s.max_connections, 5);
        assert_eq!(s.airtable_api_url, DEFAULT_AIRTABLE_API_URL);
        assert_eq!(s.airtable_table_name, "Evaluations");
        assert_eq!(s.airtable_timeout, Duration::from_secs(30));
        assert!(!s.require_auth);
        assert_eq!(s.database_url(), Err(ConfigError::Missing("DATABASE_URL")));
        assert_eq!(s.airtable(), Err(ConfigError::Missing("AIRTABLE_BASE_ID")));
    }

    #[test]
    fn reads_overrides() {
        let s = settings(&[
            ("DATABASE_URL", "postgres://localhost/calls"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("AIRTABLE_BASE_ID", "appABC"),
            ("AIRTABLE_TABLE_NAME", "Llamadas"),
            ("AIRTABLE_TIMEOUT_SECS", "7"),
            ("DASHBOARD_REQUIRE_AUTH", "true"),
        ]);
        assert_eq!(s.database_url(), Ok("postgres://localhost/calls"));
        assert_eq!(s.max_connections, 12);
        assert!(s.require_auth);
        let airtable = s.airtable().unwrap();
        assert_eq!(airtable.base_id, "appABC");
        assert_eq!(airtable.table_name, "Llamadas");
        assert_eq!(airtable.timeout, Duration::from_secs(7));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let s = settings(&[("DATABASE_URL", "  "), ("DATABASE_MAX_CONNECTIONS", "lots")]);
        assert_eq!(s.database_url, None);
        assert_eq!(s.max_connections, 5);
    }
}
