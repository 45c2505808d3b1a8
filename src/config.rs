use crate::error::{CrmError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_REPORT_LOG_PATH: &str = "/tmp/crm_report_log.txt";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Prometheus listener, e.g. "127.0.0.1:9464". Disabled when unset.
    pub metrics_addr: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            metrics_addr: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/crm.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub log_path: PathBuf,
    /// GraphQL endpoint to query over HTTP. The in-process schema is used when unset.
    pub endpoint: Option<String>,
    pub interval_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_REPORT_LOG_PATH),
            endpoint: None,
            interval_secs: 3600,
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            request_timeout_secs: 30,
        }
    }
}

impl ReportConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Loads the TOML file at `path`, then applies `CRM_*` overrides.
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                CrmError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `lookup` is injected so tests don't have to touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("CRM_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| CrmError::Config(format!("CRM_PORT is not a port: {port}")))?;
        }
        if let Some(addr) = lookup("CRM_METRICS_ADDR") {
            self.server.metrics_addr = Some(addr);
        }
        if let Some(path) = lookup("CRM_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CRM_REPORT_LOG_PATH") {
            self.report.log_path = PathBuf::from(path);
        }
        if let Some(endpoint) = lookup("CRM_REPORT_ENDPOINT") {
            self.report.endpoint = if endpoint.trim().is_empty() {
                None
            } else {
                Some(endpoint)
            };
        }
        if let Some(secs) = lookup("CRM_REPORT_INTERVAL_SECS") {
            self.report.interval_secs = secs.parse().map_err(|_| {
                CrmError::Config(format!("CRM_REPORT_INTERVAL_SECS is not a number: {secs}"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.report.max_retries, 3);
        assert_eq!(
            config.report.log_path,
            PathBuf::from(DEFAULT_REPORT_LOG_PATH)
        );
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [report]
            endpoint = "http://localhost:8000/graphql"
            interval_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(
            config.report.endpoint.as_deref(),
            Some("http://localhost:8000/graphql")
        );
        assert_eq!(config.report.interval(), Duration::from_secs(60));
        assert_eq!(config.report.base_delay_ms, 1_000);
        assert_eq!(config.database.path, PathBuf::from("data/crm.db"));
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("CRM_PORT", "9001"),
            ("CRM_REPORT_ENDPOINT", ""),
            ("CRM_DATABASE_PATH", "/var/lib/crm.db"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::from_toml_str("[report]\nendpoint = \"http://x/graphql\"").unwrap();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 9001);
        assert!(config.report.endpoint.is_none());
        assert_eq!(config.database.path, PathBuf::from("/var/lib/crm.db"));
    }

    #[test]
    fn bad_port_is_a_config_error() {
        let mut config = Config::default();
        let err = config
            .apply_env_overrides(|k| (k == "CRM_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, CrmError::Config(_)));
    }
}
