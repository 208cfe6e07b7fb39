use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "weblauncher")]
#[command(about = "Runs the weblauncher bookmark service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".weblauncher")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_database")]
    database: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub turso_url: Option<String>,
    #[serde(default)]
    pub turso_auth_token: Option<String>,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
}

fn default_database() -> String {
    "weblauncher.db".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sync_interval() -> u64 {
    60
}

impl Default for App {
    fn default() -> Self {
        App {
            database: default_database(),
            port: default_port(),
            frontend_url: default_frontend_url(),
            log_level: default_log_level(),
            turso_url: None,
            turso_auth_token: None,
            sync_interval_seconds: default_sync_interval(),
        }
    }
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Replica credentials, present only when both are set and non-empty.
    pub fn replica(&self) -> Option<(&str, &str)> {
        let url = self.turso_url.as_deref().filter(|s| !s.trim().is_empty())?;
        let token = self.turso_auth_token.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((url, token))
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: App,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        let yaml_with_env = substitute_env_vars(yaml_str);
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }
}

/// Expands `${VAR}` and `${VAR:-default}` references. Unset variables without a
/// default expand to the empty string.
fn substitute_env_vars(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        output.push_str(&rest[..start]);

        let expr = &rest[start + 2..start + len];
        let value = match expr.split_once(":-") {
            Some((name, default)) => env::var(name).unwrap_or_else(|_| default.to_string()),
            None => env::var(expr).unwrap_or_else(|_| {
                tracing::warn!(variable = expr, "environment variable not set");
                String::new()
            }),
        };
        output.push_str(&value);
        rest = &rest[start + len + 1..];
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let cfg = Config::from_yaml("app:\n  port: 8080\n").unwrap();
        assert_eq!(cfg.app.get_port(), 8080);
        assert_eq!(cfg.app.get_db(), "weblauncher.db");
        assert_eq!(cfg.app.log_level, "info");
        assert!(cfg.app.replica().is_none());
    }

    #[test]
    fn unset_variable_falls_back_to_default() {
        let yaml = "app:\n  database: ${WEBLAUNCHER_TEST_SURELY_UNSET_DB:-fallback.db}\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.get_db(), "fallback.db");
    }

    #[test]
    fn empty_replica_settings_are_ignored() {
        let yaml = "app:\n  turso_url: ${WEBLAUNCHER_TEST_SURELY_UNSET_URL:-}\n  turso_auth_token: token\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert!(cfg.app.replica().is_none());
    }

    #[test]
    fn unterminated_reference_is_kept_verbatim() {
        assert_eq!(substitute_env_vars("a ${b"), "a ${b");
        assert_eq!(substitute_env_vars("plain"), "plain");
    }
}
