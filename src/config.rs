use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/upload-resume/";

/// What a submission does when no resume is attached
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MissingFilePolicy {
    /// Record the turn but send nothing and wait for nothing
    #[default]
    NoReply,
    /// Refuse the submission until a file is attached
    RequireFile,
    /// Send the job description on its own
    TextOnly,
}

impl MissingFilePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingFilePolicy::NoReply => "no-reply",
            MissingFilePolicy::RequireFile => "require-file",
            MissingFilePolicy::TextOnly => "text-only",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub request_timeout_secs: u64,
    pub missing_file_policy: MissingFilePolicy,
    pub toast_duration_ms: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 120,
            missing_file_policy: MissingFilePolicy::default(),
            toast_duration_ms: 5000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Invalid config at {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Apply `RESUME_CHAT_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(endpoint) = lookup("RESUME_CHAT_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(timeout) = lookup("RESUME_CHAT_TIMEOUT_SECS") {
            self.request_timeout_secs = timeout
                .parse()
                .context("RESUME_CHAT_TIMEOUT_SECS must be a whole number of seconds")?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("resume-chat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.missing_file_policy, MissingFilePolicy::NoReply);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            endpoint: "http://analysis.internal/upload-resume/".to_string(),
            missing_file_policy: MissingFilePolicy::RequireFile,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"missing_file_policy": "text-only"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.missing_file_policy, MissingFilePolicy::TextOnly);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.toast_duration(), Duration::from_millis(5000));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| match key {
                "RESUME_CHAT_ENDPOINT" => Some("http://10.0.0.5:5000/upload-resume/".to_string()),
                "RESUME_CHAT_TIMEOUT_SECS" => Some("30".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.endpoint, "http://10.0.0.5:5000/upload-resume/");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_bad_timeout_override_is_an_error() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "RESUME_CHAT_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}
