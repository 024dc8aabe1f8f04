use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

/// Lowest auto-refresh interval the sync loop accepts.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub repo: RepoConfig,
    pub sync: SyncConfig,
    pub jira: JiraConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub owner: Option<String>,
    pub name: Option<String>,
    pub base_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub auto_refresh: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    pub issue_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub branch: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            owner: None,
            name: None,
            base_branch: "main".to_owned(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            interval_secs: 30,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            branch: "feature/auth-api-fix".to_owned(),
        }
    }
}

impl RepoConfig {
    /// `owner/name`, or `local` when the repository isn't configured.
    pub fn slug(&self) -> String {
        match (&self.owner, &self.name) {
            (Some(owner), Some(name)) => format!("{}/{}", owner, name),
            _ => "local".to_owned(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    /// A missing file yields defaults. Environment overrides apply either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path(),
        };

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            if path.is_some() {
                anyhow::bail!("Config file not found: {}", config_path.display());
            }
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `GITHUB_OWNER`, `GITHUB_REPO`, `GITHUB_BASE_BRANCH` and
    /// `ATLAS_JIRA_ISSUE_KEY`. Empty values are ignored.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(owner) = var("GITHUB_OWNER") {
            self.repo.owner = Some(owner);
        }
        if let Some(name) = var("GITHUB_REPO") {
            self.repo.name = Some(name);
        }
        if let Some(branch) = var("GITHUB_BASE_BRANCH") {
            self.repo.base_branch = branch;
        }
        if let Some(key) = var("ATLAS_JIRA_ISSUE_KEY") {
            self.jira.issue_key = Some(key);
        }
    }

    fn config_path() -> PathBuf {
        BaseDirectories::with_prefix("atlas")
            .map(|dirs| dirs.get_config_home())
            .unwrap_or_else(|_| PathBuf::from(".config/atlas"))
            .join("config.toml")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub jira_issue_key: Option<String>,
    pub auto_refresh: bool,
    pub refresh_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jira_issue_key: config.jira.issue_key.clone(),
            auto_refresh: config.sync.auto_refresh,
            refresh_interval_secs: config.sync.interval_secs,
        }
        .clamped()
    }

    pub fn clamped(mut self) -> Self {
        self.refresh_interval_secs = self.refresh_interval_secs.max(MIN_REFRESH_INTERVAL_SECS);
        self
    }

    /// Interactive update: values below the floor are rejected, not clamped.
    pub fn set_refresh_interval(&mut self, secs: u64) -> Result<()> {
        if secs < MIN_REFRESH_INTERVAL_SECS {
            anyhow::bail!(
                "Refresh interval must be at least {} seconds (got {})",
                MIN_REFRESH_INTERVAL_SECS,
                secs
            );
        }
        self.refresh_interval_secs = secs;
        Ok(())
    }

    pub fn set_jira_issue_key(&mut self, key: &str) {
        let key = key.trim();
        self.jira_issue_key = (!key.is_empty()).then(|| key.to_string());
    }
}
