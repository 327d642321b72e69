use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "harvest.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_git")]
    pub git: String,
    #[serde(default = "default_gh")]
    pub gh: String,
    #[serde(default = "default_org_repo_limit")]
    pub org_repo_limit: usize,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            git: default_git(),
            gh: default_gh(),
            org_repo_limit: default_org_repo_limit(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_git() -> String {
    "git".to_string()
}
fn default_gh() -> String {
    "gh".to_string()
}
fn default_org_repo_limit() -> usize {
    1000
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct HarvestConfig {
    #[serde(default = "default_agents_suffix")]
    pub agents_suffix: String,
    #[serde(default = "default_feed_in_suffix")]
    pub feed_in_suffix: String,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            agents_suffix: default_agents_suffix(),
            feed_in_suffix: default_feed_in_suffix(),
            output: default_output(),
            exclude_globs: default_exclude_globs(),
        }
    }
}

fn default_agents_suffix() -> String {
    "agents_.md".to_string()
}
fn default_feed_in_suffix() -> String {
    ".feed-in.md".to_string()
}
fn default_output() -> PathBuf {
    PathBuf::from("agents.zip")
}
fn default_exclude_globs() -> Vec<String> {
    vec!["**/.git/**".to_string()]
}

impl HarvestConfig {
    /// Compile `exclude_globs` into a matcher for local walks.
    pub fn exclude_set(&self) -> Result<GlobSet> {
        build_globset(&self.exclude_globs)
    }
}

/// Resolve the configuration for a run.
///
/// An explicit path must exist. Without one, `./harvest.toml` is used when
/// present and the built-in defaults otherwise.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if fallback.exists() {
                load_config(fallback)
            } else {
                Ok(Config::default())
            }
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.harvest.agents_suffix.is_empty() {
        anyhow::bail!("harvest.agents_suffix must not be empty");
    }
    if config.harvest.feed_in_suffix.is_empty() {
        anyhow::bail!("harvest.feed_in_suffix must not be empty");
    }
    if config.backend.org_repo_limit == 0 {
        anyhow::bail!("backend.org_repo_limit must be >= 1");
    }
    if config.backend.request_timeout_secs == 0 {
        anyhow::bail!("backend.request_timeout_secs must be >= 1");
    }
    config
        .harvest
        .exclude_set()
        .with_context(|| "Invalid pattern in harvest.exclude_globs")?;
    Ok(())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
