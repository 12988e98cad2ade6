use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable overriding `connection.organization_url`.
pub const ORG_URL_ENV: &str = "TAGDESK_ORG_URL";
/// Environment variable overriding `connection.project`.
pub const PROJECT_ENV: &str = "TAGDESK_PROJECT";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagdeskConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub connection: ConnectionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// e.g. `https://dev.azure.com/fabrikam`
    #[serde(default)]
    pub organization_url: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    /// Name of the environment variable holding the personal access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on identities returned by the catalog query.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            organization_url: None,
            project: None,
            token_env: default_token_env(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            max_results: default_max_results(),
        }
    }
}

/// Default location of the user config file.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tagdesk/config.toml"))
}

/// Load config from `path`, or from [`default_config_path`] when `None`.
///
/// A missing file yields defaults. Environment overrides are not applied;
/// see [`resolve_config`].
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<TagdeskConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok(TagdeskConfig::default()),
        },
    };

    if !path.exists() {
        return Ok(TagdeskConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<TagdeskConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load config and apply `TAGDESK_ORG_URL` / `TAGDESK_PROJECT` overrides.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
pub fn resolve_config(path: Option<&Path>) -> Result<TagdeskConfig> {
    let config = load_config(path)?;
    Ok(apply_env_overrides(
        config,
        env::var(ORG_URL_ENV).ok(),
        env::var(PROJECT_ENV).ok(),
    ))
}

fn apply_env_overrides(
    mut config: TagdeskConfig,
    org_url: Option<String>,
    project: Option<String>,
) -> TagdeskConfig {
    if let Some(url) = org_url.filter(|v| !v.trim().is_empty()) {
        config.connection.organization_url = Some(url);
    }
    if let Some(name) = project.filter(|v| !v.trim().is_empty()) {
        config.connection.project = Some(name);
    }
    config
}

fn default_token_env() -> String {
    "AZURE_DEVOPS_PAT".to_string()
}

fn default_api_version() -> String {
    "7.1".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_results() -> u32 {
    200
}
