use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default interval between update checks in milliseconds (24 hours)
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;

/// Timeout for registry requests in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// Process-level switches
// =============================================================================

/// Presence of this environment variable disables checking and notifying
pub const DISABLE_ENV_VAR: &str = "NO_UPDATE_NOTIFIER";

/// Presence of this flag among the host's arguments disables checking and notifying
pub const DISABLE_CLI_FLAG: &str = "--no-update-notifier";

/// Environment variable holding the tracing filter for the runner and the CLI
pub const LOG_FILTER_ENV_VAR: &str = "UPDATE_NOTIFIER_LOG";

/// First argument that turns a re-executed binary into the check runner
pub const RUNNER_ARG: &str = "__update-notifier-check";

/// Environment variable carrying the GitHub token to the check runner
pub const GITHUB_TOKEN_ENV_VAR: &str = "UPDATE_NOTIFIER_GITHUB_TOKEN";

/// Prefix of the per-package key in the state store
pub const STATE_KEY_PREFIX: &str = "notifier-state-";

const APP_DIR_NAME: &str = "update-notifier";

/// Source a package's latest version is looked up from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    /// npm registry, looked up by package name
    #[default]
    Npm,
    /// GitHub tags, looked up by owner and repository name
    GitHub,
}

impl RegistryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKind::Npm => "npm",
            RegistryKind::GitHub => "github",
        }
    }
}

impl std::fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of one notifier instance.
///
/// Serialized as camelCase JSON; this is also the payload handed to the
/// detached check runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifierConfig {
    pub package_name: String,
    pub package_version: String,
    #[serde(default)]
    pub registry: RegistryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_owner: Option<String>,
    /// Never serialized; the runner receives it through [`GITHUB_TOKEN_ENV_VAR`]
    #[serde(default, skip_serializing)]
    pub github_token: Option<String>,
    /// Base URL override for the selected registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
    #[serde(default)]
    pub install_hint: String,
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
}

fn default_check_interval_ms() -> u64 {
    DEFAULT_CHECK_INTERVAL_MS
}

impl NotifierConfig {
    pub fn builder(
        package_name: impl Into<String>,
        package_version: impl Into<String>,
    ) -> NotifierConfigBuilder {
        NotifierConfigBuilder {
            package_name: package_name.into(),
            package_version: package_version.into(),
            registry: RegistryKind::Npm,
            github_owner: None,
            github_token: None,
            registry_url: None,
            install_hint: None,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
        }
    }

    /// Parses a JSON payload and validates it, filling in the install hint
    /// when it is missing.
    pub fn from_json(payload: &str) -> Result<Self, ConfigError> {
        let mut config: NotifierConfig = serde_json::from_str(payload)?;
        config.validate()?;
        if config.install_hint.is_empty() {
            config.install_hint = default_install_hint(
                config.registry,
                config.github_owner.as_deref(),
                &config.package_name,
            );
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.package_name.trim().is_empty() {
            return Err(ConfigError::MissingPackageName);
        }
        if self.package_version.trim().is_empty() {
            return Err(ConfigError::MissingPackageVersion);
        }
        let has_owner = self
            .github_owner
            .as_deref()
            .is_some_and(|owner| !owner.trim().is_empty());
        if self.registry == RegistryKind::GitHub && !has_owner {
            return Err(ConfigError::MissingGitHubOwner);
        }
        Ok(())
    }

    /// Key of this package's record in the state store
    pub fn state_key(&self) -> String {
        state_key(&self.package_name)
    }
}

pub fn state_key(package_name: &str) -> String {
    format!("{}{}", STATE_KEY_PREFIX, package_name)
}

/// Install command shown when the caller does not provide one
pub fn default_install_hint(
    registry: RegistryKind,
    github_owner: Option<&str>,
    package_name: &str,
) -> String {
    match (registry, github_owner) {
        (RegistryKind::GitHub, Some(owner)) => format!("npm i -g {}/{}", owner, package_name),
        _ => format!("npm i -g {}", package_name),
    }
}

/// Builder for [`NotifierConfig`]; `build` performs validation
#[derive(Debug, Clone)]
pub struct NotifierConfigBuilder {
    package_name: String,
    package_version: String,
    registry: RegistryKind,
    github_owner: Option<String>,
    github_token: Option<String>,
    registry_url: Option<String>,
    install_hint: Option<String>,
    check_interval_ms: u64,
}

impl NotifierConfigBuilder {
    pub fn registry(mut self, registry: RegistryKind) -> Self {
        self.registry = registry;
        self
    }

    /// Selects the GitHub registry for the given owner
    pub fn github(mut self, owner: impl Into<String>) -> Self {
        self.registry = RegistryKind::GitHub;
        self.github_owner = Some(owner.into());
        self
    }

    pub fn github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }

    pub fn registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = Some(url.into());
        self
    }

    pub fn install_hint(mut self, hint: impl Into<String>) -> Self {
        self.install_hint = Some(hint.into());
        self
    }

    pub fn check_interval_ms(mut self, interval: u64) -> Self {
        self.check_interval_ms = interval;
        self
    }

    pub fn build(self) -> Result<NotifierConfig, ConfigError> {
        let install_hint = self.install_hint.unwrap_or_else(|| {
            default_install_hint(
                self.registry,
                self.github_owner.as_deref(),
                &self.package_name,
            )
        });

        let config = NotifierConfig {
            package_name: self.package_name,
            package_version: self.package_version,
            registry: self.registry,
            github_owner: self.github_owner,
            github_token: self.github_token,
            registry_url: self.registry_url,
            install_hint,
            check_interval_ms: self.check_interval_ms,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Returns the per-user config directory for update-notifier.
/// Uses $XDG_CONFIG_HOME/update-notifier if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/update-notifier,
/// or ./update-notifier if neither is available.
pub fn config_dir() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the state database.
pub fn state_db_path() -> PathBuf {
    config_dir().join("state.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    config_dir().join("update-notifier.log")
}

fn config_dir_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let config_dir = xdg_config_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    config_dir.join(APP_DIR_NAME)
}
