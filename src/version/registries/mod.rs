//! Registry implementations and the resolver selecting one per config

pub mod github;
pub mod npm;

pub use github::GitHubRegistry;
pub use npm::NpmRegistry;

use crate::config::{NotifierConfig, RegistryKind};
use crate::version::error::RegistryError;
use crate::version::registry::Registry;

/// Builds the registry client a config asks for.
///
/// `registry_url` overrides the default base URL of either registry.
pub fn resolve(config: &NotifierConfig) -> Result<Box<dyn Registry>, RegistryError> {
    match config.registry {
        RegistryKind::Npm => {
            let base_url = config
                .registry_url
                .as_deref()
                .unwrap_or(npm::DEFAULT_BASE_URL);
            Ok(Box::new(NpmRegistry::new(base_url)?))
        }
        RegistryKind::GitHub => {
            let base_url = config
                .registry_url
                .as_deref()
                .unwrap_or(github::DEFAULT_BASE_URL);
            let owner = config.github_owner.as_deref().unwrap_or_default();
            Ok(Box::new(GitHubRegistry::new(
                base_url,
                owner,
                config.github_token.as_deref(),
            )?))
        }
    }
}
