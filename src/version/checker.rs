//! Latest-version lookup and classification
//!
//! Also the callback-mode entry points: [`check_now`] and [`check_with`] hand
//! the raw result to the caller without touching the state store.

use tracing::debug;

use crate::config::NotifierConfig;
use crate::version::error::RegistryError;
use crate::version::registries;
use crate::version::registry::Registry;
use crate::version::semver::diff;
use crate::version::types::{ChangeKind, UpdateInfo};

/// Fetch the latest version and compare it with the configured one.
///
/// A latest version that is not strictly newer is still reported, with
/// [`ChangeKind::Latest`].
pub async fn fetch_update(
    config: &NotifierConfig,
    registry: &dyn Registry,
) -> Result<UpdateInfo, RegistryError> {
    let latest = registry.fetch_latest(&config.package_name).await?;
    let change_kind = diff(&config.package_version, &latest).unwrap_or(ChangeKind::Latest);

    debug!(
        "{} {}: latest {} ({})",
        registry.kind(),
        config.package_name,
        latest,
        change_kind
    );

    Ok(UpdateInfo {
        current: config.package_version.clone(),
        latest,
        change_kind,
        name: config.package_name.clone(),
    })
}

/// Check the registry selected by `config` right now and return the result.
pub async fn check_now(config: &NotifierConfig) -> Result<UpdateInfo, RegistryError> {
    let registry = registries::resolve(config)?;
    fetch_update(config, registry.as_ref()).await
}

/// Check and deliver the outcome, success or failure, to `handler` exactly once.
pub async fn check_with<F>(config: &NotifierConfig, registry: &dyn Registry, handler: F)
where
    F: FnOnce(Result<UpdateInfo, RegistryError>),
{
    handler(fetch_update(config, registry).await);
}
