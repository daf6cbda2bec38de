//! Registry trait for looking up the latest published version of a package

#[cfg(test)]
use mockall::automock;

use crate::config::RegistryKind;
use crate::version::error::RegistryError;

/// Trait for fetching the latest version from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Returns the kind of registry this implementation handles
    fn kind(&self) -> RegistryKind;

    /// Fetches the latest published version of a package
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (the repository name for GitHub)
    ///
    /// # Returns
    /// * `Ok(String)` - The latest version string
    /// * `Err(RegistryError)` - If the lookup fails
    async fn fetch_latest(&self, package_name: &str) -> Result<String, RegistryError>;
}
