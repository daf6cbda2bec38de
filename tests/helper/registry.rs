//! Registry test utilities

use async_trait::async_trait;
use mockito::{Mock, ServerGuard};

use update_notifier::RegistryKind;
use update_notifier::version::error::RegistryError;
use update_notifier::version::registry::Registry;

/// Registry answering every lookup with a fixed result
pub struct StaticRegistry {
    kind: RegistryKind,
    latest: Option<String>,
}

impl StaticRegistry {
    pub fn latest(version: &str) -> Self {
        Self {
            kind: RegistryKind::Npm,
            latest: Some(version.to_string()),
        }
    }

    pub fn not_found() -> Self {
        Self {
            kind: RegistryKind::Npm,
            latest: None,
        }
    }
}

#[async_trait]
impl Registry for StaticRegistry {
    fn kind(&self) -> RegistryKind {
        self.kind
    }

    async fn fetch_latest(&self, package_name: &str) -> Result<String, RegistryError> {
        self.latest
            .clone()
            .ok_or_else(|| RegistryError::NotFound(package_name.to_string()))
    }
}

/// Start an npm registry double whose `latest` dist-tag for `package` is `latest`
pub async fn npm_server(package: &str, latest: &str) -> (ServerGuard, Mock) {
    let mut server = mockito::Server::new_async().await;
    let body = format!(
        r#"{{"name":"{}","dist-tags":{{"latest":"{}"}},"versions":{{}}}}"#,
        package, latest
    );
    let mock = server
        .mock("GET", format!("/{}", package).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;
    (server, mock)
}
