//! Common types shared by the runner, the state store and the notifier

use serde::{Deserialize, Serialize};

use crate::version::semver::parse_version;

/// Kind of difference between the running version and the latest one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Prerelease,
    Build,
    Major,
    Minor,
    Patch,
    /// The running version is already the latest (or newer)
    Latest,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Prerelease => "prerelease",
            ChangeKind::Build => "build",
            ChangeKind::Major => "major",
            ChangeKind::Minor => "minor",
            ChangeKind::Patch => "patch",
            ChangeKind::Latest => "latest",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one update check, persisted until the next invocation shows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    /// Version the host is running
    pub current: String,
    /// Latest version reported by the registry
    pub latest: String,
    #[serde(rename = "type")]
    pub change_kind: ChangeKind,
    /// Package name
    pub name: String,
}

impl UpdateInfo {
    /// Whether `latest` is strictly newer than `current`.
    ///
    /// Falls back to the recorded change kind when either side does not parse.
    pub fn is_available(&self) -> bool {
        match (parse_version(&self.current), parse_version(&self.latest)) {
            (Some(current), Some(latest)) => latest > current,
            _ => self.change_kind != ChangeKind::Latest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn update(current: &str, latest: &str, change_kind: ChangeKind) -> UpdateInfo {
        UpdateInfo {
            current: current.to_string(),
            latest: latest.to_string(),
            change_kind,
            name: "foo".to_string(),
        }
    }

    #[rstest]
    #[case("1.0.0", "1.2.0", ChangeKind::Minor, true)]
    #[case("1.0.0", "1.0.0", ChangeKind::Latest, false)]
    #[case("2.0.0", "1.0.0", ChangeKind::Latest, false)]
    #[case("1.0.0-beta.1", "1.0.0", ChangeKind::Prerelease, true)]
    #[case("nightly", "main", ChangeKind::Latest, false)]
    #[case("nightly", "main", ChangeKind::Major, true)]
    fn is_available_requires_strictly_newer_latest(
        #[case] current: &str,
        #[case] latest: &str,
        #[case] kind: ChangeKind,
        #[case] expected: bool,
    ) {
        assert_eq!(update(current, latest, kind).is_available(), expected);
    }

    #[test]
    fn update_info_serializes_change_kind_as_type() {
        let json = serde_json::to_value(update("1.0.0", "1.2.0", ChangeKind::Minor)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "current": "1.0.0",
                "latest": "1.2.0",
                "type": "minor",
                "name": "foo"
            })
        );
    }
}
