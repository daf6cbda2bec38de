use semver::Version;

use crate::version::types::ChangeKind;

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros,
/// and strips a leading 'v' as used by git tags.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "v1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = normalize_version(version);
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Strip surrounding whitespace and a leading 'v' / 'V' from a tag
pub fn normalize_version(version: &str) -> &str {
    let trimmed = version.trim();
    trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed)
}

/// Classify how `latest` differs from `current`.
///
/// Returns `None` when `latest` is not strictly newer or either side is not a
/// valid version. The most significant differing component wins.
pub fn diff(current: &str, latest: &str) -> Option<ChangeKind> {
    let current = parse_version(current)?;
    let latest = parse_version(latest)?;

    if latest <= current {
        return None;
    }

    let kind = if latest.major != current.major {
        ChangeKind::Major
    } else if latest.minor != current.minor {
        ChangeKind::Minor
    } else if latest.patch != current.patch {
        ChangeKind::Patch
    } else if latest.pre != current.pre {
        ChangeKind::Prerelease
    } else {
        ChangeKind::Build
    };

    Some(kind)
}
