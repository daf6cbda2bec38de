//! Version lookup layer
//!
//! Fetches the latest published version of a package and classifies how it
//! differs from the running version.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│   Checker   │────▶│ UpdateInfo  │
//! │  (fetch)    │     │  (compare)  │     │  (result)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   │
//!        ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐
//! │  Registries │     │   Semver    │
//! │(npm, github)│     │   (diff)    │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`checker`]: Turns a registry lookup into an [`types::UpdateInfo`]
//! - [`registry`]: Registry trait for fetching the latest version
//! - [`registries`]: npm and GitHub implementations plus the resolver
//! - [`error`]: Error type for registry operations
//! - [`semver`]: Version parsing and diff classification
//! - [`types`]: `UpdateInfo` and `ChangeKind`

pub mod checker;
pub mod error;
pub mod registries;
pub mod registry;
pub mod semver;
pub mod types;
