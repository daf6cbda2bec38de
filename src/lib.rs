//! Out-of-band update notifications for command-line tools.
//!
//! ```no_run
//! use update_notifier::{NotifierConfig, NotifyOptions, runner};
//!
//! fn main() -> anyhow::Result<()> {
//!     // Becomes the detached check runner when re-executed as one
//!     runner::intercept();
//!
//!     let config = NotifierConfig::builder("my-tool", env!("CARGO_PKG_VERSION")).build()?;
//!     let mut notifier = update_notifier::check_for_updates(config);
//!     notifier.notify(NotifyOptions::default());
//!
//!     // ... the tool's own work; the notice is printed when `notifier` drops
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: `NotifierConfig`, constants and paths
//! - [`notifier`]: Gate and notifier running inside the host process
//! - [`runner`]: Detached check runner and its launcher
//! - [`state`]: SQLite-backed per-package state
//! - [`version`]: Registry lookups and version classification
//! - [`logging`]: File logging for the runner and the CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod notifier;
pub mod runner;
pub mod state;
pub mod version;

pub use config::{NotifierConfig, RegistryKind};
pub use notifier::{NotifyOptions, UpdateNotifier, check_for_updates};
pub use version::checker::{check_now, check_with};
pub use version::types::{ChangeKind, UpdateInfo};
