//! Snapshot of the process context the gate and the notifier look at

use std::ffi::OsStr;
use std::io::IsTerminal;

use crate::config::{DISABLE_CLI_FLAG, DISABLE_ENV_VAR};

/// Variables set by CI services
const CI_ENV_VARS: &[&str] = &["CI", "CONTINUOUS_INTEGRATION", "BUILD_NUMBER", "RUN_ID"];

/// Variables npm sets for scripts it runs
const PACKAGE_MANAGER_ENV_VARS: &[&str] = &[
    "npm_config_user_agent",
    "npm_lifecycle_event",
    "npm_package_name",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Environment {
    /// stdout is attached to a terminal
    pub interactive: bool,
    /// `NO_UPDATE_NOTIFIER` is set
    pub disabled_by_env: bool,
    /// `--no-update-notifier` was passed to the host
    pub disabled_by_flag: bool,
    /// The host runs as a package manager script
    pub inside_package_manager: bool,
    pub continuous_integration: bool,
}

impl Environment {
    /// Inspect the current process
    pub fn detect() -> Self {
        let args: Vec<_> = std::env::args_os().skip(1).collect();
        Self::from_parts(
            |name| std::env::var_os(name).is_some(),
            &args,
            std::io::stdout().is_terminal(),
        )
    }

    /// Build from an environment lookup, the host's arguments and the TTY state.
    ///
    /// Arguments need not be valid UTF-8.
    pub fn from_parts<F, A>(has_var: F, args: &[A], interactive: bool) -> Self
    where
        F: Fn(&str) -> bool,
        A: AsRef<OsStr>,
    {
        Self {
            interactive,
            disabled_by_env: has_var(DISABLE_ENV_VAR),
            disabled_by_flag: args
                .iter()
                .any(|arg| arg.as_ref() == OsStr::new(DISABLE_CLI_FLAG)),
            inside_package_manager: PACKAGE_MANAGER_ENV_VARS.iter().any(|name| has_var(name)),
            continuous_integration: CI_ENV_VARS.iter().any(|name| has_var(name)),
        }
    }

    /// An interactive terminal outside CI and outside the package manager
    pub fn can_display(&self) -> bool {
        self.interactive && !self.inside_package_manager && !self.continuous_integration
    }
}
