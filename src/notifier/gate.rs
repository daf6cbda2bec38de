//! Decides whether this invocation launches a check

use crate::notifier::environment::Environment;
use crate::state::PersistedState;

/// Why checking and notifying are off for this invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
    /// The state store could not be opened or read
    StoreUnavailable,
    OptedOut,
    EnvironmentOverride,
    CliFlag,
    ContinuousIntegration,
}

/// Outcome of one pass through the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Disabled(DisabledReason),
    /// Interval not yet elapsed since the last check
    NotDue,
    /// A runner was launched
    Due,
}

/// First reason, if any, to skip both checking and notifying
pub fn suppression(state: &PersistedState, env: &Environment) -> Option<DisabledReason> {
    if state.opt_out {
        Some(DisabledReason::OptedOut)
    } else if env.disabled_by_env {
        Some(DisabledReason::EnvironmentOverride)
    } else if env.disabled_by_flag {
        Some(DisabledReason::CliFlag)
    } else if env.continuous_integration {
        Some(DisabledReason::ContinuousIntegration)
    } else {
        None
    }
}

/// A check is due once `interval_ms` has elapsed since `last_check_ms`
pub fn is_due(last_check_ms: i64, interval_ms: u64, now_ms: i64) -> bool {
    let interval = i64::try_from(interval_ms).unwrap_or(i64::MAX);
    now_ms.saturating_sub(last_check_ms) >= interval
}
