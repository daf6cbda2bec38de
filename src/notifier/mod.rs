//! Ambient update notification for command-line hosts
//!
//! [`UpdateNotifier::check`] runs the gate: it consumes the update a previous
//! run left in the state store and, when the interval has elapsed, launches a
//! detached runner that looks for the next one. [`UpdateNotifier::notify`]
//! shows the consumed update, by default once the host is shutting down.
//!
//! # Modules
//!
//! - [`environment`]: TTY, escape hatches, CI and package manager detection
//! - [`gate`]: Suppression rules and interval check
//! - [`render`]: Framed notices and their output
//! - [`shutdown`]: Single-fire shutdown hooks used for deferred notices

pub mod environment;
pub mod gate;
pub mod render;
pub mod shutdown;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{NotifierConfig, config_dir, state_db_path};
use crate::error::StoreError;
use crate::runner::{DetachedProcess, Launcher};
use crate::state::{SqliteStateStore, StateStore, current_timestamp_ms};
use crate::version::types::UpdateInfo;

use environment::Environment;
use gate::{DisabledReason, GateDecision, is_due, suppression};
use render::{Notice, NoticeOutput};
use shutdown::{ShutdownCause, ShutdownHook};

/// How and when [`UpdateNotifier::notify`] renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOptions {
    /// Render at shutdown instead of immediately
    pub defer: bool,
    /// With `defer`, also render on Ctrl-C
    pub on_interrupt: bool,
    /// Replaces the default "Update available" text
    pub message: Option<String>,
}

impl Default for NotifyOptions {
    fn default() -> Self {
        Self {
            defer: true,
            on_interrupt: true,
            message: None,
        }
    }
}

impl NotifyOptions {
    pub fn immediate() -> Self {
        Self {
            defer: false,
            ..Self::default()
        }
    }
}

pub struct UpdateNotifier {
    config: NotifierConfig,
    store: Option<Arc<dyn StateStore>>,
    launcher: Arc<dyn Launcher>,
    environment: Environment,
    output: NoticeOutput,
    update: Option<UpdateInfo>,
    notified: bool,
    deferred_notice: Option<ShutdownHook>,
    diagnostic_dir: PathBuf,
    store_diagnostic: Option<ShutdownHook>,
    /// The store diagnostic was queued once; it is never queued again
    store_diagnosed: bool,
}

impl std::fmt::Debug for UpdateNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateNotifier")
            .field("package", &self.config.package_name)
            .field("store", &self.store.is_some())
            .field("update", &self.update)
            .field("notified", &self.notified)
            .finish()
    }
}

impl UpdateNotifier {
    /// Notifier backed by the default state store, launching the current
    /// executable as runner.
    ///
    /// The host must call [`crate::runner::intercept`] at the top of `main`.
    pub fn new(config: NotifierConfig) -> Self {
        let store = SqliteStateStore::open(&state_db_path())
            .map(|store| Arc::new(store) as Arc<dyn StateStore>);
        let launcher: Arc<dyn Launcher> = match DetachedProcess::current_exe() {
            Ok(process) => Arc::new(process),
            Err(e) => {
                warn!("Runner unavailable: {}", e);
                Arc::new(crate::runner::Disabled)
            }
        };

        Self::builder(config).store(store).launcher(launcher).build()
    }

    pub fn builder(config: NotifierConfig) -> UpdateNotifierBuilder {
        UpdateNotifierBuilder {
            config,
            store: None,
            launcher: None,
            environment: None,
            output: None,
            diagnostic_dir: None,
        }
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    /// Update consumed by the last [`check`](Self::check), if newer than the
    /// running version
    pub fn update(&self) -> Option<&UpdateInfo> {
        self.update.as_ref()
    }

    /// Run the gate. Never blocks on network I/O.
    pub fn check(&mut self) -> GateDecision {
        self.check_at(current_timestamp_ms())
    }

    /// [`check`](Self::check) against an explicit clock
    pub fn check_at(&mut self, now_ms: i64) -> GateDecision {
        let Some(store) = self.store.clone() else {
            debug!("No state store, skipping update check");
            return GateDecision::Disabled(DisabledReason::StoreUnavailable);
        };

        let key = self.config.state_key();
        let state = match store.load(&key, now_ms) {
            Ok(state) => state,
            Err(e) => {
                warn!("Failed to load notifier state for {}: {}", key, e);
                self.diagnose_store();
                return GateDecision::Disabled(DisabledReason::StoreUnavailable);
            }
        };

        if let Some(reason) = suppression(&state, &self.environment) {
            debug!("Update check disabled: {:?}", reason);
            return GateDecision::Disabled(reason);
        }

        if let Some(pending) = state.pending_update {
            if let Err(e) = store.clear_pending_update(&key) {
                warn!("Failed to clear pending update for {}: {}", key, e);
                self.diagnose_store();
            }
            self.update = Some(pending).filter(UpdateInfo::is_available);
        }

        if !is_due(state.last_update_check, self.config.check_interval_ms, now_ms) {
            return GateDecision::NotDue;
        }

        match self.launcher.launch(&self.config) {
            Ok(()) => info!("Launched update check for {}", self.config.package_name),
            Err(e) => warn!("Failed to launch update check: {}", e),
        }
        GateDecision::Due
    }

    /// Show the consumed update, if any, per `options`.
    ///
    /// No-op unless stdout is an interactive terminal outside CI and the
    /// package manager. Renders at most once per notifier.
    pub fn notify(&mut self, options: NotifyOptions) -> &mut Self {
        if self.notified || !self.environment.can_display() {
            return self;
        }
        let notice = match (&self.update, &options.message) {
            (None, _) => None,
            (Some(_), Some(message)) => Some(Notice::message(message)),
            (Some(update), None) => Some(Notice::update_available(
                update,
                &self.config.install_hint,
            )),
        };
        let Some(notice) = notice else {
            return self;
        };
        self.notified = true;

        if !options.defer {
            self.output.emit(&notice);
            return self;
        }

        let output = self.output.clone();
        let hook = ShutdownHook::new(move |_: ShutdownCause| output.emit(&notice));
        if options.on_interrupt {
            hook.fire_on_interrupt();
        }
        self.deferred_notice = Some(hook);
        self
    }

    /// Queue the store diagnostic for shutdown, once per notifier
    fn diagnose_store(&mut self) {
        if self.store_diagnosed {
            return;
        }
        self.store_diagnosed = true;
        self.store_diagnostic = Some(store_diagnostic_hook(
            &self.config.package_name,
            &self.diagnostic_dir,
            &self.output,
        ));
    }

    /// Render pending shutdown output now; later drops render nothing more
    pub fn flush(&mut self) {
        if let Some(hook) = self.deferred_notice.take() {
            hook.fire(ShutdownCause::Exit);
        }
        if let Some(hook) = self.store_diagnostic.take() {
            hook.fire(ShutdownCause::Exit);
        }
    }
}

impl Drop for UpdateNotifier {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Builder for [`UpdateNotifier`] with injectable collaborators
pub struct UpdateNotifierBuilder {
    config: NotifierConfig,
    store: Option<Result<Arc<dyn StateStore>, StoreError>>,
    launcher: Option<Arc<dyn Launcher>>,
    environment: Option<Environment>,
    output: Option<NoticeOutput>,
    diagnostic_dir: Option<PathBuf>,
}

impl UpdateNotifierBuilder {
    /// State store, or the error opening it failed with
    pub fn store(mut self, store: Result<Arc<dyn StateStore>, StoreError>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn output(mut self, output: NoticeOutput) -> Self {
        self.output = Some(output);
        self
    }

    /// Directory named in the store diagnostic; defaults to [`config_dir`]
    pub fn diagnostic_dir(mut self, dir: PathBuf) -> Self {
        self.diagnostic_dir = Some(dir);
        self
    }

    pub fn build(self) -> UpdateNotifier {
        let output = self.output.unwrap_or_else(NoticeOutput::stderr);
        let environment = self.environment.unwrap_or_else(Environment::detect);
        let launcher: Arc<dyn Launcher> = match self.launcher {
            Some(launcher) => launcher,
            None => Arc::new(crate::runner::Disabled),
        };

        let diagnostic_dir = self.diagnostic_dir.unwrap_or_else(config_dir);

        let (store, store_diagnostic) = match self.store {
            Some(Ok(store)) => (Some(store), None),
            Some(Err(e)) => {
                warn!("State store unavailable: {}", e);
                let hook =
                    store_diagnostic_hook(&self.config.package_name, &diagnostic_dir, &output);
                (None, Some(hook))
            }
            None => (None, None),
        };
        let store_diagnosed = store_diagnostic.is_some();

        UpdateNotifier {
            config: self.config,
            store,
            launcher,
            environment,
            output,
            update: None,
            notified: false,
            deferred_notice: None,
            diagnostic_dir,
            store_diagnostic,
            store_diagnosed,
        }
    }
}

/// Shutdown hook rendering the store access diagnostic
fn store_diagnostic_hook(package_name: &str, dir: &Path, output: &NoticeOutput) -> ShutdownHook {
    let notice = Notice::store_unavailable(package_name, dir);
    let output = output.clone();
    ShutdownHook::new(move |_: ShutdownCause| output.emit(&notice))
}

/// Construct a notifier over the default store and run the gate once.
pub fn check_for_updates(config: NotifierConfig) -> UpdateNotifier {
    let mut notifier = UpdateNotifier::new(config);
    notifier.check();
    notifier
}
