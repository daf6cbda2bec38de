//! Out-of-band check runner
//!
//! The gate launches the runner as a detached child process and never waits
//! for it. The child receives the serialized [`NotifierConfig`] as its only
//! input, looks up the latest version, and records the result in the state
//! store for the next invocation. Its stdio is discarded; it logs to a file.
//!
//! A failed lookup still stamps `last_update_check`, so a broken registry is
//! retried once per interval rather than on every invocation.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

#[cfg(test)]
use mockall::automock;
use tracing::{debug, error, info, warn};

use crate::config::{GITHUB_TOKEN_ENV_VAR, NotifierConfig, RUNNER_ARG, log_path, state_db_path};
use crate::error::{ConfigError, LaunchError};
use crate::logging;
use crate::state::{SqliteStateStore, StateStore, current_timestamp_ms};
use crate::version::checker::fetch_update;
use crate::version::registries;
use crate::version::registry::Registry;
use crate::version::types::UpdateInfo;

/// Starts a check without waiting for it
#[cfg_attr(test, automock)]
pub trait Launcher: Send + Sync {
    /// Start a check for `config`. Returns once the check is started; there
    /// is no channel back and no way to cancel it.
    fn launch(&self, config: &NotifierConfig) -> Result<(), LaunchError>;
}

/// Launcher that never starts anything
#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

impl Launcher for Disabled {
    fn launch(&self, _config: &NotifierConfig) -> Result<(), LaunchError> {
        debug!("Check runner disabled");
        Ok(())
    }
}

/// Launches `<program> [leading args] __update-notifier-check <payload>` as a
/// detached child with null stdio. The GitHub token, if any, is passed in
/// [`GITHUB_TOKEN_ENV_VAR`] and never appears in the arguments.
#[derive(Debug, Clone)]
pub struct DetachedProcess {
    program: PathBuf,
    leading_args: Vec<String>,
}

impl DetachedProcess {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Re-execute the running binary; the host must call [`intercept`] first
    /// thing in `main`
    pub fn current_exe() -> Result<Self, LaunchError> {
        std::env::current_exe()
            .map(Self::new)
            .map_err(LaunchError::CurrentExe)
    }

    /// Arguments placed before the runner argument
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    fn command(&self, payload: &str, github_token: Option<&str>) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg(RUNNER_ARG)
            .arg(payload)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match github_token {
            Some(token) => command.env(GITHUB_TOKEN_ENV_VAR, token),
            None => command.env_remove(GITHUB_TOKEN_ENV_VAR),
        };

        // Keep the child out of the terminal's foreground group so Ctrl-C in
        // the host does not reach it
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        command
    }
}

impl Launcher for DetachedProcess {
    fn launch(&self, config: &NotifierConfig) -> Result<(), LaunchError> {
        let payload = config.to_json()?;
        let child = self
            .command(&payload, config.github_token.as_deref())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        debug!("Spawned check runner pid {}", child.id());
        // Dropping the handle neither waits for nor kills the child
        drop(child);
        Ok(())
    }
}

/// What a runner pass ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Lookup succeeded and the result was stored as pending
    Recorded(UpdateInfo),
    /// Lookup failed; only the timestamp was stamped
    LookupFailed,
    /// The store could not be written
    StoreFailed,
    /// The runner could not parse its config
    InvalidPayload,
}

/// Fetch, classify and record one check. Never fails.
pub async fn run_check(
    config: &NotifierConfig,
    registry: &dyn Registry,
    store: &dyn StateStore,
) -> CheckOutcome {
    let key = config.state_key();

    let (update, outcome) = match fetch_update(config, registry).await {
        Ok(update) => {
            info!(
                "{} {} -> {} ({})",
                update.name, update.current, update.latest, update.change_kind
            );
            (Some(update.clone()), CheckOutcome::Recorded(update))
        }
        Err(e) => {
            warn!("Update check for {} failed: {}", config.package_name, e);
            (None, CheckOutcome::LookupFailed)
        }
    };

    match store.record_check(&key, current_timestamp_ms(), update) {
        Ok(()) => outcome,
        Err(e) => {
            error!("Failed to record update check for {}: {}", key, e);
            CheckOutcome::StoreFailed
        }
    }
}

/// Parse the runner payload, taking the token from the environment value
fn runner_config(
    payload: &str,
    github_token: Option<String>,
) -> Result<NotifierConfig, ConfigError> {
    let mut config = NotifierConfig::from_json(payload)?;
    config.github_token = github_token.filter(|token| !token.is_empty());
    Ok(config)
}

/// Entry point of the runner process for a raw payload
pub fn run_payload(payload: &str) -> CheckOutcome {
    let _guard = logging::init_file_logging(&log_path()).ok();

    let config = match runner_config(payload, std::env::var(GITHUB_TOKEN_ENV_VAR).ok()) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid runner payload: {}", e);
            return CheckOutcome::InvalidPayload;
        }
    };

    let store = match SqliteStateStore::open(&state_db_path()) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open state store: {}", e);
            return CheckOutcome::StoreFailed;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return CheckOutcome::LookupFailed;
        }
    };

    runtime.block_on(async {
        match registries::resolve(&config) {
            Ok(registry) => run_check(&config, registry.as_ref(), &store).await,
            Err(e) => {
                warn!("Failed to build registry client: {}", e);
                match store.record_check(&config.state_key(), current_timestamp_ms(), None) {
                    Ok(()) => CheckOutcome::LookupFailed,
                    Err(_) => CheckOutcome::StoreFailed,
                }
            }
        }
    })
}

/// Payload if `args` (program name first) invoke the runner.
///
/// Arguments need not be valid UTF-8; only the payload is converted.
pub fn runner_payload<I>(args: I) -> Option<String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter().skip(1);
    if args.next()? != RUNNER_ARG {
        return None;
    }
    args.next()?.into_string().ok()
}

/// Turn this process into the check runner when launched as one.
///
/// Call first thing in the host's `main`. Returns immediately for normal
/// invocations; otherwise runs the check and exits the process.
pub fn intercept() {
    if let Some(payload) = runner_payload(std::env::args_os()) {
        run_payload(&payload);
        std::process::exit(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryKind;
    use crate::error::StoreError;
    use crate::state::MockStateStore;
    use crate::version::error::RegistryError;
    use crate::version::registry::MockRegistry;
    use crate::version::types::ChangeKind;
    use serial_test::serial;
    use std::ffi::OsStr;
    use tempfile::TempDir;

    fn config() -> NotifierConfig {
        NotifierConfig::builder("foo", "1.0.0").build().unwrap()
    }

    fn registry(result: Result<&'static str, ()>) -> MockRegistry {
        let mut registry = MockRegistry::new();
        registry.expect_kind().return_const(RegistryKind::Npm);
        registry.expect_fetch_latest().times(1).returning(move |name| {
            result
                .map(str::to_string)
                .map_err(|_| RegistryError::NotFound(name.to_string()))
        });
        registry
    }

    #[tokio::test]
    async fn run_check_records_update_and_timestamp() {
        let store = SqliteStateStore::in_memory().unwrap();
        store.load("notifier-state-foo", 0).unwrap();
        let before = current_timestamp_ms();

        let outcome = run_check(&config(), &registry(Ok("1.2.0")), &store).await;

        let expected = UpdateInfo {
            current: "1.0.0".to_string(),
            latest: "1.2.0".to_string(),
            change_kind: ChangeKind::Minor,
            name: "foo".to_string(),
        };
        assert_eq!(outcome, CheckOutcome::Recorded(expected.clone()));
        let state = store.load("notifier-state-foo", 0).unwrap();
        assert_eq!(state.pending_update, Some(expected));
        assert!(state.last_update_check >= before);
    }

    #[tokio::test]
    async fn run_check_records_same_version_as_latest() {
        let store = SqliteStateStore::in_memory().unwrap();

        run_check(&config(), &registry(Ok("1.0.0")), &store).await;

        let pending = store.load("notifier-state-foo", 0).unwrap().pending_update;
        assert_eq!(pending.map(|u| u.change_kind), Some(ChangeKind::Latest));
    }

    #[tokio::test]
    async fn run_check_stamps_timestamp_on_lookup_failure() {
        let store = SqliteStateStore::in_memory().unwrap();
        store.load("notifier-state-foo", 0).unwrap();

        let outcome = run_check(&config(), &registry(Err(())), &store).await;

        assert_eq!(outcome, CheckOutcome::LookupFailed);
        let state = store.load("notifier-state-foo", 0).unwrap();
        assert_eq!(state.pending_update, None);
        assert!(state.last_update_check > 0);
    }

    #[tokio::test]
    async fn run_check_reports_store_failure() {
        let mut store = MockStateStore::new();
        store
            .expect_record_check()
            .times(1)
            .returning(|_, _, _| Err(StoreError::LockPoisoned));

        let outcome = run_check(&config(), &registry(Ok("1.2.0")), &store).await;

        assert_eq!(outcome, CheckOutcome::StoreFailed);
    }

    fn os_args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn runner_payload_requires_runner_arg_first() {
        assert_eq!(
            runner_payload(os_args(&["tool", RUNNER_ARG, "{}"])),
            Some("{}".to_string())
        );
        assert_eq!(runner_payload(os_args(&["tool", "build", RUNNER_ARG])), None);
        assert_eq!(runner_payload(os_args(&["tool", RUNNER_ARG])), None);
        assert_eq!(runner_payload(os_args(&["tool"])), None);
    }

    #[cfg(unix)]
    #[test]
    fn runner_payload_tolerates_non_utf8_arguments() {
        use std::os::unix::ffi::OsStringExt;

        let file = OsString::from_vec(b"file-\xff".to_vec());

        assert_eq!(
            runner_payload(vec![OsString::from("tool"), file.clone()]),
            None
        );
        assert_eq!(
            runner_payload(vec![OsString::from("tool"), OsString::from(RUNNER_ARG), file]),
            None
        );
    }

    #[test]
    fn detached_command_discards_stdio_and_passes_payload() {
        let process = DetachedProcess::new("/usr/bin/tool").with_leading_args(["--quiet"]);

        let command = process.command("{\"packageName\":\"foo\"}", None);

        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(command.get_program(), OsStr::new("/usr/bin/tool"));
        assert_eq!(
            args,
            vec![
                OsStr::new("--quiet"),
                OsStr::new(RUNNER_ARG),
                OsStr::new("{\"packageName\":\"foo\"}"),
            ]
        );
    }

    #[test]
    fn launch_reports_missing_program() {
        let process = DetachedProcess::new("/nonexistent/update-notifier-runner");

        let result = process.launch(&config());

        assert!(matches!(result, Err(LaunchError::Spawn { .. })));
    }

    #[test]
    fn disabled_launcher_does_nothing() {
        assert!(Disabled.launch(&config()).is_ok());
    }

    #[test]
    fn detached_command_passes_token_through_environment() {
        let config = NotifierConfig::builder("stable-tag", "0.1.0")
            .github("mhkeller")
            .github_token("secret")
            .build()
            .unwrap();
        let payload = config.to_json().unwrap();

        let command = DetachedProcess::new("/usr/bin/tool").command(&payload, Some("secret"));

        assert!(
            command
                .get_args()
                .all(|arg| !arg.to_string_lossy().contains("secret"))
        );
        let envs: Vec<(&OsStr, Option<&OsStr>)> = command.get_envs().collect();
        assert_eq!(
            envs,
            vec![(OsStr::new(GITHUB_TOKEN_ENV_VAR), Some(OsStr::new("secret")))]
        );
    }

    #[test]
    fn runner_config_takes_token_from_environment_value() {
        let payload = r#"{"packageName":"stable-tag","packageVersion":"0.1.0","registry":"github","githubOwner":"mhkeller"}"#;

        let with_token = runner_config(payload, Some("secret".to_string())).unwrap();
        let empty_token = runner_config(payload, Some(String::new())).unwrap();

        assert_eq!(with_token.github_token.as_deref(), Some("secret"));
        assert_eq!(empty_token.github_token, None);
    }

    /// Run `f` with `XDG_CONFIG_HOME` pointing at `dir`, restoring it afterwards
    fn with_config_home<T>(dir: &std::path::Path, f: impl FnOnce() -> T) -> T {
        let previous = std::env::var_os("XDG_CONFIG_HOME");
        // SAFETY: callers are #[serial] with every other test touching the environment
        unsafe { std::env::set_var("XDG_CONFIG_HOME", dir) };
        let result = f();
        match previous {
            Some(value) => unsafe { std::env::set_var("XDG_CONFIG_HOME", value) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
        result
    }

    fn runner_args(config: &NotifierConfig) -> Vec<OsString> {
        let payload = config.to_json().unwrap();
        os_args(&["tool", RUNNER_ARG, payload.as_str()])
    }

    #[test]
    #[serial]
    fn run_payload_records_update_where_the_host_reads_it() {
        let temp_dir = TempDir::new().unwrap();
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/foo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"foo","dist-tags":{"latest":"1.2.0"}}"#)
            .create();
        let config = NotifierConfig::builder("foo", "1.0.0")
            .registry_url(server.url())
            .build()
            .unwrap();

        let (outcome, db_path) = with_config_home(temp_dir.path(), || {
            let outcome = runner_payload(runner_args(&config)).map(|payload| run_payload(&payload));
            (outcome, state_db_path())
        });

        mock.assert();
        let expected = UpdateInfo {
            current: "1.0.0".to_string(),
            latest: "1.2.0".to_string(),
            change_kind: ChangeKind::Minor,
            name: "foo".to_string(),
        };
        assert_eq!(outcome, Some(CheckOutcome::Recorded(expected.clone())));
        assert_eq!(
            db_path,
            temp_dir.path().join("update-notifier").join("state.db")
        );
        let state = SqliteStateStore::open(&db_path)
            .unwrap()
            .load("notifier-state-foo", 0)
            .unwrap();
        assert_eq!(state.pending_update, Some(expected));
        assert!(state.last_update_check > 0);
    }

    #[test]
    #[serial]
    fn run_payload_stamps_timestamp_when_lookup_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/foo").with_status(404).create();
        let config = NotifierConfig::builder("foo", "1.0.0")
            .registry_url(server.url())
            .build()
            .unwrap();
        let before = current_timestamp_ms();

        let (outcome, db_path) = with_config_home(temp_dir.path(), || {
            (run_payload(&config.to_json().unwrap()), state_db_path())
        });

        mock.assert();
        assert_eq!(outcome, CheckOutcome::LookupFailed);
        let state = SqliteStateStore::open(&db_path)
            .unwrap()
            .load("notifier-state-foo", 0)
            .unwrap();
        assert_eq!(state.pending_update, None);
        assert!(state.last_update_check >= before);
    }

    #[test]
    #[serial]
    fn run_payload_rejects_invalid_payload() {
        let temp_dir = TempDir::new().unwrap();

        let outcome =
            with_config_home(temp_dir.path(), || run_payload(r#"{"packageName":"foo"}"#));

        assert_eq!(outcome, CheckOutcome::InvalidPayload);
    }
}
