//! Invocation-to-invocation lifecycle: gate, runner, deferred notice

mod helper;

use std::sync::Arc;

use helper::{RecordingLauncher, TestStore, npm_server, terminal};
use update_notifier::notifier::environment::Environment;
use update_notifier::notifier::gate::{DisabledReason, GateDecision};
use update_notifier::notifier::render::{NoticeOutput, SharedBuffer};
use update_notifier::runner::{CheckOutcome, run_check};
use update_notifier::state::{StateStore, current_timestamp_ms};
use update_notifier::version::registries::NpmRegistry;
use update_notifier::{ChangeKind, NotifierConfig, NotifyOptions, UpdateInfo, UpdateNotifier};

const DAY: i64 = 24 * 60 * 60 * 1000;

fn config() -> NotifierConfig {
    NotifierConfig::builder("foo", "1.0.0").build().unwrap()
}

fn notifier(
    store: Arc<dyn StateStore>,
    launcher: Arc<RecordingLauncher>,
    environment: Environment,
    buffer: &SharedBuffer,
) -> UpdateNotifier {
    UpdateNotifier::builder(config())
        .store(Ok(store))
        .launcher(launcher)
        .environment(environment)
        .output(NoticeOutput::Buffer(buffer.clone()))
        .build()
}

#[tokio::test]
async fn update_found_by_runner_is_shown_on_next_invocation() {
    let store = TestStore::new();
    let launcher = Arc::new(RecordingLauncher::default());
    let buffer = SharedBuffer::new();
    let start = current_timestamp_ms() - 3 * DAY;

    // 1. First run only creates the state
    let mut first = notifier(store.open(), launcher.clone(), terminal(), &buffer);
    assert_eq!(first.check_at(start), GateDecision::NotDue);
    drop(first);
    assert!(launcher.launched().is_empty());

    // 2. Interval elapsed: the runner is launched
    let mut second = notifier(store.open(), launcher.clone(), terminal(), &buffer);
    assert_eq!(second.check_at(start + 2 * DAY), GateDecision::Due);
    drop(second);
    assert_eq!(launcher.launched(), vec![config()]);

    // 3. The runner records what the registry reports
    let (server, mock) = npm_server("foo", "1.2.0").await;
    let registry = NpmRegistry::new(&server.url()).unwrap();
    let outcome = run_check(&config(), &registry, store.open().as_ref()).await;
    mock.assert_async().await;
    let expected = UpdateInfo {
        current: "1.0.0".to_string(),
        latest: "1.2.0".to_string(),
        change_kind: ChangeKind::Minor,
        name: "foo".to_string(),
    };
    assert_eq!(outcome, CheckOutcome::Recorded(expected.clone()));
    assert!(buffer.contents().is_empty());

    // 4. Next run consumes it and shows it once at shutdown
    let mut third = notifier(store.open(), launcher.clone(), terminal(), &buffer);
    assert_eq!(third.check_at(current_timestamp_ms()), GateDecision::NotDue);
    assert_eq!(third.update(), Some(&expected));
    third.notify(NotifyOptions {
        on_interrupt: false,
        ..NotifyOptions::default()
    });
    assert!(buffer.contents().is_empty());
    drop(third);

    let contents = buffer.contents();
    assert_eq!(contents.matches('╭').count(), 1);
    assert!(contents.contains("Update available 1.0.0 → 1.2.0"));
    assert!(contents.contains("Run npm i -g foo to update"));
    assert_eq!(launcher.launched().len(), 1);
    let pending = store.open().load("notifier-state-foo", 0).unwrap().pending_update;
    assert_eq!(pending, None);
}

#[test]
fn pending_update_is_consumed_without_terminal() {
    let store = TestStore::new();
    let now = current_timestamp_ms();
    store
        .open()
        .record_check(
            "notifier-state-foo",
            now,
            Some(UpdateInfo {
                current: "1.0.0".to_string(),
                latest: "2.0.0".to_string(),
                change_kind: ChangeKind::Major,
                name: "foo".to_string(),
            }),
        )
        .unwrap();
    let launcher = Arc::new(RecordingLauncher::default());
    let buffer = SharedBuffer::new();

    let mut piped = notifier(store.open(), launcher.clone(), Environment::default(), &buffer);
    piped.check_at(now);
    piped.notify(NotifyOptions::immediate());
    drop(piped);

    let mut next = notifier(store.open(), launcher, terminal(), &buffer);
    next.check_at(now);
    next.notify(NotifyOptions::immediate());
    drop(next);

    assert!(buffer.contents().is_empty());
}

#[test]
fn opted_out_package_is_never_checked_or_shown() {
    let store = TestStore::new();
    let start = current_timestamp_ms() - 3 * DAY;
    store
        .open()
        .set_opt_out("notifier-state-foo", true, start)
        .unwrap();
    let launcher = Arc::new(RecordingLauncher::default());
    let buffer = SharedBuffer::new();

    let mut notifier = notifier(store.open(), launcher.clone(), terminal(), &buffer);

    assert_eq!(
        notifier.check_at(start + 2 * DAY),
        GateDecision::Disabled(DisabledReason::OptedOut)
    );
    notifier.notify(NotifyOptions::immediate());
    drop(notifier);
    assert!(launcher.launched().is_empty());
    assert!(buffer.contents().is_empty());
}

#[test]
fn disable_env_var_turns_off_checking() {
    let store = TestStore::new();
    let launcher = Arc::new(RecordingLauncher::default());
    let buffer = SharedBuffer::new();
    let environment = Environment::from_parts(
        |name| name == "NO_UPDATE_NOTIFIER",
        &["build".to_string()],
        true,
    );

    let mut notifier = notifier(store.open(), launcher.clone(), environment, &buffer);

    assert_eq!(
        notifier.check_at(current_timestamp_ms()),
        GateDecision::Disabled(DisabledReason::EnvironmentOverride)
    );
    assert!(launcher.launched().is_empty());
}
