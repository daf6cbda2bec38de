//! State store and launcher test utilities

use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use update_notifier::NotifierConfig;
use update_notifier::error::LaunchError;
use update_notifier::notifier::environment::Environment;
use update_notifier::runner::Launcher;
use update_notifier::state::{SqliteStateStore, StateStore};

/// SQLite store in a temporary directory; reopen it to simulate a new process
pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn open(&self) -> Arc<dyn StateStore> {
        Arc::new(SqliteStateStore::open(&self.dir.path().join("state.db")).unwrap())
    }
}

/// Launcher remembering every config it was asked to start
#[derive(Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<NotifierConfig>>,
}

impl RecordingLauncher {
    pub fn launched(&self) -> Vec<NotifierConfig> {
        self.launched.lock().unwrap().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, config: &NotifierConfig) -> Result<(), LaunchError> {
        self.launched.lock().unwrap().push(config.clone());
        Ok(())
    }
}

/// Interactive terminal with no escape hatches set
pub fn terminal() -> Environment {
    Environment {
        interactive: true,
        ..Environment::default()
    }
}
