//! Single-fire actions run during orderly shutdown
//!
//! A [`ShutdownHook`] owns one action. It runs when the hook is fired
//! explicitly, when the hook is dropped (the owner goes out of scope at the
//! end of `main`), or when Ctrl-C arrives if [`ShutdownHook::fire_on_interrupt`]
//! was called. Whichever comes first wins; the action never runs twice.
//!
//! `std::process::exit` skips destructors, so hosts exiting that way must call
//! [`ShutdownHook::fire`] (or drop the owner) first.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tokio::sync::Notify;
use tracing::{debug, warn};

type Action = Box<dyn FnOnce(ShutdownCause) + Send>;

/// Exit code used after an interrupt, as shells report for SIGINT
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// What triggered the hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    Exit,
    Interrupt,
}

pub struct ShutdownHook {
    action: Arc<Mutex<Option<Action>>>,
    /// Signalled once the action is spent, stopping the interrupt listener
    spent: Arc<Notify>,
}

impl ShutdownHook {
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce(ShutdownCause) + Send + 'static,
    {
        Self {
            action: Arc::new(Mutex::new(Some(Box::new(action)))),
            spent: Arc::new(Notify::new()),
        }
    }

    /// Run the action now unless it already ran. Returns whether it ran.
    pub fn fire(&self, cause: ShutdownCause) -> bool {
        let ran = fire_slot(&self.action, cause);
        self.spent.notify_one();
        ran
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        self.action
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Also fire on Ctrl-C, then exit with [`INTERRUPT_EXIT_CODE`].
    ///
    /// Listens on a background thread with its own single-threaded runtime,
    /// so the host does not need to run tokio. The listener stops as soon as
    /// the hook fires or drops; a Ctrl-C arriving after that is left to the
    /// host.
    pub fn fire_on_interrupt(&self) -> Option<JoinHandle<()>> {
        let slot = Arc::clone(&self.action);
        let spent = Arc::clone(&self.spent);
        let spawned = std::thread::Builder::new()
            .name("update-notifier-interrupt".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        warn!("Failed to start interrupt listener: {}", e);
                        return;
                    }
                };

                let interrupted = runtime.block_on(async {
                    tokio::select! {
                        biased;
                        _ = spent.notified() => false,
                        result = tokio::signal::ctrl_c() => result.is_ok(),
                    }
                });

                if !interrupted {
                    debug!("Interrupt listener stopped");
                    return;
                }
                // The listener replaced the default SIGINT disposition
                if fire_slot(&slot, ShutdownCause::Interrupt) {
                    std::process::exit(INTERRUPT_EXIT_CODE);
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to spawn interrupt listener: {}", e);
                None
            }
        }
    }
}

impl Drop for ShutdownHook {
    fn drop(&mut self) {
        self.fire(ShutdownCause::Exit);
    }
}

fn fire_slot(slot: &Mutex<Option<Action>>, cause: ShutdownCause) -> bool {
    // A panicking action poisons the lock; the slot is then empty anyway
    let action = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };

    match action {
        Some(action) => {
            debug!("Running shutdown action ({:?})", cause);
            action(cause);
            true
        }
        None => false,
    }
}
