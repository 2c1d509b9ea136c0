//! The module state adapter: wraps one background service (or nothing,
//! for aggregate nodes) into a uniform six-state lifecycle the manager
//! can drive and observe.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::ServiceError;
use crate::service::BackgroundService;

/// Lifecycle state of one module.
///
/// `New` is initial; `Terminated` and `Failed` are terminal. The state
/// is owned exclusively by the module's driver task and published
/// through a watch channel for the manager and external observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    New,
    Starting,
    Running,
    Stopping,
    Terminated,
    Failed,
}

impl ModuleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ModuleState::Terminated | ModuleState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleState::New => "new",
            ModuleState::Starting => "starting",
            ModuleState::Running => "running",
            ModuleState::Stopping => "stopping",
            ModuleState::Terminated => "terminated",
            ModuleState::Failed => "failed",
        }
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A genuine (non-cancellation) failure reported to the manager.
#[derive(Debug)]
pub(crate) struct ModuleFailure {
    pub module: String,
    pub error: ServiceError,
}

/// One node of the running graph.
///
/// Concrete modules wrap exactly one service; aggregate modules wrap
/// nothing and exist purely as ordering barriers. Each module holds its
/// own cancellation token (its view of the orchestration-wide shutdown
/// signal) so the stop cascade can be strictly ordered.
pub(crate) struct Module {
    name: String,
    service: Option<Arc<dyn BackgroundService>>,
    state_tx: Arc<watch::Sender<ModuleState>>,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

/// Publish a state transition and emit the lifecycle event.
///
/// Terminal states are sticky; re-entering the current state is a no-op.
fn advance(
    state_tx: &watch::Sender<ModuleState>,
    name: &str,
    next: ModuleState,
    failure: Option<&ServiceError>,
) {
    let prev = *state_tx.borrow();
    if prev == next || prev.is_terminal() {
        return;
    }
    state_tx.send_replace(next);
    match failure {
        Some(err) => error!(
            module = name,
            from = prev.as_str(),
            to = next.as_str(),
            error = %err,
            "module failed"
        ),
        None => debug!(
            module = name,
            from = prev.as_str(),
            to = next.as_str(),
            "module state changed"
        ),
    }
}

impl Module {
    pub(crate) fn new(name: String, service: Option<Arc<dyn BackgroundService>>) -> Self {
        let (state_tx, _state_rx) = watch::channel(ModuleState::New);
        Self {
            name,
            service,
            state_tx: Arc::new(state_tx),
            cancel: CancellationToken::new(),
            driver: None,
        }
    }

    pub(crate) fn state(&self) -> ModuleState {
        *self.state_tx.borrow()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<ModuleState> {
        self.state_tx.subscribe()
    }

    /// Spawn the module's driver task.
    ///
    /// The driver holds in `New` until every prerequisite reports
    /// `Running`, then transitions `New → Starting → Running` (no setup
    /// work is modeled at this layer) and awaits the wrapped service.
    /// Well-behaved services keep `Running` until shutdown, so polling a
    /// prerequisite's watch for `Running` cannot miss it.
    pub(crate) fn start(
        &mut self,
        prerequisites: Vec<(String, watch::Receiver<ModuleState>)>,
        failures: mpsc::UnboundedSender<ModuleFailure>,
    ) {
        let name = self.name.clone();
        let service = self.service.clone();
        let state_tx = Arc::clone(&self.state_tx);
        let cancel = self.cancel.clone();

        self.driver = Some(tokio::spawn(async move {
            for (prereq, mut rx) in prerequisites {
                tokio::select! {
                    () = cancel.cancelled() => {
                        // Shutdown before this module ever started.
                        advance(&state_tx, &name, ModuleState::Terminated, None);
                        return;
                    }
                    changed = rx.wait_for(|state| *state == ModuleState::Running) => {
                        if changed.is_err() {
                            // Prerequisite dropped without ever running.
                            advance(&state_tx, &name, ModuleState::Terminated, None);
                            return;
                        }
                        debug!(module = %name, prerequisite = %prereq, "prerequisite running");
                    }
                }
            }

            advance(&state_tx, &name, ModuleState::Starting, None);
            advance(&state_tx, &name, ModuleState::Running, None);

            let result = match service {
                Some(service) => service.run(cancel.clone()).await,
                None => {
                    // Aggregates have no work of their own; they park
                    // until shutdown and act purely as ordering barriers.
                    cancel.cancelled().await;
                    Err(ServiceError::Cancelled)
                }
            };

            match result {
                Err(ServiceError::Cancelled) => {
                    advance(&state_tx, &name, ModuleState::Terminated, None);
                }
                Err(err) => {
                    advance(&state_tx, &name, ModuleState::Failed, Some(&err));
                    let _ = failures.send(ModuleFailure { module: name, error: err });
                }
                Ok(()) => {
                    if !cancel.is_cancelled() {
                        // Finishing early must not look like a crash to
                        // dependents: hold Running until shutdown fires.
                        debug!(
                            module = %name,
                            "service completed early; holding Running until shutdown"
                        );
                        cancel.cancelled().await;
                    }
                    advance(&state_tx, &name, ModuleState::Terminated, None);
                }
            }
        }));
    }

    /// Ask the module to stop.
    ///
    /// The transition to `Stopping` is bookkeeping; the actual unwinding
    /// happens inside the blocked run call once it observes the token.
    pub(crate) fn stop(&self, reason: &str) {
        if self.state() == ModuleState::Running {
            advance(&self.state_tx, &self.name, ModuleState::Stopping, None);
        }
        debug!(module = %self.name, reason, "asking module to stop");
        self.cancel.cancel();
    }

    /// Wait until the module reaches a terminal state.
    pub(crate) async fn await_terminated(&self) {
        let mut rx = self.state_tx.subscribe();
        // The sender lives in self, so the channel cannot close here.
        let _ = rx.wait_for(|state| state.is_terminal()).await;
    }
}

impl Drop for Module {
    fn drop(&mut self) {
        // Signal a detached driver to unwind; the task is never aborted.
        self.cancel.cancel();
        self.driver.take();
    }
}
