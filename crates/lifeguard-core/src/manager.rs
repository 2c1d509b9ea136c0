//! The orchestrator: owns the validated graph and the module set, starts
//! modules in dependency order, runs them concurrently, detects the
//! first failure, and drives an ordered, deadline-bounded shutdown.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::graph::{Backbone, DependencyGraph};
use crate::module::{Module, ModuleFailure, ModuleState};
use crate::registry::ServiceRegistry;

/// Cloneable handle for observing and stopping a running [`Manager`].
#[derive(Clone)]
pub struct ManagerHandle {
    shutdown: CancellationToken,
    reason: Arc<Mutex<Option<String>>>,
    states: Arc<BTreeMap<String, watch::Receiver<ModuleState>>>,
}

impl ManagerHandle {
    /// Request a graceful shutdown.
    ///
    /// Idempotent: the first recorded reason wins and later calls are
    /// no-ops.
    pub fn shutdown(&self, reason: impl Into<String>) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let mut slot = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(reason.into());
        }
        drop(slot);
        self.shutdown.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Current state of one module, or `None` for unknown names
    /// (including disabled services, which never become modules).
    pub fn module_state(&self, module: &str) -> Option<ModuleState> {
        self.states.get(module).map(|rx| *rx.borrow())
    }

    /// Names of every module in the graph.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }
}

/// The background-service lifecycle orchestrator.
///
/// Built from an explicit registry and a backbone description, the
/// manager wraps every enabled service into a module, starts modules so
/// that a module only starts after all its prerequisites are `Running`,
/// then blocks until an external shutdown request or the first module
/// failure. Shutdown stops modules in exact reverse of the start order
/// (a module is only asked to stop once every module depending on it is
/// terminal), bounded by the configured deadline.
pub struct Manager {
    config: OrchestratorConfig,
    graph: DependencyGraph,
    modules: BTreeMap<String, Module>,
    shutdown: CancellationToken,
    reason: Arc<Mutex<Option<String>>>,
    failure_tx: mpsc::UnboundedSender<ModuleFailure>,
    failure_rx: mpsc::UnboundedReceiver<ModuleFailure>,
}

impl Manager {
    /// Validate the configuration, build the graph from the enabled
    /// services, and wrap every graph node in a module.
    ///
    /// Fails with a configuration error before anything is started; no
    /// partial startup is ever attempted.
    pub fn new(
        config: OrchestratorConfig,
        registry: &ServiceRegistry,
        backbone: &Backbone,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let enabled = registry.enabled();
        let service_names: Vec<String> =
            enabled.iter().map(|s| s.name().to_string()).collect();
        let graph = DependencyGraph::build(backbone, &service_names)?;

        let mut modules = BTreeMap::new();
        for name in graph.modules() {
            let service = enabled.iter().find(|s| s.name() == name).cloned();
            modules.insert(name.clone(), Module::new(name.clone(), service));
        }

        let (failure_tx, failure_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            graph,
            modules,
            shutdown: CancellationToken::new(),
            reason: Arc::new(Mutex::new(None)),
            failure_tx,
            failure_rx,
        })
    }

    /// Get a handle for external shutdown control and state observation.
    #[must_use]
    pub fn handle(&self) -> ManagerHandle {
        let states = self
            .modules
            .iter()
            .map(|(name, module)| (name.clone(), module.watch()))
            .collect();
        ManagerHandle {
            shutdown: self.shutdown.clone(),
            reason: Arc::clone(&self.reason),
            states: Arc::new(states),
        }
    }

    /// Start every module and block until shutdown completes.
    ///
    /// Returns `Ok(())` when an externally requested shutdown completed
    /// cleanly. Otherwise returns the first module failure wrapped with
    /// that module's name, or a timeout error if the stop cascade did
    /// not finish before the deadline (still-running services are asked
    /// to stop but never killed). Failures past the first are logged
    /// only.
    pub async fn run(mut self) -> Result<(), OrchestratorError> {
        info!(
            modules = self.modules.len(),
            "starting modules in dependency order"
        );

        let order: Vec<String> = self.graph.start_order().to_vec();
        for name in &order {
            let prerequisites: Vec<(String, watch::Receiver<ModuleState>)> = self
                .graph
                .prerequisites(name)
                .iter()
                .filter_map(|p| self.modules.get(p).map(|m| (p.clone(), m.watch())))
                .collect();
            if let Some(module) = self.modules.get_mut(name) {
                module.start(prerequisites, self.failure_tx.clone());
            }
        }

        // Block until an external shutdown request or the first failure.
        let first_failure = tokio::select! {
            () = self.shutdown.cancelled() => None,
            Some(failure) = self.failure_rx.recv() => Some(failure),
        };

        let reason = match &first_failure {
            Some(failure) => {
                error!(
                    module = %failure.module,
                    error = %failure.error,
                    "module failed, stopping all modules"
                );
                format!("module '{}' failed", failure.module)
            }
            None => self
                .reason
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .unwrap_or_else(|| "shutdown requested".to_string()),
        };

        // Raise the shared signal exactly once; harmless if the external
        // request already did.
        self.shutdown.cancel();

        let deadline = self.config.shutdown_deadline;
        let timed_out = tokio::time::timeout(deadline, self.stop_all(&reason))
            .await
            .is_err();

        // Failures past the first are never surfaced, only logged.
        self.failure_rx.close();
        while let Ok(failure) = self.failure_rx.try_recv() {
            warn!(
                module = %failure.module,
                error = %failure.error,
                "module failed during shutdown"
            );
        }

        if timed_out {
            warn!(?deadline, "shutdown deadline elapsed with modules still running");
            for (name, module) in &self.modules {
                if !module.state().is_terminal() {
                    warn!(module = %name, state = %module.state(), "module did not stop in time");
                    // Best effort: the stuck task is signalled, never aborted.
                    module.stop(&reason);
                }
            }
        } else {
            info!("all modules stopped");
        }

        match first_failure {
            Some(failure) => Err(OrchestratorError::ServiceFailed {
                name: failure.module,
                source: failure.error,
            }),
            None if timed_out => Err(OrchestratorError::ShutdownTimeout(deadline)),
            None => Ok(()),
        }
    }

    /// Stop modules in exact reverse of the start order.
    ///
    /// Reverse topological order guarantees every dependent of a module
    /// appears earlier in the walk, and each stop is awaited before the
    /// next, so a module is only asked to stop once everything that
    /// depends on it is terminal.
    async fn stop_all(&self, reason: &str) {
        info!(reason, "stopping modules in reverse start order");
        for name in self.graph.stop_order() {
            let Some(module) = self.modules.get(name) else {
                continue;
            };
            if module.state().is_terminal() {
                debug!(module = %name, state = %module.state(), "module already terminal");
                continue;
            }
            module.stop(reason);
            module.await_terminated().await;
        }
    }
}

/// Wait for Ctrl+C and ask the manager to shut down.
///
/// Hosts that want signal-driven shutdown spawn this next to `run()`:
///
/// ```no_run
/// # use lifeguard_core::{Backbone, Manager, OrchestratorConfig, ServiceRegistry};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = ServiceRegistry::new();
/// let backbone = Backbone::new("core", "background");
/// let manager = Manager::new(OrchestratorConfig::default(), &registry, &backbone)?;
/// tokio::spawn(lifeguard_core::shutdown_on_ctrl_c(manager.handle()));
/// manager.run().await?;
/// # Ok(())
/// # }
/// ```
pub async fn shutdown_on_ctrl_c(handle: ManagerHandle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupt received, initiating shutdown");
            handle.shutdown("interrupt received");
        }
        Err(e) => error!("failed to listen for interrupt: {e}"),
    }
}
