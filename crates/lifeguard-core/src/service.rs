use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;

/// A long-running unit of work driven by the orchestrator.
///
/// Implementations supply a unique, stable name (the module identity in
/// the dependency graph, never derived from type introspection) and a
/// blocking `run` operation that executes until told to stop.
///
/// ## Run contract
///
/// `run` receives the module's view of the shared shutdown signal and is
/// required to observe it and return promptly once it fires. There is no
/// hard kill: a service that ignores the token only makes the bounded
/// shutdown deadline elapse.
///
/// How the return value is interpreted:
///
/// - `Err(ServiceError::Cancelled)`: the service observed shutdown and
///   unwound cleanly. This is success, not failure.
/// - any other `Err`: a genuine failure; it triggers orchestrated
///   shutdown of the whole graph.
/// - `Ok(())` *before* shutdown was signalled: the module is held in
///   `Running` until shutdown fires. Finishing early is deliberately
///   indistinguishable from still-running, so dependents are never
///   cascaded a stop because a prerequisite finished its job.
#[async_trait]
pub trait BackgroundService: Send + Sync + 'static {
    /// Unique, stable service name. Doubles as the module name.
    fn name(&self) -> &str;

    /// Disabled services are never wrapped into modules and never started.
    fn disabled(&self) -> bool {
        false
    }

    /// Execute until `shutdown` fires, the work completes, or a failure.
    async fn run(&self, shutdown: CancellationToken) -> Result<(), ServiceError>;
}
