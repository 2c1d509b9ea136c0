//! Dependency-less fan-out execution: start every enabled service
//! concurrently against one shared cancellation signal, fail fast on the
//! first genuine error, and wait for every sibling to unwind.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{OrchestratorError, ServiceError};
use crate::service::BackgroundService;

/// Run an unordered set of services until shutdown or first failure.
///
/// Disabled services are filtered out up front. Every remaining service
/// receives the same child token of `shutdown`, so both an external
/// cancel and the internal fail-fast path stop all siblings. The first
/// non-cancellation error wins and is returned wrapped with the
/// originating service's name; cancellation sentinels are success. The
/// call returns only once every service has finished; no ordering is
/// guaranteed between them.
pub async fn run_services(
    services: Vec<Arc<dyn BackgroundService>>,
    shutdown: CancellationToken,
) -> Result<(), OrchestratorError> {
    let cancel = shutdown.child_token();
    let mut tasks = JoinSet::new();

    for service in services {
        if service.disabled() {
            debug!(service = service.name(), "skipping disabled service");
            continue;
        }
        let token = cancel.clone();
        tasks.spawn(async move {
            let name = service.name().to_string();
            let result = service.run(token).await;
            (name, result)
        });
    }

    let mut first_failure: Option<(String, ServiceError)> = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(()))) => {
                debug!(service = %name, "service completed");
            }
            Ok((name, Err(err))) if err.is_cancellation() => {
                debug!(service = %name, "service observed shutdown");
            }
            Ok((name, Err(err))) => {
                if first_failure.is_none() {
                    error!(service = %name, error = %err, "service failed, cancelling siblings");
                    cancel.cancel();
                    first_failure = Some((name, err));
                } else {
                    warn!(service = %name, error = %err, "service failed during shutdown");
                }
            }
            Err(join_err) => {
                error!("service task panicked: {join_err}");
            }
        }
    }

    match first_failure {
        Some((name, source)) => Err(OrchestratorError::ServiceFailed { name, source }),
        None => Ok(()),
    }
}
