use std::sync::Arc;

use tracing::debug;

use crate::service::BackgroundService;

/// Explicit collection of registered background services.
///
/// Constructed once at process start and passed by reference into the
/// [`Manager`](crate::manager::Manager); there is no ambient global list.
/// Name uniqueness is enforced when the dependency graph is built, so a
/// duplicate registration fails the whole orchestration before anything
/// starts.
#[derive(Default)]
pub struct ServiceRegistry {
    services: Vec<Arc<dyn BackgroundService>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, service: Arc<dyn BackgroundService>) {
        debug!(service = service.name(), "registered background service");
        self.services.push(service);
    }

    /// All registered services, including disabled ones.
    pub fn services(&self) -> &[Arc<dyn BackgroundService>] {
        &self.services
    }

    /// The services the orchestrator will actually drive.
    ///
    /// Disabled services are excluded entirely: never wrapped into
    /// modules, never started, never part of the dependency graph.
    pub fn enabled(&self) -> Vec<Arc<dyn BackgroundService>> {
        self.services
            .iter()
            .filter(|service| {
                if service.disabled() {
                    debug!(service = service.name(), "skipping disabled service");
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
