//! Shared mock services for unit tests.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::service::BackgroundService;

/// Append-only record of service activity, shared across mocks.
#[derive(Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.snapshot().iter().position(|e| e == entry)
    }
}

pub(crate) enum Behavior {
    /// Block on the shutdown token, then return the sentinel.
    BlockUntilShutdown,
    /// Return a runtime error after the delay (or the sentinel if
    /// shutdown fires first).
    FailAfter(Duration),
    /// Return `Ok(())` after the delay without waiting for shutdown.
    ExitCleanAfter(Duration),
    /// Observe shutdown but keep running for the delay before unwinding.
    IgnoreShutdownFor(Duration),
}

pub(crate) struct RecordingService {
    name: &'static str,
    behavior: Behavior,
    events: EventLog,
    disabled: bool,
}

impl RecordingService {
    pub fn new(name: &'static str, behavior: Behavior, events: EventLog) -> Self {
        Self {
            name,
            behavior,
            events,
            disabled: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

#[async_trait]
impl BackgroundService for RecordingService {
    fn name(&self) -> &str {
        self.name
    }

    fn disabled(&self) -> bool {
        self.disabled
    }

    async fn run(&self, shutdown: CancellationToken) -> Result<(), ServiceError> {
        self.events.push(format!("start:{}", self.name));
        match self.behavior {
            Behavior::BlockUntilShutdown => {
                shutdown.cancelled().await;
                self.events.push(format!("stop:{}", self.name));
                Err(ServiceError::Cancelled)
            }
            Behavior::FailAfter(delay) => {
                tokio::select! {
                    () = sleep(delay) => Err(ServiceError::runtime("boom")),
                    () = shutdown.cancelled() => {
                        self.events.push(format!("stop:{}", self.name));
                        Err(ServiceError::Cancelled)
                    }
                }
            }
            Behavior::ExitCleanAfter(delay) => {
                sleep(delay).await;
                self.events.push(format!("done:{}", self.name));
                Ok(())
            }
            Behavior::IgnoreShutdownFor(delay) => {
                shutdown.cancelled().await;
                sleep(delay).await;
                self.events.push(format!("stop:{}", self.name));
                Err(ServiceError::Cancelled)
            }
        }
    }
}
