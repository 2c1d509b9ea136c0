use std::time::Duration;

/// Structural problems in the dependency graph.
///
/// All of these are raised synchronously by [`DependencyGraph::build`]
/// before any module is started; none of them is ever recovered
/// automatically.
///
/// [`DependencyGraph::build`]: crate::graph::DependencyGraph::build
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("dependency cycle detected through module '{0}'")]
    Cycle(String),

    #[error("module '{0}' is not a prerequisite of any other module")]
    Orphan(String),

    #[error("duplicate module name '{0}'")]
    DuplicateName(String),

    #[error("module '{module}' lists unknown prerequisite '{prerequisite}'")]
    UnknownPrerequisite { module: String, prerequisite: String },
}

/// Result of a background service's run operation.
///
/// `Cancelled` is the cancellation sentinel: a service that observed the
/// shutdown signal and unwound cleanly returns it, and every layer above
/// treats it as success. Any other variant is a genuine failure.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service observed shutdown and exited cleanly")]
    Cancelled,

    #[error("{0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Build a runtime failure from anything printable.
    pub fn runtime(message: impl Into<String>) -> Self {
        ServiceError::Runtime(message.into())
    }

    /// Whether this is the cancellation sentinel rather than a real failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ServiceError::Cancelled)
    }
}

/// Errors surfaced by the manager and the fan-out runner.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("service '{name}' failed: {source}")]
    ServiceFailed {
        name: String,
        #[source]
        source: ServiceError,
    },

    #[error("shutdown deadline of {0:?} exceeded")]
    ShutdownTimeout(Duration),
}
