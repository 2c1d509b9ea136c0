//! # lifeguard-core
//!
//! In-process lifecycle orchestrator for long-running background
//! services: dependency-ordered startup, concurrent execution with
//! failure detection, and deadline-bounded reverse-ordered shutdown.
//!
//! ## Overview
//!
//! The host process registers its services in a [`ServiceRegistry`],
//! describes coarse startup phases in a [`Backbone`], and hands both to
//! a [`Manager`]. The manager merges the backbone with the discovered
//! services into a validated [`DependencyGraph`], wraps every node in a
//! six-state module lifecycle, and drives the whole set:
//!
//! 1. **Startup**: a module starts only after all its prerequisites are
//!    `Running`; unrelated modules start concurrently.
//! 2. **Running**: the manager blocks until an external shutdown request
//!    or the first module failure.
//! 3. **Shutdown**: modules stop in exact reverse of the start order,
//!    bounded by a configurable deadline. Services that ignore the
//!    signal are never killed; the manager just gives up on time.
//!
//! Callers that need no ordering at all use [`run_services`] instead:
//! plain fan-out with fail-fast cancellation.
//!
//! ## Architecture
//!
//! - [`service`]: the [`BackgroundService`] trait and run contract
//! - [`registry`]: explicit service registration (no global state)
//! - [`graph`]: backbone merging, validation, topological ordering
//! - [`module`]: the per-module state adapter
//! - [`manager`]: the orchestrator and its shutdown handle
//! - [`runner`]: the dependency-less fan-out mode
//! - [`config`]: deadline and log-level configuration
//! - [`error`]: the full error taxonomy

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod error;
pub mod graph;
pub mod manager;
pub mod module;
pub mod registry;
pub mod runner;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::OrchestratorConfig;
pub use error::{GraphError, OrchestratorError, ServiceError};
pub use graph::{Backbone, DependencyGraph};
pub use manager::{shutdown_on_ctrl_c, Manager, ManagerHandle};
pub use module::ModuleState;
pub use registry::ServiceRegistry;
pub use runner::run_services;
pub use service::BackgroundService;
