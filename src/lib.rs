//! # pvc-janitor
//!
//! Cluster cleanup-job orchestrator: given a workspace identifier and a
//! shared persistent volume claim, it launches a short-lived pod that
//! removes the workspace's data, polls the pod until it reaches a terminal
//! phase, reclaims the pod, and reports the outcome.
//!
//! ## Modules
//!
//! - `command` - Builds the removal command vector executed in the pod
//! - `job` - Data model: requests, pod specs, phases, handles
//! - `cluster` - Cluster client capability, kube-backed and fake impls
//! - `watcher` - Polls a submitted job to a terminal phase
//! - `orchestrator` - Composes spec, submit, watch and reclaim
//! - `config` - Deployment configuration for cleanup pods
//! - `logging` - Tracing subscriber setup
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use pvc_janitor::{CleanupConfig, CleanupOrchestrator, KubeClientFactory};
//!
//! let orchestrator = CleanupOrchestrator::new(
//!     CleanupConfig::default(),
//!     Arc::new(KubeClientFactory::new()),
//! );
//! let outcome = orchestrator.cleanup("proj-ns", "ws-42").await?;
//! assert!(outcome.succeeded());
//! ```

pub mod cluster;
pub mod command;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod orchestrator;
pub mod watcher;

pub use cluster::{
    ClusterClientFactory, ClusterError, ClusterJobClient, FakeCluster, KubeClientFactory,
    KubeJobClient,
};
pub use config::CleanupConfig;
pub use error::CleanupError;
pub use job::{build_job_spec, CleanupRequest, JobHandle, JobPhase, JobSpec, JobStatus};
pub use orchestrator::{CleanupOrchestrator, CleanupOutcome};
pub use watcher::{wait_for_terminal, WaitPolicy, WatchOutcome};
