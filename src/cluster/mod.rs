//! Cluster client abstraction.
//!
//! The orchestrator only needs three operations against the cluster API —
//! create a pod, read its phase, delete it — plus a way to acquire a
//! connection scoped to one cleanup call. Keeping that surface behind a
//! trait lets tests drive the orchestrator with an in-memory cluster.

use async_trait::async_trait;
use thiserror::Error;

use crate::job::{JobHandle, JobSpec, JobStatus};

pub mod kube;
pub mod mock;

pub use self::kube::{KubeClientFactory, KubeJobClient};
pub use self::mock::FakeCluster;

/// Errors reported by a cluster client.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// The cluster API is unreachable or the client cannot be built.
    #[error("cannot reach the cluster API: {0}")]
    Connectivity(String),

    /// A resource with the same name already exists (conflict, possibly
    /// retryable once the previous pod is reclaimed).
    #[error("resource {0} already exists")]
    AlreadyExists(String),

    /// The resource no longer exists, e.g. deleted externally mid-watch.
    #[error("resource {0} not found")]
    NotFound(String),

    /// The cluster rejected the request: malformed spec, quota exceeded,
    /// admission failure.
    #[error("cluster rejected the request: {0}")]
    Scheduling(String),

    /// Any other API-level failure.
    #[error("cluster API error: {0}")]
    Api(String),
}

/// Capability over the cluster API, scoped to pod-like job resources.
#[async_trait]
pub trait ClusterJobClient: Send + Sync {
    /// Submit a job pod. Fails with [`ClusterError::AlreadyExists`] on a
    /// name conflict and [`ClusterError::Scheduling`] on other rejections.
    async fn create(&self, namespace: &str, spec: &JobSpec) -> Result<JobHandle, ClusterError>;

    /// Fetch the current status of a pod by name.
    async fn get(&self, namespace: &str, name: &str) -> Result<JobStatus, ClusterError>;

    /// Delete a pod. Idempotent: deleting an already-deleted pod is `Ok`.
    async fn delete(&self, namespace: &str, handle: &JobHandle) -> Result<(), ClusterError>;
}

/// Acquires a cluster client scoped to one cleanup call.
///
/// Release is `Drop`: the orchestrator holds the boxed client for the
/// duration of a call and drops it on every exit path.
#[async_trait]
pub trait ClusterClientFactory: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ClusterJobClient>, ClusterError>;
}
