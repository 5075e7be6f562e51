use thiserror::Error;

use crate::cluster::ClusterError;

/// Errors surfaced to callers of the cleanup orchestrator.
///
/// Only connectivity-class problems cross the boundary as hard failures;
/// everything the cluster reports after a job was submitted is resolved
/// into a [`CleanupOutcome`](crate::orchestrator::CleanupOutcome) instead.
#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("failed to connect to the cluster: {0}")]
    Infrastructure(#[source] ClusterError),

    #[error("cluster rejected the cleanup job: {0}")]
    Scheduling(#[source] ClusterError),

    #[error("a cleanup pod named {0} already exists in the cluster")]
    Conflict(String),

    #[error("a cleanup for workspace {0} is already in flight")]
    CleanupInFlight(String),

    #[error("invalid cleanup request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
