//! Drives one cleanup end to end: build spec, submit, watch, reclaim.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cluster::{ClusterClientFactory, ClusterError};
use crate::config::CleanupConfig;
use crate::error::CleanupError;
use crate::job::{build_job_spec, CleanupRequest};
use crate::watcher::{wait_for_terminal, WaitPolicy, WatchOutcome};

/// How a cleanup call ended.
///
/// The original behavior collapsed everything into a boolean; the distinct
/// variants let callers tell a failed cleanup apart from one that was
/// aborted or gave up waiting. [`CleanupOutcome::succeeded`] restores the
/// boolean view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl CleanupOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, CleanupOutcome::Succeeded)
    }
}

/// Orchestrates single-shot cleanup jobs against the cluster.
///
/// Each call owns exactly one pod for its duration: the pod is created after
/// the client connects and reclaimed on every exit path past creation,
/// including cancellation. Calls for the same workspace are single-flighted;
/// a second concurrent call fails fast with
/// [`CleanupError::CleanupInFlight`] instead of racing on the deterministic
/// pod name.
pub struct CleanupOrchestrator {
    config: CleanupConfig,
    clients: Arc<dyn ClusterClientFactory>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl CleanupOrchestrator {
    pub fn new(config: CleanupConfig, clients: Arc<dyn ClusterClientFactory>) -> Self {
        Self {
            config,
            clients,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Remove the workspace's data folder from the shared volume.
    ///
    /// Returns `Err` only when the request is invalid, the workspace already
    /// has a cleanup in flight, the cluster cannot be reached, or job
    /// creation is rejected. Everything the cluster reports after the pod
    /// exists resolves to a [`CleanupOutcome`].
    pub async fn cleanup(
        &self,
        namespace: &str,
        workspace_id: &str,
    ) -> Result<CleanupOutcome, CleanupError> {
        self.cleanup_with_cancel(namespace, workspace_id, &CancellationToken::new())
            .await
    }

    /// Like [`cleanup`](Self::cleanup), interruptible through `cancel`.
    ///
    /// Cancellation stops the watch within one poll interval, still
    /// best-effort deletes the pod, and returns
    /// [`CleanupOutcome::Cancelled`].
    pub async fn cleanup_with_cancel(
        &self,
        namespace: &str,
        workspace_id: &str,
        cancel: &CancellationToken,
    ) -> Result<CleanupOutcome, CleanupError> {
        let _flight = FlightGuard::acquire(&self.in_flight, workspace_id)?;

        let request = CleanupRequest {
            namespace: namespace.to_string(),
            workspace_id: workspace_id.to_string(),
            target_directories: vec![format!(
                "{workspace_id}{}",
                self.config.project_folder_path
            )],
        };
        request.validate()?;

        let spec = build_job_spec(&request, &self.config);
        info!(
            command = %spec.command[0],
            pvc = %spec.volume_claim_name,
            dirs = request.target_directories.len(),
            "executing cleanup command in PVC"
        );

        // Client connection is scoped to this call; dropped on every path.
        let client = self
            .clients
            .connect()
            .await
            .map_err(CleanupError::Infrastructure)?;

        let handle = match client.create(namespace, &spec).await {
            Ok(handle) => handle,
            Err(ClusterError::AlreadyExists(name)) => return Err(CleanupError::Conflict(name)),
            Err(err) => return Err(CleanupError::Scheduling(err)),
        };

        let policy = WaitPolicy {
            poll_interval: self.config.poll_interval,
            max_wait: self.config.max_wait,
        };
        let watched = wait_for_terminal(client.as_ref(), &handle, &policy, cancel).await;

        // The pod must not outlive this call however the watch ended.
        if let Err(err) = client.delete(namespace, &handle).await {
            warn!(pod = %handle, %err, "failed to reclaim cleanup pod");
        }

        let outcome = match watched {
            Ok(WatchOutcome::Succeeded) => CleanupOutcome::Succeeded,
            Ok(WatchOutcome::Failed) | Ok(WatchOutcome::Vanished) => CleanupOutcome::Failed,
            Ok(WatchOutcome::TimedOut) => CleanupOutcome::TimedOut,
            Ok(WatchOutcome::Cancelled) => CleanupOutcome::Cancelled,
            Err(err) => {
                // Past creation, transport problems resolve to an outcome
                // rather than crossing the boundary as raw errors.
                warn!(pod = %handle, %err, "lost track of cleanup pod");
                CleanupOutcome::Failed
            }
        };
        Ok(outcome)
    }
}

/// Holds the workspace's single-flight slot; released on drop.
struct FlightGuard {
    workspace_id: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl FlightGuard {
    fn acquire(
        in_flight: &Arc<Mutex<HashSet<String>>>,
        workspace_id: &str,
    ) -> Result<Self, CleanupError> {
        let mut slots = in_flight.lock().expect("in-flight set poisoned");
        if !slots.insert(workspace_id.to_string()) {
            return Err(CleanupError::CleanupInFlight(workspace_id.to_string()));
        }
        Ok(Self {
            workspace_id: workspace_id.to_string(),
            in_flight: Arc::clone(in_flight),
        })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .expect("in-flight set poisoned")
            .remove(&self.workspace_id);
    }
}
