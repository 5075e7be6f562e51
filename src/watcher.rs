//! Polls a submitted job until it reaches a terminal phase.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cluster::{ClusterError, ClusterJobClient};
use crate::job::{JobHandle, JobPhase};

/// How to wait between polls and for how long overall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    /// `None` polls forever, the historical behavior. Callers that need a
    /// bound on worst-case blocking set a deadline and get
    /// [`WatchOutcome::TimedOut`] past it.
    pub max_wait: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_wait: None,
        }
    }
}

impl WaitPolicy {
    pub fn bounded(poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            poll_interval,
            max_wait: Some(max_wait),
        }
    }
}

/// Why the watch loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Succeeded,
    Failed,
    /// The pod disappeared mid-watch. Success cannot be confirmed, so this
    /// is terminal and maps to a failed cleanup.
    Vanished,
    TimedOut,
    Cancelled,
}

/// Poll `handle` until it reaches a terminal phase.
///
/// Non-terminal phases (Pending, Running, Unknown, anything unrecognized)
/// sleep one poll interval and retry. The sleep races the cancellation
/// token, so cancellation is observed within one interval. Transport errors
/// other than not-found propagate to the caller.
pub async fn wait_for_terminal(
    client: &dyn ClusterJobClient,
    handle: &JobHandle,
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> Result<WatchOutcome, ClusterError> {
    let deadline = policy.max_wait.map(|max| Instant::now() + max);
    loop {
        if cancel.is_cancelled() {
            return Ok(WatchOutcome::Cancelled);
        }

        let status = match client.get(&handle.namespace, &handle.name).await {
            Ok(status) => status,
            Err(ClusterError::NotFound(_)) => {
                warn!(pod = %handle, "cleanup pod vanished before reaching a terminal phase");
                return Ok(WatchOutcome::Vanished);
            }
            Err(err) => return Err(err),
        };

        match status.phase {
            JobPhase::Succeeded => return Ok(WatchOutcome::Succeeded),
            JobPhase::Failed => {
                info!(pod = %handle, "cleanup pod reported a failed phase");
                return Ok(WatchOutcome::Failed);
            }
            _ => {}
        }

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                warn!(pod = %handle, phase = %status.raw_phase, "gave up waiting for a terminal phase");
                return Ok(WatchOutcome::TimedOut);
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(WatchOutcome::Cancelled),
            _ = tokio::time::sleep(policy.poll_interval) => {}
        }
    }
}
