//! Data model for cleanup jobs: requests, pod specs, phases and handles.

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::command::cleanup_command;
use crate::config::CleanupConfig;
use crate::error::CleanupError;

/// Prefix for the deterministic cleanup pod name.
///
/// The full name is `pvc_cleaner_pod_<workspace_id>`, so two cleanups for
/// the same workspace target the same pod name. Concurrent calls are
/// serialized per workspace by the orchestrator rather than by uniquifying
/// the name; the derived name is what operators look for in the namespace.
pub const JOB_NAME_PREFIX: &str = "pvc_cleaner_pod_";

/// A request to remove a workspace's data from the shared volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupRequest {
    pub namespace: String,
    pub workspace_id: String,
    /// Relative paths under the mount root, removed by a single pod.
    pub target_directories: Vec<String>,
}

impl CleanupRequest {
    /// Check the request invariants: at least one target directory, every
    /// entry relative, and no path-escape components.
    pub fn validate(&self) -> Result<(), CleanupError> {
        if self.target_directories.is_empty() {
            return Err(CleanupError::InvalidRequest(
                "no target directories to remove".to_string(),
            ));
        }
        for dir in &self.target_directories {
            if dir.is_empty() {
                return Err(CleanupError::InvalidRequest(
                    "empty target directory".to_string(),
                ));
            }
            if dir.starts_with('/') {
                return Err(CleanupError::InvalidRequest(format!(
                    "target directory must be relative: {dir}"
                )));
            }
            let escapes = Path::new(dir)
                .components()
                .any(|c| matches!(c, Component::ParentDir));
            if escapes {
                return Err(CleanupError::InvalidRequest(format!(
                    "target directory escapes the mount root: {dir}"
                )));
            }
        }
        Ok(())
    }
}

/// Lifecycle phase the cluster reports for a pod.
///
/// Only `Succeeded` and `Failed` are terminal; every other value, including
/// vocabulary this crate does not know about, is non-terminal and keeps the
/// watcher polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl JobPhase {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Pending" => JobPhase::Pending,
            "Running" => JobPhase::Running,
            "Succeeded" => JobPhase::Succeeded,
            "Failed" => JobPhase::Failed,
            _ => JobPhase::Unknown,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Succeeded | JobPhase::Failed)
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobPhase::Pending => "Pending",
            JobPhase::Running => "Running",
            JobPhase::Succeeded => "Succeeded",
            JobPhase::Failed => "Failed",
            JobPhase::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Point-in-time status of a submitted job, as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub phase: JobPhase,
    /// The verbatim phase string, kept for logging unrecognized values.
    pub raw_phase: String,
}

impl JobStatus {
    pub fn from_raw_phase(raw: &str) -> Self {
        Self {
            phase: JobPhase::parse(raw),
            raw_phase: raw.to_string(),
        }
    }
}

/// Identifies a submitted, not-yet-reclaimed pod resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Declarative description of the one-shot cleanup pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub mount_path: String,
    pub volume_claim_name: String,
    /// Kubernetes quantity string, e.g. `250Mi`. Memory is the only limit;
    /// the pod requests no CPU and no resource requests.
    pub memory_limit: String,
    pub privileged: bool,
    pub restart_policy: String,
}

/// Build the pod spec for a cleanup request.
///
/// Deterministic: the same request and configuration always produce an
/// identical spec, so calling this repeatedly has no side effects.
pub fn build_job_spec(request: &CleanupRequest, config: &CleanupConfig) -> JobSpec {
    JobSpec {
        name: format!("{JOB_NAME_PREFIX}{}", request.workspace_id),
        image: config.job_image.clone(),
        command: cleanup_command(&config.project_folder_path, &request.target_directories),
        mount_path: config.project_folder_path.clone(),
        volume_claim_name: config.pvc_name.clone(),
        memory_limit: config.job_memory_limit.clone(),
        privileged: false,
        // Single attempt: a failed cleanup must not be restarted by the
        // cluster; the orchestrator decides what failure means.
        restart_policy: "Never".to_string(),
    }
}
