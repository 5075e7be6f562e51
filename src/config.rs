//! Configuration for the cleanup orchestrator.
//!
//! These values are normally supplied by the embedding application (image
//! reference, memory limit, mount path and PVC name are deployment-specific),
//! but the struct also loads from YAML for standalone use.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CleanupError;

/// Configuration for cleanup job pods and the watch loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Name of the persistent volume claim holding workspace data.
    #[serde(default = "default_pvc_name")]
    pub pvc_name: String,

    /// Mount path of the claim inside the pod. Appended verbatim to the
    /// workspace id to derive the directory to remove, so it conventionally
    /// starts with `/`.
    #[serde(default = "default_project_folder_path")]
    pub project_folder_path: String,

    /// Image for the cleanup pod. Must provide a shell with `rm`.
    #[serde(default = "default_job_image")]
    pub job_image: String,

    /// Memory limit quantity for the pod, e.g. `250Mi`. The only resource
    /// constraint set; no CPU limit and no requests.
    #[serde(default = "default_job_memory_limit")]
    pub job_memory_limit: String,

    /// Interval between status polls while waiting for a terminal phase.
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Upper bound on the total wait. `None` preserves the historical
    /// behavior of polling forever; set it to bound worst-case blocking.
    #[serde(default, with = "humantime_serde")]
    pub max_wait: Option<Duration>,
}

fn default_pvc_name() -> String {
    "workspace-data".to_string()
}

fn default_project_folder_path() -> String {
    "/projects".to_string()
}

fn default_job_image() -> String {
    "busybox:1.36".to_string()
}

fn default_job_memory_limit() -> String {
    "250Mi".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            pvc_name: default_pvc_name(),
            project_folder_path: default_project_folder_path(),
            job_image: default_job_image(),
            job_memory_limit: default_job_memory_limit(),
            poll_interval: default_poll_interval(),
            max_wait: None,
        }
    }
}

impl CleanupConfig {
    /// Load configuration from a YAML file, filling absent fields with
    /// defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, CleanupError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would produce an unschedulable pod.
    pub fn validate(&self) -> Result<(), CleanupError> {
        if self.pvc_name.is_empty() {
            return Err(CleanupError::Config("pvc_name must not be empty".into()));
        }
        if self.project_folder_path.is_empty() {
            return Err(CleanupError::Config(
                "project_folder_path must not be empty".into(),
            ));
        }
        if self.job_image.is_empty() {
            return Err(CleanupError::Config("job_image must not be empty".into()));
        }
        if !self
            .job_memory_limit
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
        {
            return Err(CleanupError::Config(format!(
                "job_memory_limit is not a quantity: {}",
                self.job_memory_limit
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(CleanupError::Config(
                "poll_interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
