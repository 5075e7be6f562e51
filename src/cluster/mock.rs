//! In-memory fake cluster for tests.
//!
//! Pods live in a shared state map; phase reads are scripted per pod name,
//! with the last scripted entry repeating once the script is exhausted. The
//! fake records every create and delete so tests can assert that no pod
//! outlives its cleanup call.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ClusterClientFactory, ClusterError, ClusterJobClient};
use crate::job::{JobHandle, JobPhase, JobSpec, JobStatus};

/// One scripted response to a status poll.
#[derive(Debug, Clone)]
enum FakePoll {
    Phase(JobPhase),
    /// The pod disappears: this poll and all later ones report not-found.
    Gone,
}

#[derive(Default)]
struct FakeClusterState {
    scripts: HashMap<String, VecDeque<FakePoll>>,
    live: HashSet<(String, String)>,
    creates: Vec<JobHandle>,
    deletes: Vec<JobHandle>,
    refuse_connections: bool,
    reject_creates: Option<String>,
}

/// Scriptable fake implementing both the client and the factory.
///
/// Cloning shares state, so a test can keep one handle for assertions while
/// the orchestrator drives another through the factory.
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeClusterState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the phase sequence a pod reports, one entry per poll. The
    /// final entry repeats forever.
    pub fn script_phases(&self, pod_name: &str, phases: &[JobPhase]) {
        let mut state = self.state.lock().unwrap();
        let script = state.scripts.entry(pod_name.to_string()).or_default();
        script.extend(phases.iter().map(|phase| FakePoll::Phase(*phase)));
    }

    /// After any already-scripted polls, the pod vanishes from the cluster.
    pub fn script_vanish(&self, pod_name: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .scripts
            .entry(pod_name.to_string())
            .or_default()
            .push_back(FakePoll::Gone);
    }

    /// Make `connect` fail with a connectivity error.
    pub fn refuse_connections(&self) {
        self.state.lock().unwrap().refuse_connections = true;
    }

    /// Make every `create` fail with a scheduling error.
    pub fn reject_creates(&self, reason: &str) {
        self.state.lock().unwrap().reject_creates = Some(reason.to_string());
    }

    /// Pods created so far, in order.
    pub fn creates(&self) -> Vec<JobHandle> {
        self.state.lock().unwrap().creates.clone()
    }

    /// Pods deleted so far, in order.
    pub fn deletes(&self) -> Vec<JobHandle> {
        self.state.lock().unwrap().deletes.clone()
    }

    /// Names of pods currently present in the fake cluster.
    pub fn live_pods(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .live
            .iter()
            .map(|(namespace, name)| format!("{namespace}/{name}"))
            .collect()
    }

    pub fn delete_count_for(&self, pod_name: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .deletes
            .iter()
            .filter(|handle| handle.name == pod_name)
            .count()
    }

    fn next_poll(state: &mut FakeClusterState, pod_name: &str) -> Option<FakePoll> {
        let script = state.scripts.get_mut(pod_name)?;
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }
}

#[async_trait]
impl ClusterJobClient for FakeCluster {
    async fn create(&self, namespace: &str, spec: &JobSpec) -> Result<JobHandle, ClusterError> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.reject_creates {
            return Err(ClusterError::Scheduling(reason.clone()));
        }
        let key = (namespace.to_string(), spec.name.clone());
        if state.live.contains(&key) {
            return Err(ClusterError::AlreadyExists(spec.name.clone()));
        }
        state.live.insert(key);
        let handle = JobHandle {
            namespace: namespace.to_string(),
            name: spec.name.clone(),
        };
        state.creates.push(handle.clone());
        Ok(handle)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<JobStatus, ClusterError> {
        let mut state = self.state.lock().unwrap();
        let key = (namespace.to_string(), name.to_string());
        if !state.live.contains(&key) {
            return Err(ClusterError::NotFound(name.to_string()));
        }
        match Self::next_poll(&mut state, name) {
            Some(FakePoll::Phase(phase)) => Ok(JobStatus {
                phase,
                raw_phase: phase.to_string(),
            }),
            Some(FakePoll::Gone) => {
                state.live.remove(&key);
                Err(ClusterError::NotFound(name.to_string()))
            }
            None => Ok(JobStatus::from_raw_phase("")),
        }
    }

    async fn delete(&self, namespace: &str, handle: &JobHandle) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        let key = (namespace.to_string(), handle.name.clone());
        // Idempotent: removing an absent pod is still a success.
        state.live.remove(&key);
        state.deletes.push(handle.clone());
        Ok(())
    }
}

#[async_trait]
impl ClusterClientFactory for FakeCluster {
    async fn connect(&self) -> Result<Box<dyn ClusterJobClient>, ClusterError> {
        if self.state.lock().unwrap().refuse_connections {
            return Err(ClusterError::Connectivity(
                "connection refused by fake cluster".to_string(),
            ));
        }
        Ok(Box::new(self.clone()))
    }
}
