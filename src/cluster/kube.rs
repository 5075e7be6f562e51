//! Production cluster client backed by the `kube` crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Container, PersistentVolumeClaimVolumeSource, Pod, PodSpec, ResourceRequirements,
    SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use tracing::debug;

use super::{ClusterClientFactory, ClusterError, ClusterJobClient};
use crate::job::{JobHandle, JobSpec, JobStatus};

/// Builds a [`KubeJobClient`] from the ambient kubeconfig or in-cluster
/// service account, once per cleanup call.
#[derive(Debug, Clone, Default)]
pub struct KubeClientFactory;

impl KubeClientFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ClusterClientFactory for KubeClientFactory {
    async fn connect(&self) -> Result<Box<dyn ClusterJobClient>, ClusterError> {
        let client = Client::try_default()
            .await
            .map_err(|err| ClusterError::Connectivity(err.to_string()))?;
        Ok(Box::new(KubeJobClient::new(client)))
    }
}

/// Cluster job client over a [`kube::Client`].
pub struct KubeJobClient {
    client: Client,
}

impl KubeJobClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterJobClient for KubeJobClient {
    async fn create(&self, namespace: &str, spec: &JobSpec) -> Result<JobHandle, ClusterError> {
        let manifest = pod_manifest(spec);
        debug!(pod = %spec.name, %namespace, "creating cleanup pod");
        self.pods(namespace)
            .create(&PostParams::default(), &manifest)
            .await
            .map_err(|err| map_kube_error(err, &spec.name))?;
        Ok(JobHandle {
            namespace: namespace.to_string(),
            name: spec.name.clone(),
        })
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<JobStatus, ClusterError> {
        let pod = self
            .pods(namespace)
            .get(name)
            .await
            .map_err(|err| map_kube_error(err, name))?;
        let raw = pod
            .status
            .and_then(|status| status.phase)
            .unwrap_or_default();
        Ok(JobStatus::from_raw_phase(&raw))
    }

    async fn delete(&self, namespace: &str, handle: &JobHandle) -> Result<(), ClusterError> {
        let result = self
            .pods(namespace)
            .delete(&handle.name, &DeleteParams::default())
            .await;
        match result {
            Ok(_) => Ok(()),
            // Already gone counts as deleted.
            Err(err) => match map_kube_error(err, &handle.name) {
                ClusterError::NotFound(_) => Ok(()),
                other => Err(other),
            },
        }
    }
}

fn map_kube_error(err: kube::Error, name: &str) -> ClusterError {
    match err {
        kube::Error::Api(response) if response.code == 404 => {
            ClusterError::NotFound(name.to_string())
        }
        kube::Error::Api(response) if response.code == 409 => {
            ClusterError::AlreadyExists(name.to_string())
        }
        kube::Error::Api(response) if response.code == 422 || response.code == 403 => {
            ClusterError::Scheduling(response.message)
        }
        kube::Error::Api(response) => ClusterError::Api(response.message),
        other => ClusterError::Connectivity(other.to_string()),
    }
}

/// Render a [`JobSpec`] as a Pod manifest.
///
/// One container, one PVC-backed volume, memory-only limits, explicit
/// non-privileged security context, restart policy from the spec.
fn pod_manifest(spec: &JobSpec) -> Pod {
    let mount = VolumeMount {
        name: spec.volume_claim_name.clone(),
        mount_path: spec.mount_path.clone(),
        ..Default::default()
    };
    let volume = Volume {
        name: spec.volume_claim_name.clone(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: spec.volume_claim_name.clone(),
            ..Default::default()
        }),
        ..Default::default()
    };
    let limits = BTreeMap::from([("memory".to_string(), Quantity(spec.memory_limit.clone()))]);
    let container = Container {
        name: spec.name.clone(),
        image: Some(spec.image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: Some(spec.command.clone()),
        security_context: Some(SecurityContext {
            privileged: Some(spec.privileged),
            ..Default::default()
        }),
        volume_mounts: Some(vec![mount]),
        resources: Some(ResourceRequirements {
            limits: Some(limits),
            ..Default::default()
        }),
        ..Default::default()
    };
    Pod {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![container],
            volumes: Some(vec![volume]),
            restart_policy: Some(spec.restart_policy.clone()),
            ..Default::default()
        }),
        status: None,
    }
}
