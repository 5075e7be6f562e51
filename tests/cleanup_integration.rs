//! End-to-end cleanup scenarios driven through the in-memory fake cluster.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use pvc_janitor::{
    CleanupConfig, CleanupError, CleanupOrchestrator, CleanupOutcome, FakeCluster, JobPhase,
};

fn fast_config() -> CleanupConfig {
    CleanupConfig {
        poll_interval: Duration::from_millis(5),
        ..Default::default()
    }
}

fn orchestrator(cluster: &FakeCluster) -> CleanupOrchestrator {
    CleanupOrchestrator::new(fast_config(), Arc::new(cluster.clone()))
}

#[tokio::test]
async fn successful_cleanup_leaves_no_pods_behind() {
    let cluster = FakeCluster::new();
    cluster.script_phases(
        "pvc_cleaner_pod_ws-42",
        &[JobPhase::Pending, JobPhase::Succeeded],
    );

    let outcome = orchestrator(&cluster)
        .cleanup("proj-ns", "ws-42")
        .await
        .unwrap();

    assert_eq!(outcome, CleanupOutcome::Succeeded);
    assert!(outcome.succeeded());
    assert!(cluster.live_pods().is_empty());
    assert_eq!(cluster.delete_count_for("pvc_cleaner_pod_ws-42"), 1);
}

#[tokio::test]
async fn failed_cleanup_still_reclaims_the_pod() {
    let cluster = FakeCluster::new();
    cluster.script_phases(
        "pvc_cleaner_pod_ws-42",
        &[JobPhase::Running, JobPhase::Failed],
    );

    let outcome = orchestrator(&cluster)
        .cleanup("proj-ns", "ws-42")
        .await
        .unwrap();

    assert_eq!(outcome, CleanupOutcome::Failed);
    assert!(!outcome.succeeded());
    assert!(cluster.live_pods().is_empty());
    assert_eq!(cluster.delete_count_for("pvc_cleaner_pod_ws-42"), 1);
}

#[tokio::test]
async fn connectivity_failure_surfaces_and_creates_nothing() {
    let cluster = FakeCluster::new();
    cluster.refuse_connections();

    let err = orchestrator(&cluster)
        .cleanup("proj-ns", "ws-42")
        .await
        .unwrap_err();

    assert!(matches!(err, CleanupError::Infrastructure(_)));
    assert!(cluster.creates().is_empty());
}

#[tokio::test]
async fn rejected_create_surfaces_as_scheduling_error() {
    let cluster = FakeCluster::new();
    cluster.reject_creates("quota exceeded");

    let err = orchestrator(&cluster)
        .cleanup("proj-ns", "ws-42")
        .await
        .unwrap_err();

    assert!(matches!(err, CleanupError::Scheduling(_)));
    assert!(cluster.live_pods().is_empty());
}

#[tokio::test]
async fn stale_pod_with_same_name_is_a_conflict() {
    let cluster = FakeCluster::new();
    cluster.script_phases("pvc_cleaner_pod_ws-42", &[JobPhase::Running]);
    // A pod left over from an earlier run occupies the deterministic name.
    let stale = orchestrator(&cluster);
    let watch = tokio::spawn({
        let stale_cluster = cluster.clone();
        async move {
            let orch = CleanupOrchestrator::new(fast_config(), Arc::new(stale_cluster));
            orch.cleanup("proj-ns", "ws-42").await
        }
    });
    // Wait until the first orchestrator has created its pod.
    while cluster.creates().is_empty() {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let err = stale.cleanup("proj-ns", "ws-42").await.unwrap_err();
    assert!(matches!(err, CleanupError::Conflict(_)));

    watch.abort();
}

#[tokio::test]
async fn concurrent_cleanups_for_one_workspace_are_single_flighted() {
    let cluster = FakeCluster::new();
    // Keep the first call polling long enough for the second to collide.
    let mut phases = vec![JobPhase::Pending; 40];
    phases.push(JobPhase::Succeeded);
    cluster.script_phases("pvc_cleaner_pod_ws-42", &phases);

    let orchestrator = Arc::new(orchestrator(&cluster));
    let first = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.cleanup("proj-ns", "ws-42").await }
    });

    // Give the first call time to claim the flight slot.
    while cluster.creates().is_empty() {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    let second = orchestrator.cleanup("proj-ns", "ws-42").await;
    assert!(matches!(second, Err(CleanupError::CleanupInFlight(_))));

    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome, CleanupOutcome::Succeeded);
    assert_eq!(cluster.creates().len(), 1);
    assert!(cluster.live_pods().is_empty());

    // Once the first call finishes, the workspace can be cleaned again.
    cluster.script_phases("pvc_cleaner_pod_ws-42", &[JobPhase::Succeeded]);
    let again = orchestrator.cleanup("proj-ns", "ws-42").await.unwrap();
    assert_eq!(again, CleanupOutcome::Succeeded);
}

#[tokio::test]
async fn cancellation_aborts_the_wait_but_reclaims_the_pod() {
    let cluster = FakeCluster::new();
    cluster.script_phases("pvc_cleaner_pod_ws-42", &[JobPhase::Unknown]);

    let orchestrator = orchestrator(&cluster);
    let cancel = CancellationToken::new();

    let call = orchestrator.cleanup_with_cancel("proj-ns", "ws-42", &cancel);
    tokio::pin!(call);

    let raced = tokio::time::timeout(Duration::from_millis(30), call.as_mut()).await;
    assert!(raced.is_err(), "cleanup finished without a terminal phase");
    cancel.cancel();

    let outcome = tokio::time::timeout(Duration::from_millis(200), call)
        .await
        .expect("cancellation was not observed")
        .unwrap();
    assert_eq!(outcome, CleanupOutcome::Cancelled);
    assert!(cluster.live_pods().is_empty());
    assert_eq!(cluster.delete_count_for("pvc_cleaner_pod_ws-42"), 1);
}

#[tokio::test]
async fn vanished_pod_maps_to_failed_outcome() {
    let cluster = FakeCluster::new();
    cluster.script_phases("pvc_cleaner_pod_ws-42", &[JobPhase::Pending]);
    cluster.script_vanish("pvc_cleaner_pod_ws-42");

    let outcome = orchestrator(&cluster)
        .cleanup("proj-ns", "ws-42")
        .await
        .unwrap();

    assert_eq!(outcome, CleanupOutcome::Failed);
    assert!(cluster.live_pods().is_empty());
}

#[tokio::test]
async fn bounded_wait_times_out_on_a_stuck_pod() {
    let cluster = FakeCluster::new();
    cluster.script_phases("pvc_cleaner_pod_ws-42", &[JobPhase::Pending]);

    let config = CleanupConfig {
        poll_interval: Duration::from_millis(5),
        max_wait: Some(Duration::from_millis(30)),
        ..Default::default()
    };
    let orchestrator = CleanupOrchestrator::new(config, Arc::new(cluster.clone()));

    let outcome = orchestrator.cleanup("proj-ns", "ws-42").await.unwrap();
    assert_eq!(outcome, CleanupOutcome::TimedOut);
    assert!(!outcome.succeeded());
    assert!(cluster.live_pods().is_empty());
}

#[tokio::test]
async fn command_and_target_directory_derive_from_workspace() {
    let cluster = FakeCluster::new();
    cluster.script_phases("pvc_cleaner_pod_ws-42", &[JobPhase::Succeeded]);

    orchestrator(&cluster)
        .cleanup("proj-ns", "ws-42")
        .await
        .unwrap();

    let creates = cluster.creates();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].namespace, "proj-ns");
    assert_eq!(creates[0].name, "pvc_cleaner_pod_ws-42");
}
