//! Tests for the reconciliation orchestrator.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;

use super::controller::requeue_delay;
use super::*;
use crate::cluster::{ApiError, MemoryCluster};
use crate::config::OperatorConfig;
use crate::k8s::{Certificate, ValidationError};

const NAMESPACE: &str = "chain";
const NAME: &str = "validators";

fn cluster_with(spec: AvalancheClusterSpec) -> AvalancheCluster {
    let mut cluster = AvalancheCluster::new(NAME, spec);
    cluster.metadata.namespace = Some(NAMESPACE.to_string());
    cluster
}

fn url_spec(node_count: u32) -> AvalancheClusterSpec {
    AvalancheClusterSpec {
        node_count,
        deployment_name: "net".to_string(),
        bootstrapper_url: "peer.example".to_string(),
        genesis: "{\"networkID\":12346}".to_string(),
        ..Default::default()
    }
}

fn reconciler(cluster: &Arc<MemoryCluster>) -> Reconciler {
    Reconciler::new(cluster.clone(), RolloutSynchronizer::new(Duration::from_secs(30)))
}

#[test]
fn test_needs_bootstrap_only_without_any_network_source() {
    let status = AvalancheClusterStatus::default();
    assert!(needs_bootstrap(&AvalancheClusterSpec::default(), &status));

    let with_url = AvalancheClusterSpec { bootstrapper_url: "peer".to_string(), ..Default::default() };
    assert!(!needs_bootstrap(&with_url, &status));

    let with_genesis = AvalancheClusterSpec { genesis: "{}".to_string(), ..Default::default() };
    assert!(!needs_bootstrap(&with_genesis, &status));

    let with_secrets = AvalancheClusterSpec {
        existing_secrets: vec!["s".to_string(); 5],
        ..Default::default()
    };
    assert!(!needs_bootstrap(&with_secrets, &status));

    let observed = AvalancheClusterStatus {
        bootstrapper_url: "avago-test-validator-0-service".to_string(),
        ..Default::default()
    };
    assert!(!needs_bootstrap(&AvalancheClusterSpec::default(), &observed));
}

#[test]
fn test_resolve_endpoint() {
    assert_eq!(resolve_endpoint(&url_spec(1)), "peer.example");
    let spec = AvalancheClusterSpec { deployment_name: "net".to_string(), ..Default::default() };
    assert_eq!(resolve_endpoint(&spec), "avago-net-0-service");
}

#[test]
fn test_resolve_genesis_falls_back_to_observed() {
    let observed = AvalancheClusterStatus { genesis: "prior".to_string(), ..Default::default() };
    assert_eq!(resolve_genesis(&url_spec(1), &observed), "{\"networkID\":12346}");
    assert_eq!(resolve_genesis(&AvalancheClusterSpec::default(), &observed), "prior");
    assert_eq!(
        resolve_genesis(&AvalancheClusterSpec::default(), &AvalancheClusterStatus::default()),
        ""
    );
}

#[test]
fn test_resolve_genesis_joined_network_ignores_observed() {
    let observed = AvalancheClusterStatus { genesis: "prior".to_string(), ..Default::default() };
    let joined = AvalancheClusterSpec { genesis: String::new(), ..url_spec(1) };
    assert_eq!(resolve_genesis(&joined, &observed), "");
}

#[test]
fn test_requeue_delay_by_error_kind() {
    let config = OperatorConfig::default();
    let user = ReconcileError::Validation(ValidationError::ConflictingGenesisSource);
    assert!(user.is_user_error());
    assert_eq!(requeue_delay(&user, &config), Duration::from_secs(300));

    let transient = ReconcileError::Upstream(ApiError::Watch {
        name: "x".to_string(),
        message: "reset".to_string(),
    });
    assert!(!transient.is_user_error());
    assert_eq!(requeue_delay(&transient, &config), Duration::from_secs(5));
}

#[tokio::test]
async fn test_missing_namespace() {
    let memory = Arc::new(MemoryCluster::with_auto_rollout());
    let cluster = AvalancheCluster::new(NAME, url_spec(1));

    let err = reconciler(&memory).reconcile(&cluster).await.unwrap_err();
    assert!(matches!(err, ReconcileError::MissingNamespace(ref n) if n == NAME));
    assert_eq!(memory.total_objects(), 0);
}

#[tokio::test]
async fn test_validation_failure_is_recorded_and_writes_nothing() {
    let memory = Arc::new(MemoryCluster::with_auto_rollout());
    let spec = AvalancheClusterSpec {
        existing_secrets: vec!["a".to_string(), "b".to_string()],
        ..url_spec(3)
    };

    let err = reconciler(&memory).reconcile(&cluster_with(spec)).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Validation(_)));
    assert_eq!(memory.total_objects(), 0);

    let status = memory.status(NAMESPACE, NAME).unwrap();
    assert!(status.error.contains("does not match nodeCount"));
    assert!(status.network_members_uri.is_empty());
}

#[tokio::test]
async fn test_url_mode_applies_every_object() {
    let memory = Arc::new(MemoryCluster::with_auto_rollout());
    let outcome = reconciler(&memory).reconcile(&cluster_with(url_spec(3))).await.unwrap();

    assert!(!outcome.bootstrapped);
    assert_eq!(memory.count(ResourceKind::ConfigMap), 1);
    assert_eq!(memory.count(ResourceKind::Secret), 3);
    assert_eq!(memory.count(ResourceKind::Service), 3);
    assert_eq!(memory.count(ResourceKind::PersistentVolumeClaim), 3);
    assert_eq!(memory.count(ResourceKind::StatefulSet), 3);

    let status = memory.status(NAMESPACE, NAME).unwrap();
    assert_eq!(status, outcome.status);
    assert_eq!(status.bootstrapper_url, "peer.example");
    assert_eq!(status.genesis, "{\"networkID\":12346}");
    assert_eq!(
        status.network_members_uri,
        vec!["avago-net-0-service", "avago-net-1-service", "avago-net-2-service"]
    );
    assert!(status.error.is_empty());
}

#[tokio::test]
async fn test_inline_certificates_are_decoded_into_secrets() {
    let memory = Arc::new(MemoryCluster::with_auto_rollout());
    let b64 = |v: &str| base64::engine::general_purpose::STANDARD.encode(v);
    let spec = AvalancheClusterSpec {
        certificates: vec![Certificate { cert: b64("CERT"), key: b64("KEY") }],
        ..url_spec(1)
    };

    reconciler(&memory).reconcile(&cluster_with(spec)).await.unwrap();

    let secret = memory
        .get_object(ResourceKind::Secret, NAMESPACE, "avago-net-0-key")
        .unwrap();
    let ClusterObject::Secret(secret) = secret else {
        panic!("expected a Secret");
    };
    let data = secret.string_data.unwrap();
    assert_eq!(data["staker.crt"], "CERT");
    assert_eq!(data["staker.key"], "KEY");
}

#[tokio::test]
async fn test_secret_failure_commits_nothing_and_skips_workloads() {
    let memory = Arc::new(MemoryCluster::with_auto_rollout());
    memory.fail_writes_for(ResourceKind::Secret);

    let err = reconciler(&memory).reconcile(&cluster_with(url_spec(2))).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Upstream(ApiError::Rejected { .. })));
    assert_eq!(memory.count(ResourceKind::Service), 0);
    assert_eq!(memory.count(ResourceKind::StatefulSet), 0);

    let status = memory.status(NAMESPACE, NAME).unwrap();
    assert!(status.bootstrapper_url.is_empty());
    assert!(status.genesis.is_empty());
    assert!(status.error.contains("injected failure"));
}

#[tokio::test]
async fn test_workload_failure_stops_at_first_node() {
    let memory = Arc::new(MemoryCluster::with_auto_rollout());
    memory.fail_writes_for(ResourceKind::StatefulSet);

    let err = reconciler(&memory).reconcile(&cluster_with(url_spec(3))).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Upstream(_)));
    assert_eq!(memory.count(ResourceKind::Service), 1);
    assert_eq!(memory.count(ResourceKind::PersistentVolumeClaim), 1);

    let status = memory.status(NAMESPACE, NAME).unwrap();
    assert_eq!(status.bootstrapper_url, "peer.example");
    assert!(status.network_members_uri.is_empty());
    assert!(!status.error.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rollout_timeout_is_recorded() {
    let memory = Arc::new(MemoryCluster::new());

    let err = reconciler(&memory).reconcile(&cluster_with(url_spec(2))).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Rollout(_)));
    assert_eq!(memory.count(ResourceKind::StatefulSet), 1);
    assert_eq!(memory.active_watches(), 0);

    let status = memory.status(NAMESPACE, NAME).unwrap();
    assert!(status.error.contains("timed out"));
    assert!(status.error.contains("avago-net-0"));
    assert!(status.network_members_uri.is_empty());
}

#[tokio::test]
async fn test_status_write_failure_is_not_fatal() {
    let memory = Arc::new(MemoryCluster::with_auto_rollout());
    memory.fail_status_patches(true);

    let outcome = reconciler(&memory).reconcile(&cluster_with(url_spec(1))).await.unwrap();
    assert_eq!(outcome.status.network_members_uri, vec!["avago-net-0-service"]);
    assert!(memory.status(NAMESPACE, NAME).is_none());
}

#[tokio::test]
async fn test_success_clears_previous_error() {
    let memory = Arc::new(MemoryCluster::with_auto_rollout());
    let mut cluster = cluster_with(url_spec(1));
    cluster.status = Some(AvalancheClusterStatus {
        error: "earlier failure".to_string(),
        ..Default::default()
    });

    let outcome = reconciler(&memory).reconcile(&cluster).await.unwrap();
    assert!(outcome.status.error.is_empty());
    assert!(memory.status(NAMESPACE, NAME).unwrap().error.is_empty());
}

#[tokio::test]
async fn test_reserved_env_is_not_forwarded() {
    let memory = Arc::new(MemoryCluster::with_auto_rollout());
    let spec = AvalancheClusterSpec {
        env: vec![k8s_openapi::api::core::v1::EnvVar {
            name: "AVAGO_HTTP_HOST".to_string(),
            value: Some("127.0.0.1".to_string()),
            value_from: None,
        }],
        ..url_spec(1)
    };

    reconciler(&memory).reconcile(&cluster_with(spec)).await.unwrap();

    let sts = memory
        .get_object(ResourceKind::StatefulSet, NAMESPACE, "avago-net-0")
        .and_then(ClusterObject::into_stateful_set)
        .unwrap();
    let container = &sts.spec.unwrap().template.spec.unwrap().containers[0];
    let env = container.env.as_ref().unwrap();
    let hosts: Vec<_> = env.iter().filter(|v| v.name == "AVAGO_HTTP_HOST").collect();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].value.as_deref(), Some("0.0.0.0"));
}

#[tokio::test]
async fn test_stored_network_is_adopted_instead_of_regenerated() {
    let memory = Arc::new(MemoryCluster::with_auto_rollout());
    let stored = Secret {
        metadata: ObjectMeta {
            name: Some("avago-net-0-key".to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        data: Some(
            [
                ("staker.crt".to_string(), ByteString(b"STORED CERT".to_vec())),
                ("genesis.json".to_string(), ByteString(b"{\"stored\":true}".to_vec())),
            ]
            .into(),
        ),
        ..Default::default()
    };
    memory.insert(stored.clone().into()).unwrap();
    let spec = AvalancheClusterSpec { node_count: 1, deployment_name: "net".to_string(), ..Default::default() };

    let outcome = reconciler(&memory).reconcile(&cluster_with(spec)).await.unwrap();

    assert!(!outcome.bootstrapped);
    assert_eq!(outcome.status.genesis, "{\"stored\":true}");
    assert_eq!(outcome.status.bootstrapper_url, "avago-net-0-service");
    let live = memory.get_object(ResourceKind::Secret, NAMESPACE, "avago-net-0-key").unwrap();
    let ClusterObject::Secret(live) = live else {
        panic!("expected a Secret");
    };
    assert_eq!(live.data, stored.data);
    assert!(live.string_data.is_none());
}
