// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for resource composition.

use base64::Engine;
use k8s_openapi::api::core::v1::{EnvVar, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use super::*;
use crate::network::generate_network;

fn b64(value: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(value)
}

fn env(name: &str, value: &str) -> EnvVar {
    EnvVar { name: name.to_string(), value: Some(value.to_string()), value_from: None }
}

fn names_of(env: &[EnvVar]) -> Vec<&str> {
    env.iter().map(|v| v.name.as_str()).collect()
}

fn value_of<'a>(env: &'a [EnvVar], name: &str) -> Option<&'a str> {
    env.iter().find(|v| v.name == name).and_then(|v| v.value.as_deref())
}

#[test]
fn test_object_names() {
    let names = NodeNames::new("test-validator", 3);
    assert_eq!(names.app, "avago-test-validator-3");
    assert_eq!(names.stateful_set, "avago-test-validator-3");
    assert_eq!(names.secret, "avago-test-validator-3-key");
    assert_eq!(names.service, "avago-test-validator-3-service");
    assert_eq!(names.pvc, "avago-test-validator-3-pvc");
    assert_eq!(init_script_name("test-validator"), "avago-test-validatorinit-script");
    assert_eq!(seed_endpoint("net"), "avago-net-0-service");
}

#[test]
fn test_config_map_holds_script() {
    let spec = AvalancheClusterSpec::default();
    let composer = Composer::new(&spec, "chain", "avago-test-validator-0-service");
    let cm = composer.config_map();

    assert_eq!(cm.metadata.name.as_deref(), Some("avago-test-validatorinit-script"));
    assert_eq!(cm.metadata.namespace.as_deref(), Some("chain"));
    let data = cm.data.unwrap();
    assert!(data["config.sh"].contains("BOOTSTRAPPERS"));
    assert!(data["config.sh"].contains("bootstrap-ips"));
}

#[test]
fn test_service_is_headless_with_fixed_ports() {
    let spec = AvalancheClusterSpec::default();
    let svc = Composer::new(&spec, "chain", "").service(1);
    let svc_spec = svc.spec.unwrap();

    assert_eq!(svc.metadata.name.as_deref(), Some("avago-test-validator-1-service"));
    assert_eq!(svc_spec.cluster_ip.as_deref(), Some("None"));
    assert_eq!(svc_spec.selector.unwrap()["app"], "avago-test-validator-1");
    let ports: Vec<_> = svc_spec.ports.unwrap().iter().map(|p| p.port).collect();
    assert_eq!(ports, vec![9650, 9651]);
}

#[test]
fn test_pvc_defaults() {
    let spec = AvalancheClusterSpec::default();
    let pvc = Composer::new(&spec, "chain", "").pvc(0);
    let pvc_spec = pvc.spec.unwrap();

    assert_eq!(pvc_spec.access_modes.unwrap(), vec!["ReadWriteOnce"]);
    assert_eq!(
        pvc_spec.resources.unwrap().requests.unwrap()["storage"],
        Quantity("50Gi".to_string())
    );
    assert!(pvc_spec.volume_name.is_none());
}

#[test]
fn test_owner_reference_attached() {
    let spec = AvalancheClusterSpec::default();
    let owner = OwnerReference {
        api_version: "chain.avax.network/v1alpha1".to_string(),
        kind: "AvalancheCluster".to_string(),
        name: "net".to_string(),
        uid: "uid-1".to_string(),
        controller: Some(true),
        ..Default::default()
    };
    let composer = Composer::new(&spec, "chain", "").with_owner(Some(owner.clone()));
    assert_eq!(composer.service(0).metadata.owner_references, Some(vec![owner.clone()]));
    assert_eq!(composer.stateful_set(0).metadata.owner_references, Some(vec![owner]));
}

#[test]
fn test_seed_node_has_no_init_container() {
    let spec = AvalancheClusterSpec::default();
    let composer = Composer::new(&spec, "chain", "avago-test-validator-0-service");

    let seed = composer.stateful_set(0).spec.unwrap().template.spec.unwrap();
    assert!(seed.init_containers.is_none());
    let seed_env = seed.containers[0].env.clone().unwrap();
    assert_eq!(value_of(&seed_env, "AVAGO_BOOTSTRAP_IPS"), Some(""));
    assert!(value_of(&seed_env, "AVAGO_CONFIG_FILE").is_none());

    let peer = composer.stateful_set(1).spec.unwrap().template.spec.unwrap();
    let init = &peer.init_containers.unwrap()[0];
    assert_eq!(init.name, "init-bootnode-ip");
    assert_eq!(init.image.as_deref(), Some("avaplatform/dnsutils:1.0.0"));
    assert_eq!(
        value_of(init.env.as_ref().unwrap(), "BOOTSTRAPPERS"),
        Some("avago-test-validator-0-service")
    );
    let peer_env = peer.containers[0].env.clone().unwrap();
    assert_eq!(
        value_of(&peer_env, "AVAGO_CONFIG_FILE"),
        Some("/etc/avalanchego/conf/conf.json")
    );
    assert!(value_of(&peer_env, "AVAGO_BOOTSTRAP_IPS").is_none());
}

#[test]
fn test_node_zero_with_url_is_not_seed() {
    let spec = AvalancheClusterSpec {
        bootstrapper_url: "peer-a,peer-b".to_string(),
        ..Default::default()
    };
    let composer = Composer::new(&spec, "chain", "peer-a,peer-b");
    assert!(!composer.is_seed(0));
    let pod = composer.stateful_set(0).spec.unwrap().template.spec.unwrap();
    assert!(pod.init_containers.is_some());
}

#[test]
fn test_stateful_set_shape() {
    let spec = AvalancheClusterSpec {
        tag: "v1.10.0".to_string(),
        pod_labels: [("team".to_string(), "chain".to_string())].into(),
        pod_annotations: [("a".to_string(), "b".to_string())].into(),
        ..Default::default()
    };
    let sts = Composer::new(&spec, "chain", "").stateful_set(2);
    let sts_spec = sts.spec.unwrap();

    assert_eq!(sts.metadata.name.as_deref(), Some("avago-test-validator-2"));
    assert_eq!(sts_spec.replicas, Some(1));
    assert_eq!(sts_spec.pod_management_policy.as_deref(), Some("OrderedReady"));
    assert_eq!(sts_spec.service_name, "avago-test-validator-2-service");

    let meta = sts_spec.template.metadata.unwrap();
    let labels = meta.labels.unwrap();
    assert_eq!(labels["app"], "avago-test-validator-2");
    assert_eq!(labels["tags.datadoghq.com/version"], "v1.10.0");
    assert_eq!(labels["team"], "chain");
    assert_eq!(meta.annotations.unwrap()["a"], "b");

    let pod = sts_spec.template.spec.unwrap();
    let container = &pod.containers[0];
    assert_eq!(container.name, "avago");
    assert_eq!(container.image.as_deref(), Some("avaplatform/avalanchego:v1.10.0"));
    assert_eq!(container.image_pull_policy.as_deref(), Some("IfNotPresent"));
    let limits = container.resources.clone().unwrap().limits.unwrap();
    assert_eq!(limits["cpu"], Quantity("1".to_string()));
    assert_eq!(limits["memory"], Quantity("2Gi".to_string()));

    let volumes = pod.volumes.unwrap();
    let secret = volumes.iter().find_map(|v| v.secret.clone()).unwrap();
    assert_eq!(secret.secret_name.as_deref(), Some("avago-test-validator-2-key"));
    let script = volumes.iter().find_map(|v| v.config_map.clone()).unwrap();
    assert_eq!(script.name.as_deref(), Some("avago-test-validatorinit-script"));
    assert_eq!(script.default_mode, Some(0o777));
}

#[test]
fn test_custom_resources_replace_defaults() {
    let custom = ResourceRequirements {
        limits: Some([("memory".to_string(), Quantity("8Gi".to_string()))].into()),
        ..Default::default()
    };
    let spec = AvalancheClusterSpec { resources: Some(custom.clone()), ..Default::default() };
    let sts = Composer::new(&spec, "chain", "").stateful_set(0);
    let container = &sts.spec.unwrap().template.spec.unwrap().containers[0];
    assert_eq!(container.resources, Some(custom));
}

#[test]
fn test_existing_secret_mounted_directly() {
    let spec = AvalancheClusterSpec {
        existing_secrets: (0..5).map(|i| format!("mine-{}", i)).collect(),
        ..Default::default()
    };
    let sts = Composer::new(&spec, "chain", "").stateful_set(4);
    let volumes = sts.spec.unwrap().template.spec.unwrap().volumes.unwrap();
    let secret = volumes.iter().find_map(|v| v.secret.clone()).unwrap();
    assert_eq!(secret.secret_name.as_deref(), Some("mine-4"));
}

#[test]
fn test_env_order_and_defaults() {
    let env = compose_env(&AvalancheClusterSpec::default(), true);
    assert_eq!(
        names_of(&env),
        vec![
            "AVAGO_HTTP_HOST",
            "AVAGO_PUBLIC_IP",
            "AVAGO_NETWORK_ID",
            "AVAGO_STAKING_ENABLED",
            "AVAGO_HTTP_PORT",
            "AVAGO_STAKING_PORT",
            "AVAGO_DB_DIR",
            "AVAGO_STAKING_TLS_CERT_FILE",
            "AVAGO_STAKING_TLS_KEY_FILE",
            "AVAGO_GENESIS",
            "AVAGO_BOOTSTRAP_IPS",
        ]
    );
    let public_ip = env.iter().find(|v| v.name == "AVAGO_PUBLIC_IP").unwrap();
    let field = public_ip.value_from.clone().unwrap().field_ref.unwrap();
    assert_eq!(field.field_path, "status.podIP");
}

#[test]
fn test_env_url_without_certificates_skips_tls_paths() {
    let spec = AvalancheClusterSpec {
        bootstrapper_url: "peer".to_string(),
        ..Default::default()
    };
    let env = compose_env(&spec, false);
    assert!(value_of(&env, "AVAGO_STAKING_TLS_CERT_FILE").is_none());
    assert!(value_of(&env, "AVAGO_STAKING_TLS_KEY_FILE").is_none());
}

#[test]
fn test_env_caller_overlay_wins_in_place() {
    let spec = AvalancheClusterSpec {
        env: vec![env("AVAGO_NETWORK_ID", "1"), env("AVAGO_LOG_LEVEL", "debug")],
        ..Default::default()
    };
    let env = compose_env(&spec, true);

    assert_eq!(value_of(&env, "AVAGO_NETWORK_ID"), Some("1"));
    assert_eq!(names_of(&env)[2], "AVAGO_NETWORK_ID");
    assert_eq!(value_of(&env, "AVAGO_LOG_LEVEL"), Some("debug"));
    assert!(value_of(&env, "AVAGO_GENESIS").is_none(), "mainnet ships its own genesis");
}

#[test]
fn test_custom_network_ids() {
    assert!(is_custom_network("12346"));
    assert!(is_custom_network("99"));
    assert!(!is_custom_network("1"));
    assert!(!is_custom_network("5"));
    assert!(!is_custom_network("12345"));
    assert!(!is_custom_network("fuji"));
}

#[test]
fn test_secret_material_existing_secrets_yield_none() {
    let spec = AvalancheClusterSpec {
        existing_secrets: (0..5).map(|i| format!("s{}", i)).collect(),
        ..Default::default()
    };
    assert!(secret_material(&spec, None, "", 0).unwrap().is_none());
}

#[test]
fn test_secret_material_inline_certificates_decoded() {
    let spec = AvalancheClusterSpec {
        bootstrapper_url: "peer".to_string(),
        genesis: "{\"networkID\":1}".to_string(),
        certificates: vec![Certificate { cert: b64("CERT PEM"), key: b64("KEY PEM") }; 5],
        ..Default::default()
    };
    let material = secret_material(&spec, None, &spec.genesis, 2).unwrap().unwrap();
    assert_eq!(material.certificate, "CERT PEM");
    assert_eq!(material.key, "KEY PEM");
    assert_eq!(material.genesis, "{\"networkID\":1}");
    assert_eq!(material.source, SecretSource::Inline);
    assert_eq!(material.source.update_policy(), UpdatePolicy::Replace);

    let secret = Composer::new(&spec, "chain", "peer").secret(2, &material);
    assert_eq!(secret.metadata.name.as_deref(), Some("avago-test-validator-2-key"));
    assert_eq!(secret.type_.as_deref(), Some("Opaque"));
    let data = secret.string_data.unwrap();
    assert_eq!(data["staker.crt"], "CERT PEM");
    assert_eq!(data["staker.key"], "KEY PEM");
    assert_eq!(data["genesis.json"], "{\"networkID\":1}");
}

#[test]
fn test_secret_material_invalid_base64() {
    let mut certificates = vec![Certificate { cert: b64("c"), key: b64("k") }; 5];
    certificates[3].key = "not base64!".to_string();
    let spec = AvalancheClusterSpec {
        bootstrapper_url: "peer".to_string(),
        certificates,
        ..Default::default()
    };

    assert!(secret_material(&spec, None, "", 2).is_ok());
    let err = secret_material(&spec, None, "", 3).unwrap_err();
    assert!(matches!(err, CompositionError::InvalidBase64 { index: 3, field: "key", .. }));
}

#[test]
fn test_secret_material_invalid_utf8() {
    let spec = AvalancheClusterSpec {
        bootstrapper_url: "peer".to_string(),
        certificates: vec![
            Certificate {
                cert: base64::engine::general_purpose::STANDARD.encode([0xff, 0xfe]),
                key: b64("k"),
            };
            5
        ],
        ..Default::default()
    };
    let err = secret_material(&spec, None, "", 0).unwrap_err();
    assert!(matches!(err, CompositionError::InvalidUtf8 { index: 0, field: "cert" }));
}

#[test]
fn test_secret_material_placeholder() {
    let spec = AvalancheClusterSpec {
        bootstrapper_url: "peer".to_string(),
        ..Default::default()
    };
    let material = secret_material(&spec, None, "{}", 0).unwrap().unwrap();
    assert!(material.certificate.is_empty());
    assert!(material.key.is_empty());
    assert_eq!(material.genesis, "{}");
    assert_eq!(material.source.update_policy(), UpdatePolicy::Preserve);
}

#[test]
fn test_secret_material_bootstrapped_wins() {
    let network = generate_network(1).unwrap();
    let spec = AvalancheClusterSpec { node_count: 1, ..Default::default() };
    let material = secret_material(&spec, Some(&network), &network.genesis_json, 0)
        .unwrap()
        .unwrap();

    assert_eq!(material.source, SecretSource::Bootstrapped);
    assert_eq!(material.source.update_policy(), UpdatePolicy::Preserve);
    assert_eq!(material.certificate, network.identities[0].certificate_pem);
    assert_eq!(material.genesis, network.genesis_json);
    assert!(!format!("{:?}", material).contains("PRIVATE KEY"));
}
