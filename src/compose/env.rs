//! Node container environment.

use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, ObjectFieldSelector};

use crate::k8s::AvalancheClusterSpec;

pub const NETWORK_ID_VAR: &str = "AVAGO_NETWORK_ID";

/// Network id of self-hosted networks; matches the default genesis.
pub const DEFAULT_NETWORK_ID: &str = "12346";

/// Network ids that ship their genesis inside the node binary.
pub const WELL_KNOWN_NETWORK_IDS: [u32; 3] = [1, 5, 12345];

pub const DB_DIR: &str = "/root/.avalanchego";
pub const CERTS_DIR: &str = "/etc/avalanchego/st-certs";
pub const CONF_DIR: &str = "/etc/avalanchego/conf";

fn var(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar { name: name.to_string(), value: Some(value.into()), value_from: None }
}

fn base_env() -> Vec<EnvVar> {
    vec![
        var("AVAGO_HTTP_HOST", "0.0.0.0"),
        EnvVar {
            name: "AVAGO_PUBLIC_IP".to_string(),
            value: None,
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "status.podIP".to_string(),
                    api_version: None,
                }),
                ..Default::default()
            }),
        },
        var(NETWORK_ID_VAR, DEFAULT_NETWORK_ID),
        var("AVAGO_STAKING_ENABLED", "true"),
        var("AVAGO_HTTP_PORT", super::HTTP_PORT.to_string()),
        var("AVAGO_STAKING_PORT", super::STAKING_PORT.to_string()),
        var("AVAGO_DB_DIR", DB_DIR),
    ]
}

/// Whether `network_id` names a network whose genesis must be supplied.
///
/// Unparseable ids are treated as well known.
pub fn is_custom_network(network_id: &str) -> bool {
    network_id
        .trim()
        .parse::<u32>()
        .map(|id| !WELL_KNOWN_NETWORK_IDS.contains(&id))
        .unwrap_or(false)
}

/// Environment of node `index`'s container, in order: base variables, TLS
/// paths, caller overlay, genesis path, then seed or bootstrap settings.
pub fn compose_env(spec: &AvalancheClusterSpec, seed: bool) -> Vec<EnvVar> {
    let mut env = base_env();

    // Nodes joining an external network without supplied certificates
    // generate their own staking identity.
    if !spec.has_bootstrapper_url() || spec.has_certificates() || spec.has_existing_secrets() {
        env.push(var("AVAGO_STAKING_TLS_CERT_FILE", format!("{}/staker.crt", CERTS_DIR)));
        env.push(var("AVAGO_STAKING_TLS_KEY_FILE", format!("{}/staker.key", CERTS_DIR)));
    }

    for overlay in &spec.env {
        match env.iter_mut().find(|v| v.name == overlay.name) {
            Some(existing) => *existing = overlay.clone(),
            None => env.push(overlay.clone()),
        }
    }

    let custom = env
        .iter()
        .find(|v| v.name == NETWORK_ID_VAR)
        .and_then(|v| v.value.as_deref())
        .is_some_and(is_custom_network);
    if custom {
        env.push(var("AVAGO_GENESIS", format!("{}/genesis.json", CERTS_DIR)));
    }

    if seed {
        env.push(var("AVAGO_BOOTSTRAP_IPS", ""));
    } else {
        env.push(var("AVAGO_CONFIG_FILE", format!("{}/conf.json", CONF_DIR)));
    }

    env
}
