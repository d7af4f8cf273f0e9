//! StatefulSet composition.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource, EnvVar,
    PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, ResourceRequirements,
    SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use super::env::{compose_env, CERTS_DIR, CONF_DIR, DB_DIR};
use super::{app_labels, init_script_name, Composer, DEFAULT_CPU, DEFAULT_MEMORY, HTTP_PORT, STAKING_PORT};

pub const NODE_CONTAINER: &str = "avago";
pub const INIT_CONTAINER: &str = "init-bootnode-ip";
pub const INIT_IMAGE: &str = "avaplatform/dnsutils:1.0.0";

const INIT_SCRIPT_VOLUME: &str = "avalanchego-init-script";
const INIT_VOLUME: &str = "init-volume";
const SCRIPT_DIR: &str = "/tmp/script";
const INIT_CONF_DIR: &str = "/tmp/conf";
const SCRIPT_MODE: i32 = 0o777;

const VERSION_LABEL: &str = "tags.datadoghq.com/version";

impl Composer<'_> {
    /// Single-replica StatefulSet running node `index`.
    pub fn stateful_set(&self, index: usize) -> StatefulSet {
        let names = self.names(index);
        let seed = self.is_seed(index);

        let mut pod_labels = app_labels(&names.app);
        pod_labels.insert(VERSION_LABEL.to_string(), self.spec.tag.clone());
        pod_labels.extend(self.spec.pod_labels.clone());

        let init_containers = (!seed).then(|| vec![self.init_container()]);

        StatefulSet {
            metadata: self.metadata(&names.stateful_set, &names.app),
            spec: Some(StatefulSetSpec {
                replicas: Some(1),
                pod_management_policy: Some("OrderedReady".to_string()),
                selector: LabelSelector {
                    match_labels: Some(app_labels(&names.app)),
                    ..Default::default()
                },
                service_name: names.service.clone(),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(pod_labels),
                        annotations: non_empty(self.spec.pod_annotations.clone()),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        init_containers,
                        containers: vec![self.node_container(index, compose_env(self.spec, seed))],
                        image_pull_secrets: (!self.spec.image_pull_secrets.is_empty())
                            .then(|| self.spec.image_pull_secrets.clone()),
                        volumes: Some(self.volumes(index)),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn node_container(&self, index: usize, env: Vec<EnvVar>) -> Container {
        let names = self.names(index);
        let resources = match &self.spec.resources {
            Some(custom) if *custom != ResourceRequirements::default() => custom.clone(),
            _ => default_resources(),
        };

        Container {
            name: NODE_CONTAINER.to_string(),
            image: Some(self.spec.image_reference()),
            image_pull_policy: Some("IfNotPresent".to_string()),
            resources: Some(resources),
            env: Some(env),
            ports: Some(vec![
                container_port("http", HTTP_PORT),
                container_port("staking", STAKING_PORT),
            ]),
            volume_mounts: Some(vec![
                mount(&db_volume(&names.app), DB_DIR, false),
                mount(INIT_VOLUME, CONF_DIR, true),
                mount(&cert_volume(&names.app), CERTS_DIR, true),
            ]),
            ..Default::default()
        }
    }

    fn init_container(&self) -> Container {
        Container {
            name: INIT_CONTAINER.to_string(),
            image: Some(INIT_IMAGE.to_string()),
            env: Some(vec![
                EnvVar {
                    name: "CONFIG_PATH".to_string(),
                    value: Some(INIT_CONF_DIR.to_string()),
                    value_from: None,
                },
                EnvVar {
                    name: "BOOTSTRAPPERS".to_string(),
                    value: Some(self.bootstrapper_url.to_string()),
                    value_from: None,
                },
            ]),
            command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("{}/{}", SCRIPT_DIR, super::script::SCRIPT_KEY),
            ]),
            volume_mounts: Some(vec![
                mount(INIT_SCRIPT_VOLUME, SCRIPT_DIR, true),
                mount(INIT_VOLUME, INIT_CONF_DIR, false),
            ]),
            ..Default::default()
        }
    }

    fn volumes(&self, index: usize) -> Vec<Volume> {
        let names = self.names(index);
        let secret_name = self
            .spec
            .existing_secrets
            .get(index)
            .cloned()
            .unwrap_or_else(|| names.secret.clone());

        vec![
            Volume {
                name: db_volume(&names.app),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: names.pvc.clone(),
                    read_only: None,
                }),
                ..Default::default()
            },
            Volume {
                name: INIT_SCRIPT_VOLUME.to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: Some(init_script_name(&self.spec.deployment_name)),
                    default_mode: Some(SCRIPT_MODE),
                    ..Default::default()
                }),
                ..Default::default()
            },
            Volume {
                name: INIT_VOLUME.to_string(),
                empty_dir: Some(EmptyDirVolumeSource::default()),
                ..Default::default()
            },
            Volume {
                name: cert_volume(&names.app),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(secret_name),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ]
    }
}

fn db_volume(app: &str) -> String {
    app.replacen(super::OBJECT_PREFIX, "avago-db-", 1)
}

fn cert_volume(app: &str) -> String {
    app.replacen(super::OBJECT_PREFIX, "avago-cert-", 1)
}

fn default_resources() -> ResourceRequirements {
    let quantities = BTreeMap::from([
        ("cpu".to_string(), Quantity(DEFAULT_CPU.to_string())),
        ("memory".to_string(), Quantity(DEFAULT_MEMORY.to_string())),
    ]);
    ResourceRequirements {
        requests: Some(quantities.clone()),
        limits: Some(quantities),
        ..Default::default()
    }
}

fn container_port(name: &str, port: i32) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        protocol: Some("TCP".to_string()),
        container_port: port,
        ..Default::default()
    }
}

fn mount(name: &str, path: &str, read_only: bool) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        read_only: Some(read_only),
        ..Default::default()
    }
}

fn non_empty(map: BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    (!map.is_empty()).then_some(map)
}
