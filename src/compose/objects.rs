//! ConfigMap, Secret, Service and PersistentVolumeClaim composition.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMap, PersistentVolumeClaim, PersistentVolumeClaimSpec, Secret, Service, ServicePort,
    ServiceSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use super::script::{BOOTSTRAP_FINDER_SCRIPT, SCRIPT_KEY};
use super::{
    app_labels, init_script_name, Composer, SecretMaterial, DEFAULT_STORAGE, GENESIS_KEY,
    HTTP_PORT, STAKER_CERT_KEY, STAKER_KEY_KEY, STAKING_PORT,
};

impl Composer<'_> {
    /// Shared ConfigMap holding the peer discovery script.
    pub fn config_map(&self) -> ConfigMap {
        let name = init_script_name(&self.spec.deployment_name);
        ConfigMap {
            metadata: self.metadata(&name, &name),
            data: Some(BTreeMap::from([(
                SCRIPT_KEY.to_string(),
                BOOTSTRAP_FINDER_SCRIPT.to_string(),
            )])),
            ..Default::default()
        }
    }

    /// Per-node Secret with staking certificate, key and genesis.
    pub fn secret(&self, index: usize, material: &SecretMaterial) -> Secret {
        let names = self.names(index);
        Secret {
            metadata: self.metadata(&names.secret, &names.app),
            type_: Some("Opaque".to_string()),
            string_data: Some(BTreeMap::from([
                (STAKER_CERT_KEY.to_string(), material.certificate.clone()),
                (STAKER_KEY_KEY.to_string(), material.key.clone()),
                (GENESIS_KEY.to_string(), material.genesis.clone()),
            ])),
            ..Default::default()
        }
    }

    /// Headless Service giving the node a stable DNS name.
    pub fn service(&self, index: usize) -> Service {
        let names = self.names(index);
        Service {
            metadata: self.metadata(&names.service, &names.app),
            spec: Some(ServiceSpec {
                cluster_ip: Some("None".to_string()),
                selector: Some(app_labels(&names.app)),
                ports: Some(vec![
                    service_port("http", HTTP_PORT),
                    service_port("staking", STAKING_PORT),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Node database claim.
    pub fn pvc(&self, index: usize) -> PersistentVolumeClaim {
        let names = self.names(index);
        PersistentVolumeClaim {
            metadata: self.metadata(&names.pvc, &names.app),
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteOnce".to_string()]),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([(
                        "storage".to_string(),
                        Quantity(DEFAULT_STORAGE.to_string()),
                    )])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn service_port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        protocol: Some("TCP".to_string()),
        port,
        ..Default::default()
    }
}
